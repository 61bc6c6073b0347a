//! Level table and tunable timings.

use super::BOARD_TILES;
use crate::error::GameError;

/// Safe clouds per level: level 1 keeps 20, level 4 keeps a single one.
pub const DEFAULT_SAFE_COUNTS: [u8; 4] = [20, 15, 5, 1];

/// Safe count used for any level past the end of the table.
pub const FALLBACK_SAFE_COUNT: u8 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GameConfig {
    /// `safe_counts[L - 1]` is the number of safe tiles at level L. The table
    /// length is the final level of a run.
    pub safe_counts: Vec<u8>,
    /// Tiles start falling at a random offset in `[0, fall_delay_max_ms)`.
    pub fall_delay_max_ms: u32,
    pub player_fall_delay_ms: u32,
    /// Added to the longest tile delay before the outcome is resolved.
    pub settle_grace_ms: u32,
    /// Pause on the "Safe!" message before the next level opens.
    pub interlude_ms: u32,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            safe_counts: DEFAULT_SAFE_COUNTS.to_vec(),
            fall_delay_max_ms: 500,
            player_fall_delay_ms: 200,
            settle_grace_ms: 1000,
            interlude_ms: 1500,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Last level of a run; surviving it wins.
    pub fn final_level(&self) -> u8 {
        self.safe_counts.len().min(u8::MAX as usize) as u8
    }

    /// Safe tiles drawn at `level` (1-based).
    pub fn safe_count(&self, level: u8) -> u8 {
        safe_count_in(&self.safe_counts, level)
    }

    /// Every level must be able to draw its safe tiles from what is left.
    ///
    /// After level L exactly `safe_count(L)` tiles are still standing, so a
    /// table is drawable iff it starts within the board and never grows.
    pub fn validate(&self) -> Result<(), GameError> {
        let invalid = |reason: String| Err(GameError::InvalidLevelTable { reason });
        if self.safe_counts.is_empty() {
            return invalid("no levels".into());
        }
        if self.safe_counts.len() > u8::MAX as usize {
            return invalid(format!("{} levels exceed the maximum of 255", self.safe_counts.len()));
        }
        let mut remaining = BOARD_TILES;
        for (idx, &count) in self.safe_counts.iter().enumerate() {
            let level = idx + 1;
            if count == 0 {
                return invalid(format!("level {level} has no safe tiles"));
            }
            if count as usize > remaining {
                return invalid(format!(
                    "level {level} needs {count} safe tiles but at most {remaining} remain"
                ));
            }
            remaining = count as usize;
        }
        if self.fall_delay_max_ms == 0 {
            return invalid("fall_delay_max_ms must be positive".into());
        }
        Ok(())
    }

    #[cfg(feature = "serde_json")]
    pub fn from_json(text: &str) -> Result<Self, GameError> {
        let config: GameConfig =
            serde_json::from_str(text).map_err(|e| GameError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Table lookup with the fallback for levels past the end (and level 0).
pub fn safe_count_in(table: &[u8], level: u8) -> u8 {
    level
        .checked_sub(1)
        .and_then(|idx| table.get(idx as usize))
        .copied()
        .unwrap_or(FALLBACK_SAFE_COUNT)
}

/// Safe count for the stock four-level game.
pub fn safe_count(level: u8) -> u8 {
    safe_count_in(&DEFAULT_SAFE_COUNTS, level)
}

//! Random draws: which clouds stay up, and when the others drop.
//!
//! Everything takes the RNG as a parameter so a seeded `StdRng` gives
//! repeatable boards in tests.

use rand::Rng;
use rand::seq::SliceRandom;

use super::{TileId, TileSet};
use crate::error::GameError;

/// Draws `count` safe tiles uniformly, without replacement, from the tiles
/// that have not fallen yet. Asking for more than remain is an error rather
/// than a silently short draw.
pub fn draw_safe_tiles<R: Rng + ?Sized>(
    rng: &mut R,
    level: u8,
    count: u8,
    fallen: &TileSet,
) -> Result<TileSet, GameError> {
    let available = TileSet::full().difference(fallen).to_vec();
    let wanted = count as usize;
    if wanted > available.len() {
        return Err(GameError::NotEnoughTiles {
            level,
            wanted,
            available: available.len(),
        });
    }
    Ok(available.choose_multiple(rng, wanted).copied().collect())
}

/// One tile's fall offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileFall {
    pub tile: TileId,
    pub delay_ms: f64,
}

/// Timing of one commit's collapse. The outcome must be resolved only after
/// `settle_after_ms`, which outlasts every tile (and the player) falling.
#[derive(Clone, Debug, PartialEq)]
pub struct FallSchedule {
    /// Matches the pending fall this schedule belongs to.
    pub id: u32,
    pub tiles: Vec<TileFall>,
    /// Tile the player stood on, when the player falls with it.
    pub player: Option<(TileId, f64)>,
    pub settle_after_ms: f64,
}

impl FallSchedule {
    pub fn tile_set(&self) -> TileSet {
        self.tiles.iter().map(|f| f.tile).collect()
    }

    pub fn longest_delay_ms(&self) -> f64 {
        self.tiles.iter().map(|f| f.delay_ms).fold(0.0, f64::max)
    }
}

/// Gives every newly fallen tile a random start offset and works out when
/// the whole sequence is over.
pub fn schedule_fall<R: Rng + ?Sized>(
    rng: &mut R,
    newly_fallen: &TileSet,
    player: Option<TileId>,
    delay_max_ms: u32,
    player_delay_ms: u32,
    grace_ms: u32,
) -> FallSchedule {
    let max = delay_max_ms.max(1) as f64;
    let tiles: Vec<TileFall> = newly_fallen
        .iter()
        .map(|tile| TileFall { tile, delay_ms: rng.gen_range(0.0..max) })
        .collect();
    let player = player.map(|tile| (tile, player_delay_ms as f64));
    let mut schedule = FallSchedule { id: 0, tiles, player, settle_after_ms: 0.0 };
    let player_delay = schedule.player.map(|(_, d)| d).unwrap_or(0.0);
    schedule.settle_after_ms = schedule.longest_delay_ms().max(player_delay) + grace_ms as f64;
    schedule
}

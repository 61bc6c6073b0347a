//! Level-progression state machine.
//!
//! A run goes: pick a cloud, press Play, watch every unsafe cloud drop, then
//! either climb to the next level (staying on the same cloud) or fall. The
//! controller owns the only `GameState` and talks to the page through the
//! [`Display`] trait, so the whole flow runs natively in tests.
//!
//! Pressing Play does not resolve the outcome right away. `commit` hands the
//! display a [`FallSchedule`] and parks the result; whoever owns the timers
//! calls [`GameController::settle`] once `settle_after_ms` has passed.
//! Surviving below the final level then holds on a "Safe!" message until
//! [`GameController::advance`] opens the next level.

use log::{debug, error, info};
use rand::Rng;

use crate::board::levels::GameConfig;
use crate::board::sampling::{FallSchedule, draw_safe_tiles, schedule_fall};
use crate::board::{BOARD_TILES, TileId, TileSet, TileView, board_view, is_valid_tile};
use crate::error::GameError;

pub const MSG_PICK_FIRST: &str = "Pick a safe cloud!";
pub const MSG_PICK_AGAIN: &str = "Pick a new cloud or click yours to stay!";
pub const MSG_PRESS_PLAY: &str = "Press Play to see if you're safe!";
pub const MSG_SAFE: &str = "Safe! Moving to next level...";
pub const MSG_VICTORY: &str = "You Won! Clouds Conquered! 🎉";
pub const MSG_FELL: &str = "Oops! You fell! ☁️💀";

/// Whether the Play button or the Restart button is on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    InProgress,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Victory,
    Fell,
}

/// Player actions coming from the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    SelectTile(TileId),
    Play,
    Restart,
}

/// Rendering surface the controller drives.
pub trait Display {
    fn render_board(&mut self, tiles: &[TileView; BOARD_TILES]);
    fn show_message(&mut self, text: &str);
    fn show_level(&mut self, level: u8);
    fn set_commit_enabled(&mut self, enabled: bool);
    fn set_run_state(&mut self, state: RunState);
    /// Starts the collapse. The implementation must call back into
    /// [`GameController::settle`] once `schedule.settle_after_ms` elapsed.
    fn animate_fall(&mut self, schedule: &FallSchedule);
    /// Asks for [`GameController::advance_level`] with `id` after `delay_ms`.
    fn schedule_advance(&mut self, id: u32, delay_ms: u32);
    /// Little jump of the player marker.
    fn hop(&mut self, _tile: TileId) {}
}

/// Result parked between `commit` and `settle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingFall {
    pub id: u32,
    pub survived: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub level: u8,
    pub current_tile: Option<TileId>,
    pub safe_tiles: TileSet,
    pub fallen_tiles: TileSet,
    pub is_over: bool,
    pub awaiting_selection: bool,
    /// A tile was picked during this level, so Play is live.
    pub commit_armed: bool,
    pub outcome: Option<Outcome>,
    pub pending: Option<PendingFall>,
    /// Fall id whose "Safe!" pause is running; the next level is not drawn yet.
    pub advancing: Option<u32>,
}

impl GameState {
    fn fresh() -> Self {
        Self {
            level: 1,
            current_tile: None,
            safe_tiles: TileSet::empty(),
            fallen_tiles: TileSet::empty(),
            is_over: false,
            awaiting_selection: false,
            commit_armed: false,
            outcome: None,
            pending: None,
            advancing: None,
        }
    }
}

pub struct GameController<D: Display, R: Rng> {
    config: GameConfig,
    state: GameState,
    display: D,
    rng: R,
    next_fall_id: u32,
}

impl<D: Display, R: Rng> GameController<D, R> {
    /// Builds an idle controller; call [`start_run`](Self::start_run) to begin.
    pub fn new(config: GameConfig, display: D, rng: R) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self { config, state: GameState::fresh(), display, rng, next_fall_id: 0 })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Id of the most recent fall.
    pub fn last_fall_id(&self) -> u32 {
        self.next_fall_id
    }

    /// Continues fall ids after `last`, so timers owned by a replaced
    /// controller can never match one of ours.
    pub fn continue_fall_ids_from(&mut self, last: u32) {
        self.next_fall_id = last;
    }

    /// Routes one page event.
    pub fn handle(&mut self, input: Input) -> Option<FallSchedule> {
        match input {
            Input::SelectTile(id) => {
                self.select_tile(id);
                None
            }
            Input::Play => self.commit(),
            Input::Restart => {
                self.start_run();
                None
            }
        }
    }

    /// Starts (or restarts) a run from level 1 on an intact board. Any fall
    /// still in flight is dropped; its late `settle` is ignored.
    pub fn start_run(&mut self) {
        if self.state.pending.is_some() || self.state.advancing.is_some() {
            debug!("restart discards pending fall");
        }
        self.state = GameState::fresh();
        if let Err(err) = self.enter_level() {
            error!("cannot start run: {err}");
            return;
        }
        info!("run started");
        self.display.set_run_state(RunState::InProgress);
        self.display.show_message(&format!("Level 1: {MSG_PICK_FIRST}"));
    }

    /// Moves the player onto `id` while a choice is still open.
    pub fn select_tile(&mut self, id: TileId) {
        if !self.state.awaiting_selection || self.state.is_over {
            return;
        }
        if !is_valid_tile(id) || self.state.fallen_tiles.contains(id) {
            return;
        }
        debug!("player moves to tile {id}");
        self.state.current_tile = Some(id);
        self.state.commit_armed = true;
        self.render();
        self.display.hop(id);
        self.display.set_commit_enabled(true);
        self.display.show_message(MSG_PRESS_PLAY);
    }

    /// Locks in the current tile and starts the collapse. Returns the
    /// schedule the owner has to wait out before calling `settle`.
    pub fn commit(&mut self) -> Option<FallSchedule> {
        let player = self.state.current_tile?;
        if self.state.is_over || !self.state.awaiting_selection || !self.state.commit_armed {
            return None;
        }
        self.state.awaiting_selection = false;
        self.state.commit_armed = false;
        self.display.set_commit_enabled(false);

        let newly_fallen = TileSet::full()
            .difference(&self.state.safe_tiles)
            .difference(&self.state.fallen_tiles);
        self.state.fallen_tiles = self.state.fallen_tiles.union(&newly_fallen);
        let survived = self.state.safe_tiles.contains(player);
        self.next_fall_id = self.next_fall_id.wrapping_add(1);
        let id = self.next_fall_id;
        self.state.pending = Some(PendingFall { id, survived });
        info!(
            "level {} commit on tile {player}: {} clouds drop, survived={survived}",
            self.state.level,
            newly_fallen.len()
        );

        let mut schedule = schedule_fall(
            &mut self.rng,
            &newly_fallen,
            (!survived).then_some(player),
            self.config.fall_delay_max_ms,
            self.config.player_fall_delay_ms,
            self.config.settle_grace_ms,
        );
        schedule.id = id;
        self.display.animate_fall(&schedule);
        Some(schedule)
    }

    /// Completion signal for the fall animation.
    pub fn settle(&mut self) {
        if let Some(pending) = self.state.pending.take() {
            self.on_outcome(pending.id, pending.survived);
        }
    }

    /// Like [`settle`](Self::settle) but only for the fall `id`; timers left
    /// over from a restarted run do nothing.
    pub fn settle_fall(&mut self, id: u32) {
        match self.state.pending.map(|p| p.id) {
            Some(pending_id) if pending_id == id => self.settle(),
            _ => debug!("stale settle for fall {id} ignored"),
        }
    }

    fn on_outcome(&mut self, fall_id: u32, survived: bool) {
        if !survived {
            info!("player fell at level {}", self.state.level);
            self.finish(Outcome::Fell, MSG_FELL);
            return;
        }
        if self.state.level >= self.config.final_level() {
            info!("run won");
            if let Some(tile) = self.state.current_tile {
                self.display.hop(tile);
            }
            self.finish(Outcome::Victory, MSG_VICTORY);
            return;
        }

        info!("level {} survived", self.state.level);
        self.state.advancing = Some(fall_id);
        self.display.show_message(MSG_SAFE);
        if let Some(tile) = self.state.current_tile {
            self.display.hop(tile);
        }
        self.display.schedule_advance(fall_id, self.config.interlude_ms);
    }

    /// Ends the "Safe!" pause: next level, same cloud, fresh safe draw.
    pub fn advance(&mut self) {
        if self.state.advancing.take().is_none() {
            return;
        }
        self.state.level += 1;
        self.state.commit_armed = false;
        if let Err(err) = self.enter_level() {
            // unreachable with a validated table
            error!("cannot enter level {}: {err}", self.state.level);
            return;
        }
        let level = self.state.level;
        self.display.show_message(&format!("Level {level}: {MSG_PICK_AGAIN}"));
    }

    /// [`advance`](Self::advance) for the pause started by fall `id` only.
    pub fn advance_level(&mut self, id: u32) {
        match self.state.advancing {
            Some(advancing) if advancing == id => self.advance(),
            _ => debug!("stale advance for fall {id} ignored"),
        }
    }

    fn finish(&mut self, outcome: Outcome, message: &str) {
        self.state.is_over = true;
        self.state.awaiting_selection = false;
        self.state.commit_armed = false;
        self.state.outcome = Some(outcome);
        self.display.set_commit_enabled(false);
        self.display.set_run_state(RunState::Ended);
        self.display.show_message(message);
    }

    /// Draws this level's safe tiles and opens the selection window.
    fn enter_level(&mut self) -> Result<(), GameError> {
        let level = self.state.level;
        let count = self.config.safe_count(level);
        self.state.safe_tiles =
            draw_safe_tiles(&mut self.rng, level, count, &self.state.fallen_tiles)?;
        self.state.awaiting_selection = true;
        let standing = BOARD_TILES - self.state.fallen_tiles.len();
        debug!("level {level}: {count} safe of {standing} standing");
        self.display.show_level(level);
        self.display.set_commit_enabled(false);
        self.render();
        Ok(())
    }

    fn render(&mut self) {
        let view = board_view(&self.state.fallen_tiles, self.state.current_tile);
        self.display.render_board(&view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[derive(Default)]
    struct NullDisplay {
        falls: usize,
    }

    impl Display for NullDisplay {
        fn render_board(&mut self, _tiles: &[TileView; BOARD_TILES]) {}
        fn show_message(&mut self, _text: &str) {}
        fn show_level(&mut self, _level: u8) {}
        fn set_commit_enabled(&mut self, _enabled: bool) {}
        fn set_run_state(&mut self, _state: RunState) {}
        fn animate_fall(&mut self, _schedule: &FallSchedule) {
            self.falls += 1;
        }
        fn schedule_advance(&mut self, _id: u32, _delay_ms: u32) {}
    }

    fn controller(seed: u64) -> GameController<NullDisplay, StdRng> {
        let mut c = GameController::new(
            GameConfig::default(),
            NullDisplay::default(),
            StdRng::seed_from_u64(seed),
        )
        .unwrap();
        c.start_run();
        c
    }

    #[test]
    fn test_new_rejects_bad_table() {
        let cfg = GameConfig { safe_counts: vec![5, 6], ..GameConfig::default() };
        let res = GameController::new(cfg, NullDisplay::default(), StdRng::seed_from_u64(0));
        assert!(res.is_err());
    }

    #[test]
    fn test_commit_without_selection_is_noop() {
        let mut c = controller(1);
        assert!(c.commit().is_none());
        assert!(c.state().awaiting_selection);
        assert!(c.state().fallen_tiles.is_empty());
        assert_eq!(c.display().falls, 0);
    }

    #[test]
    fn test_out_of_range_tile_is_ignored() {
        let mut c = controller(1);
        c.select_tile(25);
        assert_eq!(c.state().current_tile, None);
    }

    #[test]
    fn test_pending_fall_blocks_input() {
        let mut c = controller(2);
        c.select_tile(0);
        assert!(c.commit().is_some());
        assert!(c.state().pending.is_some());
        c.select_tile(1);
        assert_eq!(c.state().current_tile, Some(0));
        assert!(c.commit().is_none());
        assert_eq!(c.display().falls, 1);
    }

    #[test]
    fn test_settle_without_pending_is_noop() {
        let mut c = controller(3);
        let before = c.state().clone();
        c.settle();
        assert_eq!(c.state(), &before);
    }

    #[test]
    fn test_stale_settle_after_restart_is_ignored() {
        let mut c = controller(5);
        c.select_tile(0);
        let old = c.commit().unwrap();
        c.start_run();
        c.select_tile(1);
        let new = c.commit().unwrap();
        assert_ne!(old.id, new.id);
        c.settle_fall(old.id);
        assert!(c.state().pending.is_some());
        c.settle_fall(new.id);
        assert!(c.state().pending.is_none());
    }

    #[test]
    fn test_interlude_blocks_input_until_advance() {
        let mut c = controller(14);
        let tile = c.state().safe_tiles.iter().next().unwrap();
        let other = c.state().safe_tiles.iter().nth(1).unwrap();
        c.select_tile(tile);
        let schedule = c.commit().unwrap();
        c.settle();
        assert_eq!(c.state().advancing, Some(schedule.id));
        assert!(!c.state().awaiting_selection);
        c.select_tile(other);
        assert_eq!(c.state().current_tile, Some(tile));
        c.advance_level(schedule.id + 1);
        assert_eq!(c.state().level, 1);
        c.advance_level(schedule.id);
        assert_eq!(c.state().level, 2);
        assert!(c.state().advancing.is_none());
    }

    #[test]
    fn test_restart_during_interlude_ignores_late_advance() {
        let mut c = controller(15);
        let tile = c.state().safe_tiles.iter().next().unwrap();
        c.select_tile(tile);
        let schedule = c.commit().unwrap();
        c.settle();
        c.start_run();
        c.advance_level(schedule.id);
        assert_eq!(c.state().level, 1);
        assert!(c.state().awaiting_selection);
    }

    #[test]
    fn test_fall_ids_continue_from_replaced_controller() {
        let mut old = controller(16);
        old.select_tile(0);
        let old_id = old.commit().unwrap().id;

        let mut c = controller(16);
        c.continue_fall_ids_from(old.last_fall_id());
        c.select_tile(0);
        let new_id = c.commit().unwrap().id;
        assert!(new_id > old_id);
        c.settle_fall(old_id);
        assert!(c.state().pending.is_some());
    }

    #[test]
    fn test_player_falls_in_schedule_only_when_unsafe() {
        for seed in 0..20 {
            let mut c = controller(seed);
            c.select_tile(12);
            let safe = c.state().safe_tiles.contains(12);
            let schedule = c.commit().unwrap();
            assert_eq!(schedule.player.is_some(), !safe);
            assert_eq!(schedule.tiles.len(), 5);
        }
    }

    #[test]
    fn test_advancing_requires_a_fresh_pick() {
        let mut c = controller(4);
        let tile = c.state().safe_tiles.iter().next().unwrap();
        c.select_tile(tile);
        c.commit();
        c.settle();
        assert_eq!(c.state().level, 1);
        c.advance();
        assert_eq!(c.state().level, 2);
        assert_eq!(c.state().current_tile, Some(tile));
        assert!(!c.state().commit_armed);
        assert!(c.commit().is_none());
        // clicking the same cloud again re-arms Play
        c.select_tile(tile);
        assert!(c.commit().is_some());
    }
}

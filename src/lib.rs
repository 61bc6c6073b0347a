//! Cloud Hop core crate.
//!
//! Pick a cloud on a 5x5 sky, press Play, and hope it is one of the clouds
//! that stay up. Four levels, fewer safe clouds each time, and every cloud
//! that drops stays gone for the rest of the run.
//!
//! The game logic (`board`, `game`) is plain Rust and runs natively; `web`
//! renders it to the DOM when built for the browser.

use wasm_bindgen::prelude::*;

pub mod board;
pub mod error;
pub mod game;
pub mod logging;
pub mod web;

pub use board::levels::{GameConfig, safe_count};
pub use board::sampling::{FallSchedule, draw_safe_tiles};
pub use board::{BOARD_SIDE, BOARD_TILES, TileId, TileSet, TileView};
pub use error::GameError;
pub use game::{Display, GameController, GameState, Input, Outcome, RunState};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logging::init(log::LevelFilter::Info);
}

/// Mounts the board with the stock four-level table.
#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    web::mount(GameConfig::default())
}

/// Mounts the board with a JSON `GameConfig` (missing fields use defaults).
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn start_game_with_config(config_json: &str) -> Result<(), JsValue> {
    let config = GameConfig::from_json(config_json)?;
    web::mount(config)
}

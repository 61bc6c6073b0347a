use thiserror::Error;

/// Contract violations. Player mistakes (clicking a fallen cloud, pressing
/// Play with nothing selected) are silent no-ops and never show up here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("invalid level table: {reason}")]
    InvalidLevelTable { reason: String },
    #[error("level {level} wants {wanted} safe tiles but only {available} remain")]
    NotEnoughTiles {
        level: u8,
        wanted: usize,
        available: usize,
    },
    #[cfg(feature = "serde_json")]
    #[error("could not parse game config: {0}")]
    Config(String),
    #[error("DOM error: {0}")]
    Dom(String),
}

impl From<GameError> for wasm_bindgen::JsValue {
    fn from(err: GameError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}

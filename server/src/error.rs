use pong_shared::Slot;
use thiserror::Error;

/// Why a connection could not claim a slot.
///
/// The `Display` text is sent verbatim as the close reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("Invalid player_id. Must be 'player1' or 'player2'")]
    InvalidSlot(String),
    #[error("{0} is already connected")]
    SlotTaken(Slot),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("tick rate must be greater than zero")]
    ZeroTickRate,
    #[error("tick rate {0} exceeds the maximum of {max}", max = crate::config::MAX_TICK_RATE)]
    TickRateTooHigh(u32),
    #[error("field {width}x{height} is too small for two paddles")]
    FieldTooSmall { width: f32, height: f32 },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// src/error.rs
// Error taxonomy for draws, manual marking and snapshot restore.

use thiserror::Error;

use crate::defs::Number;

#[derive(Debug, Error)]
pub enum GameError {
    /// The random source could not produce a byte. Fatal to the draw in progress.
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("no balls left to draw")]
    NoBallsLeft,

    #[error("manual calling mode is not enabled")]
    ManualModeDisabled,

    #[error("automatic drawing is off in manual calling mode")]
    ManualModeActive,

    #[error("autoplay is running; pause it to call by hand")]
    AutoplayRunning,

    #[error("ball {0} is not on the board")]
    UnknownBall(Number),
}

/// Reasons a persisted session cannot be restored. Always recovered by starting fresh.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot record '{0}' is missing")]
    Missing(&'static str),

    #[error("malformed snapshot: {0}")]
    Malformed(String),

    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot storage error: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types for task I/O binding.

use ironmsg_channel::MsgError;
use thiserror::Error;

/// Error type for building channel endpoints from task descriptions.
#[derive(Debug, Error)]
pub enum TaskError {
    /// JSON (de)serialisation error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel error.
    #[error("channel error: {0}")]
    Msg(#[from] MsgError),

    /// The task declares no I/O slot with this name.
    #[error("task has no I/O slot \"{slot}\"")]
    MissingIo {
        /// Requested slot name.
        slot: String,
    },
}

//! Error types for the turn engine.

use rockhound_collection::{PurchaseError, TradeError};

/// Errors returned synchronously when an intent is refused.
///
/// Failures that happen while a turn runs are reported as events instead;
/// the turn itself never errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Another turn or mutation is in flight.
    #[error("a turn is already in progress")]
    Busy,

    /// A message needs text or at least one image.
    #[error("message has neither text nor images")]
    EmptyMessage,

    /// The trade proposal failed validation.
    #[error("trade refused: {source}")]
    Trade {
        /// Underlying error.
        #[from]
        source: TradeError,
    },

    /// The purchase failed validation.
    #[error("purchase refused: {source}")]
    Purchase {
        /// Underlying error.
        #[from]
        source: PurchaseError,
    },

    /// The spawned turn task died.
    #[error("turn task failed: {0}")]
    TaskFailed(String),

    /// The persistence writer is gone.
    #[error("persistence writer stopped")]
    PersistenceClosed,
}

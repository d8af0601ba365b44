//! Error types for protocol extraction.

/// Reasons an embedded protocol payload could not be turned into a typed
/// payload.
///
/// None of these are fatal: the turn completes as a plain message and the
/// client is shown a "malformed analysis" notice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The `IDENTIFICATION_JSON` body is not a JSON object.
    #[error("identification JSON could not be parsed: {0}")]
    InvalidJson(String),

    /// A required field of the identification is missing or empty.
    #[error("identification is missing required field: {0}")]
    MissingField(&'static str),

    /// The declared score is not an integer.
    #[error("declared score is not an integer: {0}")]
    InvalidScore(String),

    /// The trade verdict is neither `true` nor `false`.
    #[error("trade verdict must be true or false, got: {0}")]
    InvalidVerdict(String),
}

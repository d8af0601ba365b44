//! Error types for the assistant transport.
//!
//! Every error is folded into a [`TransportError`] before it reaches the
//! engine, which only distinguishes "the reply failed" from success.

use rockhound_core::TransportError;

/// Errors that can occur while preparing or streaming an assistant reply.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// The backend was unreachable or the stream broke.
    #[error("LLM backend error: {0}")]
    Backend(String),

    /// The backend answered with a non-success status.
    #[error("LLM backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The backend reported an error inside the event stream.
    #[error("LLM stream error: {0}")]
    Stream(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<AssistantError> for TransportError {
    fn from(error: AssistantError) -> Self {
        match error {
            AssistantError::Backend(message) => Self::Unreachable(message),
            AssistantError::Status { status, body } => Self::Status { status, body },
            AssistantError::Stream(message) => Self::Aborted(message),
            AssistantError::Template(_) | AssistantError::Config(_) | AssistantError::Serde(_) => {
                Self::Request(error.to_string())
            }
        }
    }
}

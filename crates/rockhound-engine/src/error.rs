//! Error types for the engine binary.
//!
//! [`StartupError`] wraps every failure mode during startup so `main` can
//! propagate with `?`.

/// Top-level startup error.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: rockhound_core::ConfigError,
    },

    /// The assistant transport could not be built.
    #[error("assistant error: {source}")]
    Assistant {
        /// The underlying assistant error.
        #[from]
        source: rockhound_assistant::AssistantError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: rockhound_server::ServerError,
    },
}

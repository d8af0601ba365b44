//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rockhound_collection::{PurchaseError, TradeError};
use rockhound_core::EngineError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Another turn or mutation is in flight.
    #[error("a turn is already in progress")]
    Busy,

    /// The request body failed validation.
    #[error("invalid request: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The request is well formed but cannot be carried out.
    #[error("{0}")]
    Unprocessable(String),

    /// The collector's score does not cover the request.
    #[error("{0}")]
    InsufficientScore(String),

    /// The request conflicts with existing state.
    #[error("{0}")]
    Conflict(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::Busy => Self::Busy,
            EngineError::EmptyMessage => Self::Unprocessable(error.to_string()),
            EngineError::Trade { source } => match source {
                TradeError::OfferedNotOwned(_) | TradeError::RequestedUnavailable(_) => {
                    Self::NotFound(source.to_string())
                }
                TradeError::Unaffordable { .. } => Self::InsufficientScore(source.to_string()),
                TradeError::Ledger { .. } => Self::Internal(source.to_string()),
            },
            EngineError::Purchase { source } => match source {
                PurchaseError::UnknownItem(_) => Self::NotFound(source.to_string()),
                PurchaseError::AlreadyOwned(_) => Self::Conflict(source.to_string()),
                PurchaseError::InsufficientScore { .. } => {
                    Self::InsufficientScore(source.to_string())
                }
                PurchaseError::Ledger { .. } => Self::Internal(source.to_string()),
            },
            EngineError::TaskFailed(_) | EngineError::PersistenceClosed => {
                Self::Internal(error.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Busy | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) | Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InsufficientScore(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

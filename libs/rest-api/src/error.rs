use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use deals_api::{PushError, StoreError};
use subscription_consistency::ConsistencyError;

/// Request-level error with its HTTP mapping.
///
/// Recoverable backend failures all render as a generic 500 — internal
/// detail goes to the log, never to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("not authenticated")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound,
            StoreError::Duplicate(key) => ApiError::Conflict(format!("duplicate: {key}")),
            StoreError::Backend(detail) => {
                tracing::error!(%detail, "store backend failure");
                ApiError::Internal
            }
        }
    }
}

impl From<ConsistencyError> for ApiError {
    fn from(e: ConsistencyError) -> Self {
        match e {
            ConsistencyError::Validation(msg) => ApiError::BadRequest(msg.to_string()),
            ConsistencyError::Store(store) => store.into(),
            ConsistencyError::Service { phase, reason } => {
                tracing::error!(%phase, %reason, "topic service failure");
                ApiError::Internal
            }
            // The coordinator already escalated; the caller still gets a
            // definite (generic) response instead of a hang or a crash.
            ConsistencyError::Inconsistent { token, phase, .. } => {
                tracing::error!(%token, %phase, "inconsistent subscription state");
                ApiError::Internal
            }
        }
    }
}

impl From<PushError> for ApiError {
    fn from(e: PushError) -> Self {
        tracing::error!(error = %e, "push publish failure");
        ApiError::Internal
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Error type covering the failure modes surfaced by the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    Validation(String),
    #[error("invalid username or password")]
    NotAuthenticated,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl TrackerError {
    fn status(&self) -> StatusCode {
        match self {
            TrackerError::Duplicate(_) => StatusCode::CONFLICT,
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            TrackerError::Storage(_) | TrackerError::Hash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal failures are logged with detail but answered generically.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")] Validation(String),
    #[error("{0}")] Auth(String),
    #[error("{0}")] Ownership(String),
    #[error("{0}")] NotFound(String),
    #[error("{0}")] Conflict(String),
    #[error("{message}")]
    Upstream { message: String, details: serde_json::Value },
    #[error("{0}")] Config(String),
    #[error("{0}")] Internal(String),
}

impl AppError {
    pub fn upstream(message: impl Into<String>, details: impl Into<serde_json::Value>) -> Self {
        AppError::Upstream { message: message.into(), details: details.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Ownership(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, "❌ {}", self);
        } else {
            tracing::warn!(%status, "{}", self);
        }
        let body = match self {
            AppError::Upstream { message, details } => {
                json!({ "success": false, "error": message, "details": details })
            }
            other => json!({ "success": false, "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

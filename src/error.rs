//! Error types for the application

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed or missing input, bad enum value
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not permitted in the current lifecycle state
    #[error("State error: {0}")]
    State(String),

    /// Uniqueness violation or resource already in a terminal state
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    /// Role or panel-membership mismatch
    #[error("Access denied: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Machine-readable code carried in the failure envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "INTERNAL",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::State(_) => "STATE_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Authorization(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::State(_) | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let detail = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            other => other.to_string(),
        };

        let status = self.status();
        let body = ApiResponse::failure(self.code(), detail);
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::UserId;

/// Application-level errors
///
/// Errors are `Clone` so that a single failed computation can be handed to every
/// request that was waiting on it.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("User ID not found: {0}")]
    InvalidUser(UserId),

    #[error("Genre '{0}' not found in the database.")]
    UnknownGenre(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Event notifier failure: {0}")]
    NotifierFailure(String),

    #[error("Timed out computing '{0}'")]
    ComputeTimeout(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::CacheUnavailable(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization error: {}", err))
    }
}

impl AppError {
    /// HTTP status this error is surfaced as
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidUser(_) | AppError::UnknownGenre(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::ComputeTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::CacheUnavailable(_)
            | AppError::NotifierFailure(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::InvalidUser(_) => "User ID not found".to_string(),
            _ => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        }

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

use crate::models::UserId;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

// --- Persistence Errors ---

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not (de)serialize value for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Stored value for key '{0}' is malformed")]
    DataCorruption(String),

    #[error("Local storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from the DynamoDB layer
}

// --- Submission / Profile Validation ---

/// Rejections raised before any state is touched. Messages are shown to users as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("You can only submit one coin per day.")]
    AlreadySubmittedToday,
    #[error("Memecoin name must include a $ symbol.")]
    MissingDollarSign,
    #[error("Memecoin name must be a single word.")]
    NotSingleWord,
    #[error("Blockchain must not be empty.")]
    EmptyChain,
    #[error("Username must not be empty.")]
    EmptyUsername,
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("User not found with ID: {0}")]
    UserNotFound(UserId),

    #[error("Could not persist session state")]
    Storage(#[source] StorageError), // Source allows seeing underlying StorageError

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::UserNotFound(id) => (StatusCode::NOT_FOUND, format!("User not found with ID: {}", id)),

            // 5xx Server Errors
            AppError::Storage(e) => {
                tracing::error!(error.source = ?e, "Storage error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Saving session state failed".to_string())
            }
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error".to_string())
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server initialization error".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(error.message = %error_message, error.detail = %self, "Responding with error");
        } else {
            tracing::debug!(error.message = %error_message, "Rejecting request");
        }

        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request_with_user_message() {
        let response = AppError::from(ValidationError::NotSingleWord).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_failures_are_server_errors() {
        let err = StorageError::DataCorruption("memes".into());
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

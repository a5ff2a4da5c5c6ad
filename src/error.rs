use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Requested book or file has no matching row.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request input. Reserved for edge validation by callers;
    /// axum's extractors already reject malformed path ids before handlers
    /// run, so the core never constructs this itself.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Underlying read from the metadata database failed.
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Feed serialization failed.
    #[error("Feed assembly error: {0}")]
    Assembly(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request error");
        }

        (status, self.to_string()).into_response()
    }
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;

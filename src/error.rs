use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed request fields; nothing was persisted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A batch operation received no items; no external call was made
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Store unavailable or constraint violated while writing; transaction rolled back
    #[error("Write error: {0}")]
    Write(#[source] sqlx::Error),

    #[error("Read error: {0}")]
    Read(#[source] sqlx::Error),

    /// Identity service unreachable or rejected the role assumption
    #[error("Credential service error: {0}")]
    CredentialService(String),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl AppError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::EmptyInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Write(_)
            | AppError::Read(_)
            | AppError::CredentialService(_)
            | AppError::ObjectStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            AppError::Write(ref e) => {
                tracing::error!("Write error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::Read(ref e) => {
                tracing::error!("Read error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::CredentialService(ref e) => {
                tracing::error!("Credential service error: {}", e);
                "Failed to issue upload credentials".to_string()
            }
            AppError::ObjectStore(ref e) => {
                tracing::error!("Object store error: {}", e);
                "Failed to delete stored files".to_string()
            }
            AppError::InvalidInput(msg) => msg,
            AppError::EmptyInput(what) => format!("{} must not be empty", what),
            AppError::Unauthorized => "Unauthorized".to_string(),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;

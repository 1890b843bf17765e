// crates/backend-lib/src/error.rs

//! Central error types + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors reported by the authentication layer.
///
/// `InvalidCredential` is deliberately generic: an unknown identifier and a
/// wrong secret produce the same variant and message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Identifier already registered: {0}")]
    DuplicateIdentifier(String),

    #[error("Invalid credentials")]
    InvalidCredential,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Store error: {0}")]
    Store(String),
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Access denied")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::InvalidCredential) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::DuplicateIdentifier(_)) => StatusCode::CONFLICT,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(AuthError::Hashing(_) | AuthError::Store(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(AuthError::InvalidCredential) => "AUTH_001",
            AppError::Auth(AuthError::DuplicateIdentifier(_)) => "AUTH_002",
            AppError::Auth(AuthError::Hashing(_)) => "AUTH_003",
            AppError::Auth(AuthError::Store(_)) => "AUTH_004",
            AppError::Forbidden => "ACCESS_001",
            AppError::NotFound(_) => "NF_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(AuthError::InvalidCredential) => "Authentication failed".to_string(),
            AppError::Auth(AuthError::DuplicateIdentifier(_)) => {
                "Identifier is not available".to_string()
            },
            AppError::Auth(_) => {
                "An internal server error occurred".to_string()
            },
            AppError::Forbidden => "Access denied".to_string(),
            AppError::NotFound(_) => "Resource not found".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "request failed");
        }

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

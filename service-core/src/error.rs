use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response;

/// Why a bearer token was rejected. The kinds stay distinct all the way to
/// the HTTP layer so clients can tell a stale token from a forged one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFailure {
    Missing,
    Expired,
    Invalid,
    Revoked,
}

impl TokenFailure {
    pub fn error_code(&self) -> &'static str {
        match self {
            TokenFailure::Missing => "TOKEN_MISSING",
            TokenFailure::Expired => "TOKEN_EXPIRED",
            TokenFailure::Invalid => "TOKEN_INVALID",
            TokenFailure::Revoked => "TOKEN_REVOKED",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            TokenFailure::Missing => "Token is required",
            TokenFailure::Expired => "Token has expired",
            TokenFailure::Invalid => "Token is invalid",
            TokenFailure::Revoked => "Token has been revoked",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{}", .0.message())]
    Unauthenticated(TokenFailure),

    #[error("User account is not active")]
    Inactive,

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidCredentials
            | AppError::Unauthenticated(_)
            | AppError::Inactive => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthenticated(kind) => kind.error_code(),
            AppError::Inactive => "USER_INACTIVE",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(anyhow::Error::new(err))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Storage(anyhow::Error::new(err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

/// Flatten `validator`'s nested error type into a `{field: [messages]}` map.
fn field_errors(errors: &validator::ValidationErrors) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let messages: Vec<serde_json::Value> = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| serde_json::Value::String(m.to_string()))
                        .unwrap_or_else(|| serde_json::Value::String(e.code.to_string()))
                })
                .collect();
            (field.to_string(), serde_json::Value::Array(messages))
        })
        .collect();
    serde_json::Value::Object(map)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.error_code();

        let (message, errors) = match &self {
            AppError::Validation(e) => ("Validation failed".to_string(), Some(field_errors(e))),
            // Storage and internal failures are logged server-side only.
            AppError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                ("Internal server error".to_string(), None)
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Unhandled internal error");
                ("Internal server error".to_string(), None)
            }
            AppError::Config(e) => {
                tracing::error!(error = %e, "Configuration error");
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        response::failure(status, &message, error_code, errors)
    }
}

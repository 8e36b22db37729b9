use service_core::error::{AppError, TokenFailure};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Deny-list error: {0}")]
    DenyList(anyhow::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Token is required")]
    TokenMissing,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is invalid")]
    TokenInvalid,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("User account is not active")]
    UserInactive,

    #[error("User not found")]
    UserNotFound,

    #[error("Role not found")]
    RoleNotFound,

    #[error("Permission not found")]
    PermissionNotFound,

    #[error("Invalid or expired reset token")]
    ResetTokenInvalid,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<crate::services::TokenError> for ServiceError {
    fn from(err: crate::services::TokenError) -> Self {
        match err {
            crate::services::TokenError::Expired => ServiceError::TokenExpired,
            crate::services::TokenError::Invalid => ServiceError::TokenInvalid,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::Storage(anyhow::Error::new(e)),
            ServiceError::DenyList(e) => AppError::Storage(e),
            ServiceError::Validation(e) => AppError::Validation(e),
            ServiceError::InvalidCredentials => AppError::InvalidCredentials,
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::TokenMissing => AppError::Unauthenticated(TokenFailure::Missing),
            ServiceError::TokenExpired => AppError::Unauthenticated(TokenFailure::Expired),
            ServiceError::TokenInvalid => AppError::Unauthenticated(TokenFailure::Invalid),
            ServiceError::TokenRevoked => AppError::Unauthenticated(TokenFailure::Revoked),
            ServiceError::UserInactive => AppError::Inactive,
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::RoleNotFound => AppError::NotFound(anyhow::anyhow!("Role not found")),
            ServiceError::PermissionNotFound => {
                AppError::NotFound(anyhow::anyhow!("Permission not found"))
            }
            ServiceError::ResetTokenInvalid => {
                AppError::BadRequest(anyhow::anyhow!("Invalid or expired reset token"))
            }
            ServiceError::Internal(e) => AppError::Internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_kinds_map_to_distinct_codes() {
        assert_eq!(AppError::from(ServiceError::TokenMissing).error_code(), "TOKEN_MISSING");
        assert_eq!(AppError::from(ServiceError::TokenExpired).error_code(), "TOKEN_EXPIRED");
        assert_eq!(AppError::from(ServiceError::TokenInvalid).error_code(), "TOKEN_INVALID");
        assert_eq!(AppError::from(ServiceError::TokenRevoked).error_code(), "TOKEN_REVOKED");
    }

    #[test]
    fn storage_failure_is_not_a_denial() {
        let err = AppError::from(ServiceError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.error_code(), "STORAGE_ERROR");

        let denied = AppError::from(ServiceError::InvalidCredentials);
        assert_eq!(denied.error_code(), "INVALID_CREDENTIALS");
    }
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::UserResponse;
use crate::services::IssuedToken;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    #[schema(example = "Jane Doe")]
    pub name: String,

    #[validate(email(message = "Invalid email format"), length(max = 255, message = "Email is too long"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "longpass1", min_length = 8)]
    pub password: String,

    #[validate(must_match(other = "password", message = "Password confirmation does not match"))]
    #[schema(example = "longpass1")]
    pub password_confirmation: String,

    #[validate(length(max = 20, message = "Phone is too long"))]
    #[schema(example = "+14155550100")]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "longpass1")]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    #[schema(example = "a1b2c3d4e5f6...")]
    pub token: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "newlongpass1", min_length = 8)]
    pub password: String,

    #[validate(must_match(other = "password", message = "Password confirmation does not match"))]
    #[schema(example = "newlongpass1")]
    pub password_confirmation: String,
}

/// Login/register/refresh payload: the principal plus its bearer token.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthPayload {
    pub user: UserResponse,
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthPayload {
    pub fn new(user: UserResponse, issued: IssuedToken) -> Self {
        Self {
            user,
            token: issued.token,
            token_type: issued.token_type,
            expires_in: issued.expires_in,
        }
    }
}

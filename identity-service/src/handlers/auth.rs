use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
    response::Response,
};
use service_core::{
    error::{AppError, TokenFailure},
    response,
};
use std::net::SocketAddr;

use crate::{
    dtos::auth::{
        AuthPayload, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    },
    middleware::AuthUser,
    models::{LoginContext, UserResponse},
    utils::ValidatedJson,
    AppState,
};

/// Register a new user
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthPayload),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation error")
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Response, AppError> {
    let payload = state.auth.register(req).await?;
    Ok(response::created(payload, "User registered successfully"))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthPayload),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Validation error")
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Response, AppError> {
    let context = LoginContext {
        ip_address: addr.ip().to_string(),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
    };

    let payload = state.auth.login(req, context).await?;
    Ok(response::ok(payload, "Login successful"))
}

/// Logout and invalidate the current token
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Unauthenticated")
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    state.auth.logout(&user.claims).await?;
    Ok(response::ok_message("Logout successful"))
}

/// Exchange the presented token for a fresh one.
///
/// Not behind the request gate: an expired token is still refreshable
/// inside the grace window, so validation happens in refresh mode here.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    responses(
        (status = 200, description = "Token refreshed", body = AuthPayload),
        (status = 401, description = "Token missing, invalid or beyond the refresh window")
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthenticated(TokenFailure::Missing))?;
    let payload = state.auth.refresh(token).await?;
    Ok(response::ok(payload, "Token refreshed successfully"))
}

/// Current principal, resolved without side effects.
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    responses(
        (status = 200, description = "Profile returned", body = UserResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthenticated(TokenFailure::Missing))?;

    match state.auth.current_user(token).await {
        Some(user) => Ok(response::ok(
            user.sanitized(),
            "User profile retrieved successfully",
        )),
        None => Err(AppError::Unauthenticated(TokenFailure::Invalid)),
    }
}

/// Request a password reset token
#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset token issued"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Validation error")
    ),
    tag = "Authentication"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Response, AppError> {
    if state.auth.forgot_password(&req.email).await? {
        Ok(response::ok_message("Password reset initiated successfully"))
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("User not found")))
    }
}

/// Redeem a password reset token
#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Invalid or expired reset token"),
        (status = 422, description = "Validation error")
    ),
    tag = "Authentication"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<Response, AppError> {
    state.auth.reset_password(&req.token, &req.password).await?;
    Ok(response::ok_message("Password reset successfully"))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

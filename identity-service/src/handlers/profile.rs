use axum::{extract::State, response::Response};
use service_core::{error::AppError, response};

use crate::{middleware::AuthUser, models::LoginLogResponse, AppState};

const LOGIN_HISTORY_LIMIT: i64 = 50;

/// Recent session-ledger entries for the current user
#[utoipa::path(
    get,
    path = "/v1/profile/login-history",
    responses(
        (status = 200, description = "Login history returned", body = [LoginLogResponse]),
        (status = 401, description = "Unauthenticated")
    ),
    tag = "Profile",
    security(("bearer_auth" = []))
)]
pub async fn login_history(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    let history: Vec<LoginLogResponse> = state
        .db
        .login_history(user.user.id, LOGIN_HISTORY_LIMIT)
        .await
        .map_err(AppError::from)?
        .into_iter()
        .map(LoginLogResponse::from)
        .collect();

    Ok(response::ok(history, "Login history retrieved successfully"))
}

/// Admin-only landing endpoint, gated on the `admin` role
#[utoipa::path(
    get,
    path = "/v1/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard data returned"),
        (status = 403, description = "Insufficient role")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn admin_dashboard(user: AuthUser) -> Result<Response, AppError> {
    Ok(response::ok(
        serde_json::json!({
            "admin_panel": true,
            "user_id": user.user.id,
        }),
        "Admin dashboard accessed successfully",
    ))
}

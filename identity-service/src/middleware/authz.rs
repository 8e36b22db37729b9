//! Permission and role gates. Layered after the request gate, so the
//! principal is already attached to the request.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{models::User, AppState};

/// Require a permission slug (direct or role-derived) for the wrapped
/// routes. Wire with `from_fn_with_state((state, slug), permission_middleware)`.
pub async fn permission_middleware(
    State((state, slug)): State<(AppState, &'static str)>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = principal(&req)?;

    let allowed = state
        .authz
        .has_permission(user.id, slug)
        .await
        .map_err(AppError::from)?;

    if !allowed {
        tracing::warn!(user_id = %user.id, permission = slug, "Permission denied");
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You don't have permission to perform this action"
        )));
    }

    Ok(next.run(req).await)
}

/// Require membership of a role. Checks the grant relations, never the
/// legacy role label.
pub async fn role_middleware(
    State((state, slug)): State<(AppState, &'static str)>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = principal(&req)?;

    let allowed = state
        .authz
        .has_role(user.id, slug)
        .await
        .map_err(AppError::from)?;

    if !allowed {
        tracing::warn!(user_id = %user.id, role = slug, "Role check failed");
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Insufficient role for this action"
        )));
    }

    Ok(next.run(req).await)
}

fn principal(req: &Request) -> Result<User, AppError> {
    req.extensions().get::<User>().cloned().ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "Authenticated principal missing from request extensions"
        ))
    })
}

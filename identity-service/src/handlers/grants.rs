//! Grant management: role and permission relations for users and roles.

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use service_core::{error::AppError, response};
use uuid::Uuid;

use crate::{
    dtos::authz::{AssignRoleRequest, GrantPermissionRequest},
    middleware::AuthUser,
    models::{PermissionResponse, RoleResponse},
    AppState,
};

/// Roles held by a user
#[utoipa::path(
    get,
    path = "/v1/users/{id}/roles",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Roles returned", body = [RoleResponse]),
        (status = 404, description = "User not found")
    ),
    tag = "Authorization",
    security(("bearer_auth" = []))
)]
pub async fn list_user_roles(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    ensure_user_exists(&state, user_id).await?;

    let roles: Vec<RoleResponse> = state
        .authz
        .roles_for_user(user_id)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(response::ok(roles, "User roles retrieved successfully"))
}

/// Assign a role to a user (idempotent)
#[utoipa::path(
    post,
    path = "/v1/users/{id}/roles",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role assigned"),
        (status = 404, description = "User or role not found")
    ),
    tag = "Authorization",
    security(("bearer_auth" = []))
)]
pub async fn assign_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    actor: AuthUser,
    Json(req): Json<AssignRoleRequest>,
) -> Result<Response, AppError> {
    ensure_user_exists(&state, user_id).await?;

    state
        .authz
        .assign_role(user_id, req.role_id, Some(actor.user.id))
        .await?;

    Ok(response::ok_message("Role assigned successfully"))
}

/// Remove a role from a user
#[utoipa::path(
    delete,
    path = "/v1/users/{id}/roles/{role_id}",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("role_id" = Uuid, Path, description = "Role id")
    ),
    responses(
        (status = 200, description = "Role removed"),
        (status = 404, description = "User not found")
    ),
    tag = "Authorization",
    security(("bearer_auth" = []))
)]
pub async fn remove_role(
    State(state): State<AppState>,
    Path((user_id, role_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, AppError> {
    ensure_user_exists(&state, user_id).await?;

    state.authz.remove_role(user_id, role_id).await?;
    Ok(response::ok_message("Role removed successfully"))
}

/// Effective permissions for a user (direct and role-derived, deduplicated)
#[utoipa::path(
    get,
    path = "/v1/users/{id}/permissions",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Permissions returned", body = [PermissionResponse]),
        (status = 404, description = "User not found")
    ),
    tag = "Authorization",
    security(("bearer_auth" = []))
)]
pub async fn list_user_permissions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    ensure_user_exists(&state, user_id).await?;

    let permissions: Vec<PermissionResponse> = state
        .authz
        .permissions_for_user(user_id)
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(response::ok(
        permissions,
        "User permissions retrieved successfully",
    ))
}

/// Grant a permission directly to a user (idempotent)
#[utoipa::path(
    post,
    path = "/v1/users/{id}/permissions",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = GrantPermissionRequest,
    responses(
        (status = 200, description = "Permission granted"),
        (status = 404, description = "User or permission not found")
    ),
    tag = "Authorization",
    security(("bearer_auth" = []))
)]
pub async fn give_permission(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    actor: AuthUser,
    Json(req): Json<GrantPermissionRequest>,
) -> Result<Response, AppError> {
    ensure_user_exists(&state, user_id).await?;

    state
        .authz
        .give_permission(user_id, req.permission_id, Some(actor.user.id))
        .await?;

    Ok(response::ok_message("Permission granted successfully"))
}

/// Revoke a direct permission from a user
#[utoipa::path(
    delete,
    path = "/v1/users/{id}/permissions/{permission_id}",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("permission_id" = Uuid, Path, description = "Permission id")
    ),
    responses(
        (status = 200, description = "Permission revoked"),
        (status = 404, description = "User not found")
    ),
    tag = "Authorization",
    security(("bearer_auth" = []))
)]
pub async fn remove_permission(
    State(state): State<AppState>,
    Path((user_id, permission_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, AppError> {
    ensure_user_exists(&state, user_id).await?;

    state.authz.remove_permission(user_id, permission_id).await?;
    Ok(response::ok_message("Permission revoked successfully"))
}

/// Grant a permission to a role (idempotent)
#[utoipa::path(
    post,
    path = "/v1/roles/{id}/permissions",
    params(("id" = Uuid, Path, description = "Role id")),
    request_body = GrantPermissionRequest,
    responses(
        (status = 200, description = "Permission granted to role"),
        (status = 404, description = "Role or permission not found")
    ),
    tag = "Authorization",
    security(("bearer_auth" = []))
)]
pub async fn give_permission_to_role(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
    Json(req): Json<GrantPermissionRequest>,
) -> Result<Response, AppError> {
    state
        .authz
        .give_permission_to_role(role_id, req.permission_id)
        .await?;

    Ok(response::ok_message("Permission granted to role successfully"))
}

/// Remove a permission from a role
#[utoipa::path(
    delete,
    path = "/v1/roles/{id}/permissions/{permission_id}",
    params(
        ("id" = Uuid, Path, description = "Role id"),
        ("permission_id" = Uuid, Path, description = "Permission id")
    ),
    responses(
        (status = 200, description = "Permission removed from role")
    ),
    tag = "Authorization",
    security(("bearer_auth" = []))
)]
pub async fn remove_permission_from_role(
    State(state): State<AppState>,
    Path((role_id, permission_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, AppError> {
    state
        .authz
        .remove_permission_from_role(role_id, permission_id)
        .await?;

    Ok(response::ok_message("Permission removed from role successfully"))
}

async fn ensure_user_exists(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    state
        .db
        .find_user_by_id(user_id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
    Ok(())
}

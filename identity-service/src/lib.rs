pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Json, Router,
};
use service_core::error::AppError;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Environment, IdentityConfig};
use crate::middleware::{auth_middleware, permission_middleware, role_middleware};
use crate::services::{slugs, AuthService, AuthzService, Database, JwtService, TokenDenyList};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::refresh,
        handlers::auth::me,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::profile::login_history,
        handlers::profile::admin_dashboard,
        handlers::grants::list_user_roles,
        handlers::grants::assign_role,
        handlers::grants::remove_role,
        handlers::grants::list_user_permissions,
        handlers::grants::give_permission,
        handlers::grants::remove_permission,
        handlers::grants::give_permission_to_role,
        handlers::grants::remove_permission_from_role,
    ),
    components(
        schemas(
            dtos::auth::RegisterRequest,
            dtos::auth::LoginRequest,
            dtos::auth::ForgotPasswordRequest,
            dtos::auth::ResetPasswordRequest,
            dtos::auth::AuthPayload,
            dtos::authz::AssignRoleRequest,
            dtos::authz::GrantPermissionRequest,
            models::user::UserResponse,
            models::role::RoleResponse,
            models::permission::PermissionResponse,
            models::login_log::LoginLogResponse,
            models::login_log::LoginContext,
            services::IssuedToken,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Credential and session lifecycle"),
        (name = "Authorization", description = "Role and permission grants"),
        (name = "Profile", description = "Current-user views"),
        (name = "Admin", description = "Role-gated administrative surface"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: IdentityConfig,
    pub db: Database,
    pub jwt: JwtService,
    pub deny_list: Arc<dyn TokenDenyList>,
    pub auth: AuthService,
    pub authz: AuthzService,
}

pub fn build_router(state: AppState) -> Router {
    // Grant-management routes, grouped by the permission that gates them.
    let users_read = Router::new()
        .route("/v1/users/:id/roles", get(handlers::grants::list_user_roles))
        .route(
            "/v1/users/:id/permissions",
            get(handlers::grants::list_user_permissions),
        )
        .layer(from_fn_with_state(
            (state.clone(), slugs::USERS_READ),
            permission_middleware,
        ));

    let users_update = Router::new()
        .route("/v1/users/:id/roles", post(handlers::grants::assign_role))
        .route(
            "/v1/users/:id/roles/:role_id",
            delete(handlers::grants::remove_role),
        )
        .route(
            "/v1/users/:id/permissions",
            post(handlers::grants::give_permission),
        )
        .route(
            "/v1/users/:id/permissions/:permission_id",
            delete(handlers::grants::remove_permission),
        )
        .layer(from_fn_with_state(
            (state.clone(), slugs::USERS_UPDATE),
            permission_middleware,
        ));

    let roles_update = Router::new()
        .route(
            "/v1/roles/:id/permissions",
            post(handlers::grants::give_permission_to_role),
        )
        .route(
            "/v1/roles/:id/permissions/:permission_id",
            delete(handlers::grants::remove_permission_from_role),
        )
        .layer(from_fn_with_state(
            (state.clone(), slugs::ROLES_UPDATE),
            permission_middleware,
        ));

    let admin = Router::new()
        .route("/v1/admin/dashboard", get(handlers::profile::admin_dashboard))
        .layer(from_fn_with_state(
            (state.clone(), "admin"),
            role_middleware,
        ));

    // Everything above plus logout/login-history sits behind the request
    // gate; the gate runs before any permission or role check.
    let gated = Router::new()
        .route("/v1/auth/logout", post(handlers::auth::logout))
        .route(
            "/v1/profile/login-history",
            get(handlers::profile::login_history),
        )
        .merge(users_read)
        .merge(users_update)
        .merge(roles_update)
        .merge(admin)
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/v1/auth/register", post(handlers::auth::register))
        .route("/v1/auth/login", post(handlers::auth::login))
        .route(
            "/v1/auth/forgot-password",
            post(handlers::auth::forgot_password),
        )
        .route(
            "/v1/auth/reset-password",
            post(handlers::auth::reset_password),
        )
        // Refresh accepts expired-but-refreshable tokens, me resolves the
        // principal itself; neither goes through the gate.
        .route("/v1/auth/refresh", post(handlers::auth::refresh))
        .route("/v1/auth/me", get(handlers::auth::me))
        .merge(gated);

    let swagger_enabled =
        state.config.environment == Environment::Dev || state.config.swagger.enabled;
    if swagger_enabled {
        app = app.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    app.with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(cors)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "A backing store is unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        AppError::from(e)
    })?;

    state.deny_list.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Deny-list health check failed");
        AppError::Storage(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": {
            "postgres": "up",
            "redis": "up"
        }
    })))
}

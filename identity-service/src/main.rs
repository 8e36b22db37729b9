use identity_service::{
    build_router,
    config::IdentityConfig,
    db,
    services::{AuthService, AuthzService, Database, JwtService, RedisDenyList, GATED_PERMISSIONS},
    AppState,
};
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = IdentityConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting identity service"
    );

    let pool = db::create_pool(&config.database, config.common.storage_timeout_seconds).await?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| service_core::error::AppError::Storage(anyhow::anyhow!(e)))?;

    let database = Database::new(pool);

    let deny_list = Arc::new(
        RedisDenyList::new(&config.redis)
            .await
            .map_err(service_core::error::AppError::Storage)?,
    );
    tracing::info!("Token deny-list initialized");

    let jwt = JwtService::new(&config.jwt);
    tracing::info!("JWT service initialized");

    let auth = AuthService::new(
        database.clone(),
        jwt.clone(),
        deny_list.clone(),
        config.session.single_session,
        config.session.reset_token_ttl_minutes,
    );
    let authz = AuthzService::new(database.clone());

    // Route gates reference permission slugs; unknown slugs abort startup
    // instead of silently denying every request.
    authz
        .verify_registry(GATED_PERMISSIONS)
        .await
        .map_err(service_core::error::AppError::from)?;
    tracing::info!("Permission registry verified");

    let state = AppState {
        config: config.clone(),
        db: database,
        jwt,
        deny_list,
        auth,
        authz,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

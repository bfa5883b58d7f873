//! Axum server setup
//!
//! Pipeline, outermost first:
//! - request tracing
//! - CORS (single allowed origin, credentials on)
//! - error normalization
//! - panic capture
//! - body parsing
//! - trailing-slash trimming
//! - resource dispatch, then the 404 fallback

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::body::parse_body;
use super::normalize::{normalize_errors, panic_response};
use super::routes::{not_found, ResourceRoutes};
use crate::config::{CorsPolicy, Environment, GatewayConfig, ServerConfig};
use crate::db;

/// Shared state handed to resource routers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub environment: Environment,
}

/// Build the request pipeline around the given resource routers.
pub fn build_router(config: GatewayConfig, routes: ResourceRoutes) -> Router {
    let config = Arc::new(config);

    let pipeline = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors))
        .layer(middleware::from_fn_with_state(config.clone(), normalize_errors))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(config.body_limit, parse_body));

    // Paths are rewritten before the inner router matches them
    let dispatch = ServiceBuilder::new()
        .layer(NormalizePathLayer::trim_trailing_slash())
        .service(routes.mount().fallback(not_found));

    Router::new().fallback_service(dispatch).layer(pipeline)
}

fn cors_layer(policy: &CorsPolicy) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::exact(policy.allowed_origin.clone()))
        .allow_methods(policy.allowed_methods.clone())
        .allow_headers(policy.allowed_headers.clone())
        .allow_credentials(policy.allow_credentials)
}

/// Run the gateway.
///
/// Schema sync is awaited before the listener binds. Its failure is logged
/// and the server starts anyway.
///
/// # Example
///
/// ```ignore
/// run_server(config, |state| {
///     ResourceRoutes::new().auth(auth::router().with_state(state))
/// })
/// .await?;
/// ```
pub async fn run_server<F>(config: ServerConfig, mount: F) -> Result<(), ServerError>
where
    F: FnOnce(AppState) -> ResourceRoutes,
{
    let pool = db::create_pool(&config.database)?;

    match db::synchronize(&pool, config.database.migrations_dir.as_deref()).await {
        Ok(report) => info!(
            migrations = report.migrations,
            "database connection successful and tables synchronized"
        ),
        Err(e) => error!(error = %e, "database connection failed"),
    }

    let state = AppState {
        pool,
        environment: config.gateway.environment.clone(),
    };
    let app = build_router(config.gateway, mount(state));

    let listener = TcpListener::bind(config.bind_addr).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!("server is up and running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            info!("received SIGTERM, starting shutdown");
        }
    }
}

/// Startup and serve failures
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database configuration error: {0}")]
    Database(#[from] sqlx::Error),
}

//! HiveDB HTTP server.
//!
//! Route handlers parse parameters, delegate to the document or file store,
//! and serialize `{ok, ...}` JSON responses. Authentication is two layers:
//! a flat API-key check on the data surface and a JWT check on the admin
//! surface.

pub mod admin;
pub mod auth_handlers;
pub mod file_handlers;
pub mod handlers;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware as axum_middleware, Extension, Router};
use tokio::net::TcpListener;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::files::FileStore;
use crate::storage::Store;

pub use admin::AdminConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_addr: String,
    /// HTTP port
    pub http_port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0".to_string(),
            http_port: 8080,
            enable_cors: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub files: Arc<FileStore>,
    pub config: ServerConfig,
    pub admin: Option<Arc<AdminConfig>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish()
    }
}

/// Builds the full application router with auth and observability layers.
/// Split out of [`start_server`] so tests can drive it directly.
pub fn build_router(state: AppState) -> Router {
    let enable_cors = state.config.enable_cors;
    let max_body = state.config.max_body_size;

    let app = Router::new()
        .merge(routes::data_routes())
        .merge(routes::auth_routes())
        .merge(routes::file_routes())
        .merge(routes::admin_routes())
        .merge(routes::health_routes())
        .layer(axum_middleware::from_fn(middleware::require_api_key))
        .layer(Extension(Arc::new(state)))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(max_body));

    if enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Start the HiveDB server
pub async fn start_server(
    config: ServerConfig,
    store: Arc<Store>,
    files: Arc<FileStore>,
    admin: Option<AdminConfig>,
) -> anyhow::Result<()> {
    info!(
        addr = %config.http_addr,
        port = config.http_port,
        "Starting HiveDB HTTP server"
    );

    if admin.is_some() {
        info!("🔒 Admin surface enabled");
    } else {
        info!("⚠️  Admin surface disabled (no admin password configured)");
    }

    let addr = format!("{}:{}", config.http_addr, config.http_port);
    let state = AppState {
        store,
        files,
        config,
        admin: admin.map(Arc::new),
    };
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    info!("❤️  Health: http://{}/health", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server failed: {}", e))
}

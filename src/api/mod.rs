//! HTTP and WebSocket surface of the dashboard
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Shared state** holding the monitor supervisor, prober, executor and history store
//! - **WebSocket** for the live event stream and `docker_action` requests
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/status` - Probe every group now
//! - `GET /api/v1/connectors` - Discovered connectors
//! - `GET /api/v1/history` - Persisted metric history
//! - `GET|PUT /api/v1/groups/core/descriptor` - Core compose file
//! - `GET|PUT /api/v1/groups/connector/:name/descriptor` - Connector compose file
//! - `WS /api/v1/stream` - Live events and actions

pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:5000")
    pub bind_addr: SocketAddr,

    /// Directory with the web frontend, served at `/`
    pub static_dir: Option<PathBuf>,

    /// Enable CORS for the dashboard
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((crate::util::get_addr(), crate::util::get_port())),
            static_dir: None,
            enable_cors: true,
        }
    }
}

/// Build the router with all routes
pub fn router(config: &ApiConfig, state: ApiState) -> Router {
    let mut app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/status", get(routes::groups::get_status))
        .route("/api/v1/connectors", get(routes::groups::list_connectors))
        .route("/api/v1/history", get(routes::history::get_history))
        .route(
            "/api/v1/groups/core/descriptor",
            get(routes::descriptors::get_core_descriptor)
                .put(routes::descriptors::save_core_descriptor),
        )
        .route(
            "/api/v1/groups/connector/:name/descriptor",
            get(routes::descriptors::get_connector_descriptor)
                .put(routes::descriptors::save_connector_descriptor),
        )
        .route("/api/v1/stream", get(websocket::websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if let Some(dist_path) = &config.static_dir {
        if dist_path.exists() {
            info!("serving web dashboard from {}", dist_path.display());
            app = app.fallback_service(ServeDir::new(dist_path));
        } else {
            info!(
                "web dashboard directory not found at {}",
                dist_path.display()
            );
        }
    }

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(&config, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}

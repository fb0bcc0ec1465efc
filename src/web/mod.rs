//! Web server module.
//!
//! Serves the dashboard view and chart data as JSON and proxies user
//! actions to the dashboard.

mod handlers;

pub use handlers::*;

use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;
use crate::refresh::RefreshCoordinator;
use crate::view::SnapshotRenderer;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: DashboardConfig,
    pub dashboard: Arc<Mutex<Dashboard>>,
    pub renderer: Arc<SnapshotRenderer>,
    pub coordinator: Arc<RefreshCoordinator>,
}

/// Web server for the dashboard.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(
        config: DashboardConfig,
        dashboard: Arc<Mutex<Dashboard>>,
        renderer: Arc<SnapshotRenderer>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            state: AppState {
                config,
                dashboard,
                renderer,
                coordinator,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            // View
            .route("/api/view", get(handlers::handle_get_view))
            .route("/api/charts", get(handlers::handle_get_charts))
            .route("/api/charts/{key}", get(handlers::handle_get_chart))
            .route("/api/refresh", post(handlers::handle_refresh))
            // Domains
            .route("/api/domains", post(handlers::handle_create_domain))
            .route("/api/domains/{id}", delete(handlers::handle_delete_domain))
            .route("/api/domains/{id}/checks", post(handlers::handle_create_check))
            // Checks
            .route(
                "/api/checks/{id}",
                put(handlers::handle_update_check).delete(handlers::handle_delete_check),
            )
            .route("/api/checks/{id}/enable", post(handlers::handle_enable_check))
            .route("/api/checks/{id}/disable", post(handlers::handle_disable_check))
            .route("/api/checks/{id}/detail", post(handlers::handle_open_detail))
            // Detail view
            .route(
                "/api/detail",
                put(handlers::handle_set_detail_period).delete(handlers::handle_close_detail),
            )
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(64 * 1024))
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

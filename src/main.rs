//! DomainPulse dashboard server.

use domainpulse_dashboard::api::HttpApi;
use domainpulse_dashboard::config::DashboardConfig;
use domainpulse_dashboard::dashboard::Dashboard;
use domainpulse_dashboard::refresh::RefreshCoordinator;
use domainpulse_dashboard::view::SnapshotRenderer;
use domainpulse_dashboard::web::Server;

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("domainpulse_dashboard=info".parse()?))
        .init();

    // Load configuration
    let cfg = DashboardConfig::load();
    tracing::info!("Starting DomainPulse dashboard on port {}...", cfg.http_port);
    tracing::info!("Using backend at {}", cfg.api_base);

    let api = Arc::new(HttpApi::new(&cfg.api_base, cfg.request_timeout())?);
    let renderer = Arc::new(SnapshotRenderer::new());
    let dashboard = Arc::new(Mutex::new(Dashboard::new(
        api,
        renderer.clone(),
        cfg.dashboard_options(),
    )));

    // Start refresh loop
    let coordinator = Arc::new(RefreshCoordinator::new(cfg.refresh_interval()));
    let cycle_dashboard = dashboard.clone();
    coordinator
        .start(move || {
            let dashboard = cycle_dashboard.clone();
            async move {
                let mut dashboard = dashboard.lock().await;
                let summary = dashboard.sync().await;
                summary.map(|_| ())
            }
        })
        .await;

    // Start web server
    let server = Server::new(cfg, dashboard, renderer, coordinator.clone());
    let served = server.start().await;

    coordinator.stop().await;
    served
}

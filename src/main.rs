mod api;
mod config;
mod error;
mod executor;
mod models;
mod paths;
mod repository;
mod services;

use crate::api::AppState;
use crate::config::Config;
use crate::executor::{ExecutionClient, HttpExecutionBackend};
use crate::repository::{SiteRepository, TicketRepository, establish_connection};
use crate::services::{
    CommandProxy, HandshakeService, HeaderSessionProvider, PassthroughSealer, PluginService,
    SiteService, ThemeService,
};
use api::create_router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "site_bridge=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Starting site_bridge with config: {:?}", config);

    if let Some(path) = config.database_url.strip_prefix("sqlite:") {
        let path = std::path::Path::new(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Establish database connection
    let db_pool = establish_connection(&config.database_url).await?;
    tracing::info!("Database connected: {}", config.database_url);

    // Initialize repositories
    let site_repo = Arc::new(SiteRepository::new(db_pool));
    let tickets = TicketRepository::new();

    // Initialize services
    let backend = HttpExecutionBackend::new(
        config.execution_backend_url.clone(),
        config.execution_api_key.clone(),
    )?;
    let proxy = CommandProxy::new(ExecutionClient::new(Arc::new(backend)));
    let site_service = SiteService::new(site_repo.clone(), tickets.clone());
    let session_header = config.session_header_name()?;

    let state = AppState {
        handshake_service: HandshakeService::new(
            site_repo,
            tickets,
            Arc::new(PassthroughSealer),
            config.public_origin.clone(),
            config.app_name.clone(),
        ),
        plugin_service: PluginService::new(site_service.clone(), proxy.clone()),
        theme_service: ThemeService::new(site_service.clone(), proxy),
        site_service,
        session_provider: Arc::new(HeaderSessionProvider::new(session_header.clone())),
    };

    // Create router
    let app = create_router(state, &config.allowed_origins(), session_header);
    let app = app.layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let addr = addr.parse::<SocketAddr>()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

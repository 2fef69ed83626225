use super::handlers::{connect, health, plugin, site, theme};
use super::middleware::cors::add_cors;
use crate::services::{HandshakeService, PluginService, SessionProvider, SiteService, ThemeService};
use axum::{
    Router,
    http::HeaderName,
    routing::{get, post},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub site_service: SiteService,
    pub handshake_service: HandshakeService,
    pub plugin_service: PluginService,
    pub theme_service: ThemeService,
    pub session_provider: Arc<dyn SessionProvider>,
}

pub fn create_router(state: AppState, cors_origins: &[String], session_header: HeaderName) -> Router {
    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Site registry
        .route("/api/sites", get(site::list_sites).post(site::create_site))
        .route(
            "/api/sites/{id}",
            get(site::get_site)
                .put(site::update_site)
                .delete(site::delete_site),
        )
        // Connection handshake
        .route("/api/sites/{id}/connect", post(connect::begin_connect))
        .route("/api/sites/{id}/disconnect", post(connect::disconnect))
        .route("/api/connect/callback", get(connect::connect_callback))
        // Remote plugins
        .route(
            "/api/sites/{id}/plugins",
            get(plugin::list_plugins)
                .post(plugin::install_plugin)
                .delete(plugin::delete_plugin),
        )
        .route("/api/sites/{id}/plugins/toggle", post(plugin::toggle_plugin))
        // Remote themes
        .route("/api/sites/{id}/themes", get(theme::list_themes))
        .route("/api/sites/{id}/themes/manage", post(theme::manage_theme))
        .with_state(state);

    add_cors(api_routes, cors_origins, session_header)
}

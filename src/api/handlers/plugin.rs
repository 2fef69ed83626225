use crate::api::dto::plugin::{
    DeletePluginQuery, InstallPluginRequest, ListQuery, PluginsListResponse, TogglePluginRequest,
};
use crate::api::middleware::auth::CurrentUser;
use crate::api::routes::AppState;
use crate::error::Result;
use crate::models::RemotePlugin;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

pub async fn list_plugins(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(site_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PluginsListResponse>> {
    let data = state
        .plugin_service
        .list_plugins(&identity, &site_id, query.refresh)
        .await?;
    Ok(Json(PluginsListResponse { data }))
}

pub async fn install_plugin(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(site_id): Path<String>,
    Json(req): Json<InstallPluginRequest>,
) -> Result<(StatusCode, Json<RemotePlugin>)> {
    let plugin = state
        .plugin_service
        .install_plugin(&identity, &site_id, &req.slug, req.activate)
        .await?;
    Ok((StatusCode::CREATED, Json(plugin)))
}

pub async fn toggle_plugin(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(site_id): Path<String>,
    Json(req): Json<TogglePluginRequest>,
) -> Result<Json<RemotePlugin>> {
    let plugin = state
        .plugin_service
        .toggle_plugin(&identity, &site_id, &req.plugin, req.current_status)
        .await?;
    Ok(Json(plugin))
}

pub async fn delete_plugin(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(site_id): Path<String>,
    Query(query): Query<DeletePluginQuery>,
) -> Result<StatusCode> {
    state
        .plugin_service
        .delete_plugin(&identity, &site_id, &query.plugin)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

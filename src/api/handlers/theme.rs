use crate::api::dto::plugin::ListQuery;
use crate::api::dto::theme::{ManageThemeRequest, ThemesListResponse};
use crate::api::middleware::auth::CurrentUser;
use crate::api::routes::AppState;
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

pub async fn list_themes(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(site_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ThemesListResponse>> {
    let data = state
        .theme_service
        .list_themes(&identity, &site_id, query.refresh)
        .await?;
    Ok(Json(ThemesListResponse { data }))
}

pub async fn manage_theme(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(site_id): Path<String>,
    Json(req): Json<ManageThemeRequest>,
) -> Result<StatusCode> {
    state
        .theme_service
        .manage_theme(&identity, &site_id, &req.stylesheet, req.action)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

use crate::api::dto::site::{CreateSiteRequest, SiteResponse, SitesListResponse, UpdateSiteRequest};
use crate::api::middleware::auth::CurrentUser;
use crate::api::routes::AppState;
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

pub async fn list_sites(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<SitesListResponse>> {
    let sites = state.site_service.list_sites(&identity).await?;
    let data = sites.into_iter().map(SiteResponse::from).collect();
    Ok(Json(SitesListResponse { data }))
}

pub async fn get_site(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<SiteResponse>> {
    let site = state.site_service.get_site(&identity, &id).await?;
    Ok(Json(SiteResponse::from(site)))
}

pub async fn create_site(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(req): Json<CreateSiteRequest>,
) -> Result<(StatusCode, Json<SiteResponse>)> {
    let site = state
        .site_service
        .create_site(&identity, &req.name, &req.url)
        .await?;
    Ok((StatusCode::CREATED, Json(SiteResponse::from(site))))
}

pub async fn update_site(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateSiteRequest>,
) -> Result<Json<SiteResponse>> {
    let site = state
        .site_service
        .update_site(&identity, &id, req.name.as_deref(), req.url.as_deref())
        .await?;
    if req.url.is_some() {
        state.plugin_service.forget_site(&id).await;
        state.theme_service.forget_site(&id).await;
    }
    Ok(Json(SiteResponse::from(site)))
}

pub async fn delete_site(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.site_service.delete_site(&identity, &id).await?;
    state.plugin_service.forget_site(&id).await;
    state.theme_service.forget_site(&id).await;
    Ok(StatusCode::NO_CONTENT)
}

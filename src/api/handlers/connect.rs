use crate::api::dto::connect::{CallbackResponse, ConnectRequest, ConnectResponse};
use crate::api::dto::site::SiteResponse;
use crate::api::middleware::auth::CurrentUser;
use crate::api::routes::AppState;
use crate::error::Result;
use crate::services::CallbackParams;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::collections::HashMap;

pub async fn begin_connect(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
    req: Option<Json<ConnectRequest>>,
) -> Result<Json<ConnectResponse>> {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    let redirect = state
        .handshake_service
        .begin_connect(&identity, &id, req.disable_encryption)
        .await?;
    Ok(Json(ConnectResponse::from(redirect)))
}

pub async fn connect_callback(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<CallbackResponse>> {
    let params = CallbackParams::from_query(&query)?;
    let outcome = state
        .handshake_service
        .handle_callback(&identity, &params)
        .await?;
    Ok(Json(CallbackResponse::from(outcome)))
}

pub async fn disconnect(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<SiteResponse>> {
    let site = state.handshake_service.disconnect(&identity, &id).await?;
    state.plugin_service.forget_site(&id).await;
    state.theme_service.forget_site(&id).await;
    Ok(Json(SiteResponse::from(site)))
}

use crate::api::routes::AppState;
use crate::error::AppError;
use crate::services::Identity;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Identity of the caller, resolved by the configured session provider.
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .session_provider
            .identify(&parts.headers)
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}

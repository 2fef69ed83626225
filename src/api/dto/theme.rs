use crate::models::{RemoteTheme, ThemeAction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ManageThemeRequest {
    pub stylesheet: String,
    pub action: ThemeAction,
}

#[derive(Debug, Serialize)]
pub struct ThemesListResponse {
    pub data: Vec<RemoteTheme>,
}

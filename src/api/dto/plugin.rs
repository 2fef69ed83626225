use crate::models::{PluginStatus, RemotePlugin};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct InstallPluginRequest {
    /// WordPress.org directory slug, e.g. `classic-editor`.
    pub slug: String,
    #[serde(default)]
    pub activate: bool,
}

#[derive(Debug, Deserialize)]
pub struct TogglePluginRequest {
    pub plugin: String,
    pub current_status: PluginStatus,
}

#[derive(Debug, Deserialize)]
pub struct DeletePluginQuery {
    pub plugin: String,
}

#[derive(Debug, Serialize)]
pub struct PluginsListResponse {
    pub data: Vec<RemotePlugin>,
}

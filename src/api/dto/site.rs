use crate::models::{ConnectionStatus, Site};
use chrono::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSiteRequest {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Public view of a site. The stored secret is never part of it.
#[derive(Debug, Serialize)]
pub struct SiteResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub url: String,
    pub username: Option<String>,
    pub status: ConnectionStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Site> for SiteResponse {
    fn from(site: Site) -> Self {
        Self {
            id: site.id,
            owner_id: site.owner_id,
            name: site.name,
            url: site.url,
            username: site.username,
            status: site.status,
            created_at: to_rfc3339(site.created_at),
            updated_at: to_rfc3339(site.updated_at),
        }
    }
}

fn to_rfc3339(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct SitesListResponse {
    pub data: Vec<SiteResponse>,
}

use serde::{Deserialize, Serialize};

/// Row shape of the `sites` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SiteRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub url: String,
    pub normalized_url: String,
    pub username: String,
    pub secret: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Unconnected,
    PendingExternalAuth,
    Connected,
}

/// A managed WordPress installation as seen by the rest of the bridge.
///
/// Built only through [`Site::from_record`], which is where the connection
/// status is derived: a non-empty stored secret means connected, otherwise a
/// pending handshake ticket means the user is out approving the application.
#[derive(Debug, Clone)]
pub struct Site {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub url: String,
    pub username: Option<String>,
    secret: Option<String>,
    pub status: ConnectionStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Site {
    pub fn from_record(record: SiteRecord, handshake_pending: bool) -> Self {
        let secret = Some(record.secret).filter(|secret| !secret.is_empty());
        let username = Some(record.username).filter(|username| !username.is_empty());
        let status = match (&secret, handshake_pending) {
            (Some(_), _) => ConnectionStatus::Connected,
            (None, true) => ConnectionStatus::PendingExternalAuth,
            (None, false) => ConnectionStatus::Unconnected,
        };

        Self {
            id: record.id,
            owner_id: record.owner_id,
            name: record.name,
            url: record.url,
            username,
            secret,
            status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Sealed secret as stored; never leaves the service layer.
    pub fn sealed_secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Base URL with a scheme, suitable for building browser redirects.
    pub fn base_url(&self) -> String {
        let trimmed = self.url.trim().trim_end_matches('/');
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        }
    }
}

/// Field-level update applied by the site store. `None` leaves a column as is.
#[derive(Debug, Clone, Default)]
pub struct SiteUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub username: Option<String>,
    pub secret: Option<String>,
}

impl SiteUpdate {
    pub fn credentials(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            secret: Some(secret.into()),
            ..Self::default()
        }
    }

    pub fn clear_credentials() -> Self {
        Self::credentials("", "")
    }
}

/// Canonical form used to compare site URLs: no scheme, no trailing slash, lowercase.
pub fn normalize_site_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    without_scheme.trim_end_matches('/').to_string()
}

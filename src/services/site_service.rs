use crate::error::{AppError, Result};
use crate::models::{Site, SiteRecord, SiteUpdate, normalize_site_url};
use crate::repository::{SiteStore, TicketRepository};
use crate::services::Identity;
use chrono::Utc;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

#[derive(Clone)]
pub struct SiteService {
    store: Arc<dyn SiteStore>,
    tickets: TicketRepository,
}

impl SiteService {
    pub fn new(store: Arc<dyn SiteStore>, tickets: TicketRepository) -> Self {
        Self { store, tickets }
    }

    pub async fn list_sites(&self, identity: &Identity) -> Result<Vec<Site>> {
        let records = self.store.list_by_owner(&identity.user_id).await?;
        let mut sites = Vec::with_capacity(records.len());
        for record in records {
            sites.push(self.to_site(record).await);
        }
        Ok(sites)
    }

    pub async fn get_site(&self, identity: &Identity, id: &str) -> Result<Site> {
        let record = self
            .store
            .get(&identity.user_id, id)
            .await?
            .ok_or_else(|| AppError::SiteNotFound(id.to_string()))?;
        Ok(self.to_site(record).await)
    }

    /// Loads a site that has delegated credentials, or fails before anything is sent.
    pub async fn require_connected(&self, identity: &Identity, id: &str) -> Result<Site> {
        let site = self.get_site(identity, id).await?;
        if !site.is_connected() {
            return Err(AppError::SiteNotConnected(id.to_string()));
        }
        Ok(site)
    }

    pub async fn create_site(&self, identity: &Identity, name: &str, url: &str) -> Result<Site> {
        let name = Self::validate_name(name)?;
        let url = Self::validate_url(url)?;
        let now = Utc::now().timestamp_millis();

        let record = SiteRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: identity.user_id.clone(),
            name,
            normalized_url: normalize_site_url(&url),
            url,
            username: String::new(),
            secret: String::new(),
            created_at: now,
            updated_at: now,
        };
        self.store.create(&record).await?;
        tracing::info!(site_id = %record.id, owner_id = %record.owner_id, "Site created");

        Ok(Site::from_record(record, false))
    }

    pub async fn update_site(
        &self,
        identity: &Identity,
        id: &str,
        name: Option<&str>,
        url: Option<&str>,
    ) -> Result<Site> {
        let mut update = SiteUpdate {
            name: name.map(Self::validate_name).transpose()?,
            url: url.map(Self::validate_url).transpose()?,
            ..SiteUpdate::default()
        };

        // Credentials are bound to the host that issued them.
        let host_changed = match &update.url {
            Some(url) => {
                let current = self
                    .store
                    .get(&identity.user_id, id)
                    .await?
                    .ok_or_else(|| AppError::SiteNotFound(id.to_string()))?;
                current.normalized_url != normalize_site_url(url)
            }
            None => false,
        };
        if host_changed {
            update.username = Some(String::new());
            update.secret = Some(String::new());
        }

        let record = self
            .store
            .update_fields(&identity.user_id, id, &update)
            .await?;
        if host_changed {
            self.tickets.discard(id).await;
            tracing::info!(site_id = %id, owner_id = %identity.user_id, "Site url changed; credentials cleared");
        }
        Ok(self.to_site(record).await)
    }

    pub async fn delete_site(&self, identity: &Identity, id: &str) -> Result<()> {
        self.store.delete(&identity.user_id, id).await?;
        self.tickets.discard(id).await;
        tracing::info!(site_id = %id, owner_id = %identity.user_id, "Site deleted");
        Ok(())
    }

    async fn to_site(&self, record: SiteRecord) -> Site {
        let pending = self.tickets.is_pending(&record.id).await;
        Site::from_record(record, pending)
    }

    fn validate_name(name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRequest(
                "Site name cannot be empty".to_string(),
            ));
        }
        Ok(name.to_string())
    }

    fn validate_url(raw: &str) -> Result<String> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(AppError::InvalidRequest("Site url cannot be empty".to_string()));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };
        let parsed = Url::parse(&candidate)
            .map_err(|e| AppError::InvalidRequest(format!("Invalid site url '{}': {}", raw, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(AppError::InvalidRequest(format!(
                "Site url must be an http(s) address: {}",
                raw
            )));
        }

        Ok(trimmed.to_string())
    }
}

use crate::error::{AppError, Result};
use crate::models::{RemoteTheme, ThemeAction};
use crate::services::{CommandProxy, Identity, ResourceCache, SiteService};

#[derive(Clone)]
pub struct ThemeService {
    sites: SiteService,
    proxy: CommandProxy,
    cache: ResourceCache<RemoteTheme>,
}

impl ThemeService {
    pub fn new(sites: SiteService, proxy: CommandProxy) -> Self {
        Self {
            sites,
            proxy,
            cache: ResourceCache::new(),
        }
    }

    pub async fn list_themes(
        &self,
        identity: &Identity,
        site_id: &str,
        refresh: bool,
    ) -> Result<Vec<RemoteTheme>> {
        let site = self.sites.require_connected(identity, site_id).await?;
        self.cache
            .get_or_fetch(&site.id, refresh, || self.proxy.list_themes(&site.id))
            .await
    }

    pub async fn manage_theme(
        &self,
        identity: &Identity,
        site_id: &str,
        stylesheet: &str,
        action: ThemeAction,
    ) -> Result<()> {
        let stylesheet = stylesheet.trim();
        if stylesheet.is_empty() {
            return Err(AppError::InvalidRequest(
                "Theme stylesheet cannot be empty".to_string(),
            ));
        }
        let site = self.sites.require_connected(identity, site_id).await?;

        self.proxy.manage_theme(&site.id, stylesheet, action).await?;
        self.cache.invalidate(&site.id).await;
        tracing::info!(site_id = %site.id, stylesheet, ?action, "Theme updated");
        Ok(())
    }

    pub async fn forget_site(&self, site_id: &str) {
        self.cache.forget(site_id).await;
    }
}

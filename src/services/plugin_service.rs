use crate::error::{AppError, Result};
use crate::models::{PluginStatus, RemotePlugin};
use crate::services::{CommandProxy, Identity, ResourceCache, SiteService, ToggleReconciler};

/// Plugin management on connected sites.
#[derive(Clone)]
pub struct PluginService {
    sites: SiteService,
    proxy: CommandProxy,
    cache: ResourceCache<RemotePlugin>,
    reconciler: ToggleReconciler,
}

impl PluginService {
    pub fn new(sites: SiteService, proxy: CommandProxy) -> Self {
        let cache = ResourceCache::new();
        let reconciler = ToggleReconciler::new(proxy.clone(), cache.clone());
        Self {
            sites,
            proxy,
            cache,
            reconciler,
        }
    }

    pub async fn list_plugins(
        &self,
        identity: &Identity,
        site_id: &str,
        refresh: bool,
    ) -> Result<Vec<RemotePlugin>> {
        let site = self.sites.require_connected(identity, site_id).await?;
        self.cache
            .get_or_fetch(&site.id, refresh, || self.proxy.list_plugins(&site.id))
            .await
    }

    pub async fn toggle_plugin(
        &self,
        identity: &Identity,
        site_id: &str,
        plugin: &str,
        current: PluginStatus,
    ) -> Result<RemotePlugin> {
        let plugin = Self::validate_plugin(plugin)?;
        let site = self.sites.require_connected(identity, site_id).await?;
        self.reconciler.toggle_active(&site.id, plugin, current).await
    }

    pub async fn install_plugin(
        &self,
        identity: &Identity,
        site_id: &str,
        slug: &str,
        activate: bool,
    ) -> Result<RemotePlugin> {
        let slug = slug.trim();
        if slug.is_empty() || slug.contains('/') {
            return Err(AppError::InvalidRequest(format!(
                "Invalid plugin slug: '{}'",
                slug
            )));
        }
        let site = self.sites.require_connected(identity, site_id).await?;

        let installed = self.proxy.install_plugin(&site.id, slug, activate).await?;
        self.cache.invalidate(&site.id).await;
        tracing::info!(site_id = %site.id, plugin = %installed.plugin, "Plugin installed");
        Ok(installed)
    }

    pub async fn delete_plugin(&self, identity: &Identity, site_id: &str, plugin: &str) -> Result<()> {
        let plugin = Self::validate_plugin(plugin)?;
        let site = self.sites.require_connected(identity, site_id).await?;

        self.proxy.delete_plugin(&site.id, plugin).await?;
        self.cache.invalidate(&site.id).await;
        tracing::info!(site_id = %site.id, plugin, "Plugin deleted");
        Ok(())
    }

    /// Drops everything cached for a site that was deleted or disconnected.
    pub async fn forget_site(&self, site_id: &str) {
        self.cache.forget(site_id).await;
    }

    fn validate_plugin(plugin: &str) -> Result<&str> {
        let plugin = plugin.trim();
        if plugin.is_empty() {
            return Err(AppError::InvalidRequest(
                "Plugin identifier cannot be empty".to_string(),
            ));
        }
        Ok(plugin)
    }
}

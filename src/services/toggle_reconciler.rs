//! Activation toggles with at most one request in flight per (site, plugin).

use crate::error::{AppError, Result};
use crate::models::{PluginStatus, RemotePlugin};
use crate::services::{CommandProxy, ResourceCache};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

type ToggleKey = (String, String);

#[derive(Clone)]
pub struct ToggleReconciler {
    proxy: CommandProxy,
    cache: ResourceCache<RemotePlugin>,
    in_flight: Arc<Mutex<HashSet<ToggleKey>>>,
}

/// Marks a key in flight; the key is released when the guard drops.
struct InFlight {
    key: ToggleKey,
    set: Arc<Mutex<HashSet<ToggleKey>>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.set).remove(&self.key);
    }
}

fn lock(set: &Mutex<HashSet<ToggleKey>>) -> MutexGuard<'_, HashSet<ToggleKey>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ToggleReconciler {
    pub fn new(proxy: CommandProxy, cache: ResourceCache<RemotePlugin>) -> Self {
        Self {
            proxy,
            cache,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Flips `plugin` to the inverse of `current` on the remote site.
    ///
    /// The returned plugin is what the site reports after the change. On
    /// success the site's cached plugin list is invalidated; on failure it is
    /// left as it was.
    ///
    /// The remote call runs on its own task that owns the in-flight key. A
    /// caller that goes away only loses the answer; the write and its cache
    /// invalidation still finish.
    pub async fn toggle_active(
        &self,
        site_id: &str,
        plugin: &str,
        current: PluginStatus,
    ) -> Result<RemotePlugin> {
        let in_flight = self.acquire(site_id, plugin)?;
        let target = current.toggled();
        tracing::info!(site_id, plugin, target = target.as_str(), "Toggling plugin");

        let proxy = self.proxy.clone();
        let cache = self.cache.clone();
        let site_id = site_id.to_string();
        let plugin = plugin.to_string();
        let task = tokio::spawn(async move {
            let _in_flight = in_flight;
            let updated = proxy.set_plugin_status(&site_id, &plugin, target).await?;
            cache.invalidate(&site_id).await;
            Ok::<_, AppError>(updated)
        });

        task.await
            .map_err(|e| AppError::Internal(format!("plugin toggle task failed: {}", e)))?
    }

    #[cfg(test)]
    pub fn is_in_flight(&self, site_id: &str, plugin: &str) -> bool {
        lock(&self.in_flight).contains(&(site_id.to_string(), plugin.to_string()))
    }

    fn acquire(&self, site_id: &str, plugin: &str) -> Result<InFlight> {
        let key = (site_id.to_string(), plugin.to_string());
        if !lock(&self.in_flight).insert(key.clone()) {
            tracing::debug!(site_id, plugin, "Toggle already in flight");
            return Err(AppError::Busy(plugin.to_string()));
        }
        Ok(InFlight {
            key,
            set: self.in_flight.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionClient;
    use crate::services::command_proxy::testing::{FakeBackend, fast_proxy};
    use serde_json::json;
    use std::time::Duration;

    const AKISMET: &str = "akismet/akismet.php";

    fn reconciler(backend: &Arc<FakeBackend>) -> (ToggleReconciler, ResourceCache<RemotePlugin>) {
        let cache = ResourceCache::new();
        let proxy = CommandProxy::new(ExecutionClient::new(backend.clone()));
        (ToggleReconciler::new(proxy, cache.clone()), cache)
    }

    fn cached_plugin() -> RemotePlugin {
        serde_json::from_value(json!({"plugin": AKISMET, "status": "active"})).unwrap()
    }

    #[tokio::test]
    async fn second_toggle_while_in_flight_is_busy() {
        let backend = Arc::new(FakeBackend::gated(
            200,
            r#"{"plugin":"akismet/akismet.php","status":"inactive"}"#,
        ));
        let (reconciler, _) = reconciler(&backend);

        let first = reconciler.toggle_active("s1", AKISMET, PluginStatus::Active);
        let second = async {
            backend.entered.notified().await;
            let result = reconciler
                .toggle_active("s1", AKISMET, PluginStatus::Active)
                .await;
            backend.release();
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap().status, PluginStatus::Inactive);
        assert!(matches!(second, Err(AppError::Busy(_))));
        assert_eq!(backend.submit_count(), 1);
        assert!(!reconciler.is_in_flight("s1", AKISMET));
    }

    #[tokio::test]
    async fn abandoned_toggle_keeps_key_until_remote_write_finishes() {
        let backend = Arc::new(FakeBackend::gated(
            200,
            r#"{"plugin":"akismet/akismet.php","status":"inactive"}"#,
        ));
        let (reconciler, cache) = reconciler(&backend);
        cache.fill("s1", 0, vec![cached_plugin()]).await;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            reconciler.toggle_active("s1", AKISMET, PluginStatus::Active),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(reconciler.is_in_flight("s1", AKISMET));

        let second = reconciler
            .toggle_active("s1", AKISMET, PluginStatus::Inactive)
            .await;
        assert!(matches!(second, Err(AppError::Busy(_))));
        assert_eq!(backend.submit_count(), 1);

        backend.release();
        tokio::time::timeout(Duration::from_secs(5), async {
            while reconciler.is_in_flight("s1", AKISMET) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(cache.get("s1").await, None);
        assert_eq!(backend.submit_count(), 1);
    }

    #[tokio::test]
    async fn unanswered_toggle_keeps_cache_and_releases_key() {
        let backend = Arc::new(FakeBackend::new(200, ""));
        let cache = ResourceCache::new();
        let reconciler = ToggleReconciler::new(fast_proxy(&backend), cache.clone());
        cache.fill("s1", 0, vec![cached_plugin()]).await;

        let err = reconciler
            .toggle_active("s1", AKISMET, PluginStatus::Active)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NoResponse));
        assert_eq!(cache.get("s1").await, Some(vec![cached_plugin()]));
        assert!(!reconciler.is_in_flight("s1", AKISMET));
    }

    #[tokio::test]
    async fn different_sites_do_not_block_each_other() {
        let backend = Arc::new(FakeBackend::new(
            200,
            r#"{"plugin":"akismet/akismet.php","status":"inactive"}"#,
        ));
        let (reconciler, _) = reconciler(&backend);

        let (a, b) = tokio::join!(
            reconciler.toggle_active("s1", AKISMET, PluginStatus::Active),
            reconciler.toggle_active("s2", AKISMET, PluginStatus::Active)
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(backend.submit_count(), 2);
    }

    #[tokio::test]
    async fn success_invalidates_cached_list() {
        let backend = Arc::new(FakeBackend::new(
            200,
            r#"{"plugin":"akismet/akismet.php","status":"inactive"}"#,
        ));
        let (reconciler, cache) = reconciler(&backend);
        cache.fill("s1", 0, vec![cached_plugin()]).await;

        reconciler
            .toggle_active("s1", AKISMET, PluginStatus::Active)
            .await
            .unwrap();

        assert_eq!(cache.get("s1").await, None);
        assert_eq!(backend.last_payload().unwrap()["body"], json!({"status": "inactive"}));
    }

    #[tokio::test]
    async fn failure_leaves_cache_and_releases_key() {
        let backend = Arc::new(FakeBackend::new(
            500,
            r#"{"message":"Plugin file does not exist."}"#,
        ));
        let (reconciler, cache) = reconciler(&backend);
        cache.fill("s1", 0, vec![cached_plugin()]).await;

        let err = reconciler
            .toggle_active("s1", AKISMET, PluginStatus::Active)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RemoteFailed { status: 500, .. }));
        assert_eq!(cache.get("s1").await, Some(vec![cached_plugin()]));
        assert!(!reconciler.is_in_flight("s1", AKISMET));
    }
}

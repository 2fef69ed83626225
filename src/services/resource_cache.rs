use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug)]
struct Entry<T> {
    generation: u64,
    items: Option<Vec<T>>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            items: None,
        }
    }
}

/// Per-site cache of remote resource lists.
///
/// Only two writers exist: a read-through fill and invalidation. Each
/// invalidation bumps the site's generation, and a fill that started before
/// the bump is dropped, so a slow read never reinstates a list that a
/// mutation already made stale.
#[derive(Debug)]
pub struct ResourceCache<T> {
    entries: Arc<RwLock<HashMap<String, Entry<T>>>>,
}

impl<T> Clone for ResourceCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Clone> ResourceCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, site_id: &str) -> Option<Vec<T>> {
        let entries = self.entries.read().await;
        entries.get(site_id).and_then(|entry| entry.items.clone())
    }

    pub async fn generation(&self, site_id: &str) -> u64 {
        let entries = self.entries.read().await;
        entries.get(site_id).map_or(0, |entry| entry.generation)
    }

    /// Stores `items` unless the site was invalidated since `generation` was read.
    pub async fn fill(&self, site_id: &str, generation: u64, items: Vec<T>) -> bool {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(site_id.to_string()).or_default();
        if entry.generation != generation {
            tracing::debug!(site_id, "Dropping stale resource list");
            return false;
        }
        entry.items = Some(items);
        true
    }

    pub async fn invalidate(&self, site_id: &str) {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(site_id.to_string()).or_default();
        entry.generation += 1;
        entry.items = None;
    }

    pub async fn forget(&self, site_id: &str) {
        self.entries.write().await.remove(site_id);
    }

    /// Returns the cached list, or runs `fetch` and caches its result.
    pub async fn get_or_fetch<F, Fut>(&self, site_id: &str, refresh: bool, fetch: F) -> Result<Vec<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        if refresh {
            self.invalidate(site_id).await;
        } else if let Some(items) = self.get(site_id).await {
            return Ok(items);
        }

        let generation = self.generation(site_id).await;
        let items = fetch().await?;
        self.fill(site_id, generation, items.clone()).await;
        Ok(items)
    }
}

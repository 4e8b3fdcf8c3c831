//! Version-stamped asset caches.

use std::sync::Arc;

use dashmap::DashMap;

use crate::offline::fetch::AssetFetcher;
use crate::offline::{CachedAsset, OfflineError};

type Cache = Arc<DashMap<String, CachedAsset>>;

/// Named caches of assets keyed by request path.
///
/// Entries are added at install time and never individually invalidated;
/// a new cache name replaces the old cache as a whole on activation.
#[derive(Clone, Default)]
pub struct AssetStore {
    caches: Arc<DashMap<String, Cache>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, cache_name: &str) -> Cache {
        self.caches
            .entry(cache_name.to_string())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .value()
            .clone()
    }

    /// Fetch every manifest entry and add them to `cache_name`.
    ///
    /// All or nothing: if any fetch fails, no entry of this batch is added.
    pub async fn install<F: AssetFetcher>(
        &self,
        cache_name: &str,
        manifest: &[String],
        fetcher: &F,
    ) -> Result<usize, OfflineError> {
        let cache = self.open(cache_name);
        tracing::info!(cache = %cache_name, "Cache opened");

        let mut batch = Vec::with_capacity(manifest.len());
        for path in manifest {
            let asset = fetcher.fetch(path).await?;
            batch.push((path.clone(), asset));
        }

        let added = batch.len();
        for (path, asset) in batch {
            cache.insert(path, asset);
        }

        tracing::info!(cache = %cache_name, assets = added, "Assets precached");
        Ok(added)
    }

    /// Delete every cache except `current`. Returns the deleted names.
    pub fn activate(&self, current: &str) -> Vec<String> {
        let stale: Vec<String> = self
            .caches
            .iter()
            .filter(|entry| entry.key() != current)
            .map(|entry| entry.key().clone())
            .collect();

        for name in &stale {
            tracing::info!(cache = %name, "Deleting stale cache");
            self.caches.remove(name);
        }

        stale
    }

    pub fn lookup(&self, cache_name: &str, path: &str) -> Option<CachedAsset> {
        let cache = self.caches.get(cache_name)?.value().clone();
        let asset = cache.get(path).map(|entry| entry.value().clone());
        asset
    }

    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

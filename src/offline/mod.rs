//! Offline asset cache.
//!
//! # Data Flow
//! ```text
//! startup:
//!     install   → fetch.rs pulls every manifest path from the origin
//!               → store.rs adds the batch to the versioned cache
//!     activate  → store.rs deletes every cache with another name
//!
//! GET /<asset>:
//!     AssetCache::respond → current cache hit, else origin fetch (not stored)
//! ```

pub mod fetch;
pub mod store;

use bytes::Bytes;
use thiserror::Error;

use crate::observability::metrics;

pub use fetch::{AssetFetcher, OriginFetcher};
pub use store::AssetStore;

/// A stored response body and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OfflineError {
    #[error("failed to fetch '{path}': {message}")]
    Fetch { path: String, message: String },

    #[error("origin returned {status} for '{path}'")]
    Status { path: String, status: u16 },

    #[error("invalid asset path '{path}': {message}")]
    InvalidPath { path: String, message: String },
}

/// Cache-first asset lookup with network fall-through.
#[derive(Clone)]
pub struct AssetCache<F> {
    store: AssetStore,
    cache_name: String,
    fetcher: Option<F>,
}

impl<F: AssetFetcher> AssetCache<F> {
    pub fn new(store: AssetStore, cache_name: impl Into<String>, fetcher: Option<F>) -> Self {
        Self {
            store,
            cache_name: cache_name.into(),
            fetcher,
        }
    }

    /// Install `manifest` into the current cache, then drop stale caches.
    ///
    /// A failed install is logged and returned; stale caches are only
    /// removed after a successful one.
    pub async fn install_and_activate(&self, manifest: &[String]) -> Result<usize, OfflineError> {
        let Some(fetcher) = &self.fetcher else {
            tracing::warn!("No asset origin configured, skipping precache");
            return Ok(0);
        };

        match self.store.install(&self.cache_name, manifest, fetcher).await {
            Ok(added) => {
                self.store.activate(&self.cache_name);
                Ok(added)
            }
            Err(e) => {
                tracing::error!(error = %e, cache = %self.cache_name, "Failed to precache assets");
                Err(e)
            }
        }
    }

    /// Serve `path` from the current cache, or from the origin when absent.
    pub async fn respond(&self, path: &str) -> Option<CachedAsset> {
        if let Some(asset) = self.store.lookup(&self.cache_name, path) {
            metrics::record_asset_lookup(true);
            return Some(asset);
        }
        metrics::record_asset_lookup(false);

        let fetcher = self.fetcher.as_ref()?;
        match fetcher.fetch(path).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                tracing::debug!(error = %e, path = %path, "Origin fetch failed");
                None
            }
        }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }
}

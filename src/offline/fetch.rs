//! Fetching assets from the origin.

use std::future::Future;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::offline::{CachedAsset, OfflineError};

/// Source of assets for install and cache misses.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<CachedAsset, OfflineError>> + Send;
}

/// Fetches origin-absolute paths (`/manifest.json`) over HTTP.
#[derive(Clone, Debug)]
pub struct OriginFetcher {
    client: reqwest::Client,
    origin: Url,
}

impl OriginFetcher {
    pub fn new(client: reqwest::Client, origin: Url) -> Self {
        Self { client, origin }
    }

    /// Resolve `path` against the origin root.
    ///
    /// Leading slashes are collapsed so `//host/x` stays a path on the
    /// origin; anything that still resolves to another scheme, host or port
    /// is rejected.
    pub fn url_for(&self, path: &str) -> Result<Url, OfflineError> {
        let invalid = |message: String| OfflineError::InvalidPath {
            path: path.to_string(),
            message,
        };

        let relative = path.trim_start_matches(|c: char| c == '/' || c == '\\');
        let url = self
            .origin
            .join(&format!("/{}", relative))
            .map_err(|e| invalid(e.to_string()))?;

        if url.scheme() != self.origin.scheme()
            || url.host_str() != self.origin.host_str()
            || url.port_or_known_default() != self.origin.port_or_known_default()
        {
            return Err(invalid(format!("resolves outside {}", self.origin)));
        }
        Ok(url)
    }
}

impl AssetFetcher for OriginFetcher {
    async fn fetch(&self, path: &str) -> Result<CachedAsset, OfflineError> {
        let url = self.url_for(path)?;
        let fetch_error = |e: reqwest::Error| OfflineError::Fetch {
            path: path.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(OfflineError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body: Bytes = response.bytes().await.map_err(fetch_error)?;

        Ok(CachedAsset { content_type, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_resolve_against_origin_root() {
        let fetcher = OriginFetcher::new(
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:3000/app/").unwrap(),
        );
        assert_eq!(
            fetcher.url_for("/manifest.json").unwrap().as_str(),
            "http://127.0.0.1:3000/manifest.json"
        );
    }

    #[test]
    fn test_network_path_stays_on_origin() {
        let fetcher = OriginFetcher::new(
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:3000/").unwrap(),
        );

        for path in ["//evil.example/x", "///evil.example/x", "/\\evil.example/x"] {
            let url = fetcher.url_for(path).unwrap();
            assert_eq!(url.host_str(), Some("127.0.0.1"), "{path}");
            assert_eq!(url.port(), Some(3000), "{path}");
            assert_eq!(url.path(), "/evil.example/x", "{path}");
        }
    }
}

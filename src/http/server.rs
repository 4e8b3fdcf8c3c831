//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the executor, relay and upstream proxy from configuration
//! - Create the Axum router and wire up middleware (request ID, tracing, timeout)
//! - Precache offline assets before serving
//! - Apply retry policy reloads while running
//! - Stop on the shutdown broadcast

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{any, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::config::{RelayConfig, RetryConfig};
use crate::executor::{Executor, HttpTransport, RetryPolicy};
use crate::http::handlers;
use crate::http::proxy::Upstream;
use crate::http::ServerError;
use crate::lifecycle::Shutdown;
use crate::offline::{AssetCache, AssetStore, OriginFetcher};
use crate::relay::RelayClient;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: RelayClient,
    pub upstream: Arc<Upstream>,
    pub assets: Option<AssetCache<OriginFetcher>>,
}

/// HTTP front of the relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
    executor: Arc<Executor<HttpTransport>>,
    assets: Option<AssetCache<OriginFetcher>>,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Build all subsystems. Must be called inside a Tokio runtime: the
    /// relay worker is spawned here.
    pub fn new(config: RelayConfig, shutdown: Shutdown) -> Result<Self, ServerError> {
        let transport = HttpTransport::with_header_name(&config.upstream.credential_header)
            .map_err(|e| ServerError::Config(format!("upstream.credential_header: {}", e)))?;
        let executor = Arc::new(Executor::new(transport, RetryPolicy::from(&config.retries)));
        let relay = RelayClient::connect(executor.clone(), shutdown.subscribe());
        let upstream = Arc::new(Upstream::from_config(&config.upstream)?);
        let assets = Self::build_assets(&config)?;

        let state = AppState {
            relay,
            upstream,
            assets: assets.clone(),
        };
        let router = Self::build_router(&config, state);

        Ok(Self {
            router,
            config,
            executor,
            assets,
            shutdown,
        })
    }

    fn build_assets(config: &RelayConfig) -> Result<Option<AssetCache<OriginFetcher>>, ServerError> {
        if !config.offline.enabled {
            return Ok(None);
        }

        let fetcher = match &config.offline.origin_url {
            Some(origin) => {
                let origin = Url::parse(origin)
                    .map_err(|e| ServerError::Config(format!("offline.origin_url: {}", e)))?;
                Some(OriginFetcher::new(reqwest::Client::new(), origin))
            }
            None => None,
        };

        Ok(Some(AssetCache::new(
            AssetStore::new(),
            config.offline.cache_name.clone(),
            fetcher,
        )))
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(handlers::status))
            .route("/relay/jobs", post(handlers::submit_job))
            .route("/{*path}", any(handlers::by_path))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve on `listener` until shutdown is triggered.
    ///
    /// Every config arriving on `config_updates` replaces the retry policy
    /// for jobs started afterwards.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(assets) = &self.assets {
            // A failed precache is already logged; serving continues without it.
            let _ = assets
                .install_and_activate(&self.config.offline.manifest)
                .await;
        }

        let executor = self.executor.clone();
        let request_timeout = Duration::from_secs(self.config.timeouts.request_secs);
        let mut reload_shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) if fits_request_timeout(&config.retries, request_timeout) => {
                            tracing::info!("Retry policy reloaded");
                            executor.set_policy(RetryPolicy::from(&config.retries));
                        }
                        Some(_) => tracing::warn!(
                            request_secs = request_timeout.as_secs(),
                            "Reloaded retry policy exceeds the running request timeout, keeping current policy"
                        ),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(self.shutdown.signalled())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// The request timeout is fixed when the router is built, so a reloaded
/// policy must still finish inside it.
fn fits_request_timeout(retries: &RetryConfig, request_timeout: Duration) -> bool {
    retries
        .worst_case_job()
        .is_some_and(|budget| budget <= request_timeout)
}

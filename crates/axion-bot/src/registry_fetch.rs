//! Device registry fetching with caching
//!
//! The registry is fetched with a single GET, tagged as structured or flat
//! text from its content type, parsed, and cached as one snapshot. Any
//! failure degrades to an empty registry so callers report "not found"
//! instead of failing.

use anyhow::{Context, Result};
use axion_core::{FreshnessCache, Registry, RegistryPayload};
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Registry loader backed by the shared freshness cache
#[derive(Clone)]
pub struct RegistryLoader {
    /// HTTP client
    client: reqwest::Client,
    /// Registry URL
    url: String,
    cache: Arc<FreshnessCache>,
}

impl RegistryLoader {
    /// Create a new registry loader
    pub fn new(url: impl Into<String>, cache: Arc<FreshnessCache>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
            cache,
        })
    }

    /// Get the current registry snapshot
    ///
    /// Served from cache while fresh. Never fails: fetch and parse errors
    /// are logged and yield an empty registry, which is not cached.
    pub async fn load(&self) -> Arc<Registry> {
        if let Some(registry) = self.cache.directory().await {
            debug!(devices = registry.len(), "Using cached device registry");
            return registry;
        }

        match self.fetch().await {
            Ok(registry) => {
                let registry = Arc::new(registry);
                self.cache.store_directory(registry.clone()).await;
                registry
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Failed to load device registry");
                Arc::new(Registry::default())
            }
        }
    }

    async fn fetch(&self) -> Result<Registry> {
        debug!(url = %self.url, "Fetching device registry");

        let response = self
            .client
            .get(&self.url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .context("Registry request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Registry fetch failed with status {}", response.status());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .context("Failed to read registry response body")?;

        let payload = RegistryPayload::from_response(content_type.as_deref(), body);
        let registry = payload.parse()?;

        info!(
            format = payload.kind(),
            devices = registry.len(),
            maintainers = registry.maintainers().len(),
            "Loaded device registry"
        );

        Ok(registry)
    }
}

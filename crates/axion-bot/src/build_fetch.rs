//! Build manifest fetching with caching
//!
//! One manifest per (codename, variant) at `{base}/{VARIANT}/{codename}.json`.
//! A missing manifest, a non-success status or an empty release list all mean
//! "no build". Those negative answers are re-fetched on every call unless
//! negative caching is enabled, so freshly published builds show up at once.

use anyhow::{Context, Result};
use axion_core::{parse_latest_build, BuildKey, BuildRecord, FreshnessCache, Variant};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Build lookup service backed by the shared freshness cache
#[derive(Clone)]
pub struct BuildLookup {
    /// HTTP client
    client: reqwest::Client,
    /// Base URL of the manifest tree
    base_url: String,
    cache: Arc<FreshnessCache>,
    /// Cache "no build" answers as well
    cache_negative: bool,
}

impl BuildLookup {
    /// Create a new build lookup service
    pub fn new(
        base_url: impl Into<String>,
        cache: Arc<FreshnessCache>,
        cache_negative: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            cache,
            cache_negative,
        })
    }

    /// Construct the manifest URL for a device and variant
    ///
    /// For base "https://host/OTA", codename "pipa" and GMS, returns
    /// "https://host/OTA/GMS/pipa.json"
    pub fn construct_manifest_url(base_url: &str, codename: &str, variant: Variant) -> String {
        format!(
            "{}/{}/{}.json",
            base_url.trim_end_matches('/'),
            variant.as_str(),
            codename
        )
    }

    /// Get the latest build for a device and variant
    ///
    /// Never fails: errors are logged and reported as no build.
    pub async fn lookup(&self, codename: &str, variant: Variant) -> Option<BuildRecord> {
        let key = BuildKey::new(codename, variant);

        if let Some(cached) = self.cache.build(&key).await {
            debug!(codename = %codename, variant = %variant, "Using cached build lookup");
            return cached;
        }

        match self.fetch(codename, variant).await {
            Ok(build) => {
                if build.is_some() || self.cache_negative {
                    self.cache.store_build(key, build.clone()).await;
                }
                build
            }
            // Failures are never cached, not even as "no build"
            Err(e) => {
                warn!(
                    codename = %codename,
                    variant = %variant,
                    error = %e,
                    "Failed to fetch build manifest"
                );
                None
            }
        }
    }

    async fn fetch(&self, codename: &str, variant: Variant) -> Result<Option<BuildRecord>> {
        let url = Self::construct_manifest_url(&self.base_url, codename, variant);
        debug!(url = %url, "Fetching build manifest");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Build manifest request failed")?;

        if !response.status().is_success() {
            debug!(
                codename = %codename,
                variant = %variant,
                status = %response.status(),
                "No build manifest available"
            );
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .context("Failed to read build manifest body")?;

        let build = parse_latest_build(&body)?;
        match &build {
            Some(build) => info!(
                codename = %codename,
                variant = %variant,
                version = %build.version,
                "Fetched build manifest"
            ),
            None => debug!(codename = %codename, variant = %variant, "Empty build manifest"),
        }

        Ok(build)
    }
}

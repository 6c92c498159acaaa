//! Application state management

use anyhow::{Context, Result};
use axion_core::FreshnessCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::build_fetch::BuildLookup;
use crate::config::Config;
use crate::registry_fetch::RegistryLoader;
use crate::router::UpdateRouter;
use crate::telegram::TelegramClient;

/// Shared application state
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Update router wired to the Bot API
    pub router: UpdateRouter<TelegramClient>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Result<Arc<Self>> {
        // One cache shared by the registry loader and the build lookups
        let cache = Arc::new(FreshnessCache::new(
            config.cache.ttl(),
            config.cache.max_build_entries,
        ));
        let source_timeout = Duration::from_secs(config.sources.timeout_secs);

        let registry =
            RegistryLoader::new(&config.sources.registry_url, cache.clone(), source_timeout)?;
        let builds = BuildLookup::new(
            &config.sources.build_base_url,
            cache,
            config.cache.cache_negative_lookups,
            source_timeout,
        )?;
        let messenger = TelegramClient::new(
            &config.telegram.api_base,
            &config.telegram.token,
            Duration::from_secs(config.telegram.timeout_secs),
        )
        .context("Failed to create Bot API client")?;

        info!(
            ttl_secs = config.cache.ttl_secs,
            max_build_entries = config.cache.max_build_entries,
            negative_caching = config.cache.cache_negative_lookups,
            "Freshness cache configured"
        );

        let router = UpdateRouter::new(registry, builds, messenger, config.replies.max_message_len);

        Ok(Arc::new(Self { config, router }))
    }
}

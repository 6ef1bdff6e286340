//! Application state for the Actix-web server
//!
//! `AppState` is wrapped in `web::Data` and shared by every handler. The
//! cache and metrics guard their own maps; everything else is read-only
//! after startup.

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::http_client::Fetcher;
use crate::metrics::MetricsTracker;
use crate::sources::SourceRegistry;
use std::sync::Arc;

/// Shared application state for Actix-web handlers
pub struct AppState {
    /// Adapters by name
    pub registry: SourceRegistry,
    /// Transport used by the image proxy (adapters hold their own handle)
    pub fetcher: Arc<dyn Fetcher>,
    /// Route-level response cache
    pub cache: ResponseCache,
    /// Per-source request metrics
    pub metrics: MetricsTracker,
    /// Application configuration
    pub config: Config,
}

impl AppState {
    /// Build the registry and cache from `config` around one transport
    pub fn new(config: Config, fetcher: Arc<dyn Fetcher>) -> Self {
        let registry = SourceRegistry::from_config(&config, fetcher.clone());
        Self::with_registry(config, fetcher, registry)
    }

    pub fn with_registry(config: Config, fetcher: Arc<dyn Fetcher>, registry: SourceRegistry) -> Self {
        Self {
            registry,
            fetcher,
            cache: ResponseCache::new(config.cache.clone()),
            metrics: MetricsTracker::new(),
            config,
        }
    }
}

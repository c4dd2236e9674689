//! Service Context Module
//!
//! Composition root tying the cache and the limiter registry together
//! for one process scope.
//!
//! Rather than process-global singletons, callers construct one context
//! per logical scope, hand clones of its cache handle to whoever needs
//! them, and call [`shutdown`](ServiceContext::shutdown) when the scope
//! ends so every owned timer stops.

use std::sync::Mutex;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::limiter::LimiterRegistry;
use crate::tasks::spawn_cache_sweep;

// == Service Context ==
/// Owns the shared cache, its sweep task, and the limiter registry.
pub struct ServiceContext {
    cache: TtlCache<Value>,
    limiters: LimiterRegistry,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceContext {
    // == Constructor ==
    /// Builds a context from configuration and starts its background
    /// tasks. Must be called from within a Tokio runtime.
    pub fn new(config: &Config) -> Self {
        let cache: TtlCache<Value> =
            TtlCache::new(config.cache_max_entries, config.cache_default_ttl_ms);
        let sweep_task = spawn_cache_sweep(cache.clone(), config.cache_sweep_interval_ms);
        let limiters = LimiterRegistry::from_config(config);

        info!(
            max_entries = config.cache_max_entries,
            default_ttl_ms = config.cache_default_ttl_ms,
            "service context initialized"
        );

        Self {
            cache,
            limiters,
            sweep_task: Mutex::new(Some(sweep_task)),
        }
    }

    /// Builds a context from environment variables.
    pub fn from_env() -> Self {
        Self::new(&Config::from_env())
    }

    // == Accessors ==
    /// The shared command result cache.
    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    /// The named limiter registry.
    pub fn limiters(&self) -> &LimiterRegistry {
        &self.limiters
    }

    // == Shutdown ==
    /// Stops the cache sweep and every limiter cleanup task. Safe to call
    /// more than once.
    pub fn shutdown(&self) {
        if let Some(handle) = self
            .sweep_task
            .lock()
            .expect("sweep handle poisoned")
            .take()
        {
            handle.abort();
        }
        self.limiters.destroy_all();
        info!("service context shut down");
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_context_wires_cache_and_limiters() {
        let context = ServiceContext::new(&Config::default());

        context
            .cache()
            .set("guild:1:settings", json!({"welcome": true}), None)
            .await;
        assert_eq!(
            context.cache().get("guild:1:settings").await,
            Some(json!({"welcome": true}))
        );

        assert!(context
            .limiters()
            .get("light")
            .check_limit("user-1", 1.0)
            .allowed);

        context.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let context = ServiceContext::new(&Config::default());

        context.shutdown();
        context.shutdown();

        // State is still readable after shutdown; only the timers stop
        assert_eq!(context.cache().len().await, 0);
    }
}

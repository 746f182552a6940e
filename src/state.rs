//! Shared application state for Axum handlers.
//!
//! The store is an explicit object owned by the state and handed to the
//! router, rather than a module-level global. Tests build a fresh state (and
//! therefore a fresh store) per case.
//!
//! # Thread Safety
//!
//! `AppState` is cheap to clone: the store is an `Arc` around its lock and
//! the configuration is shared behind an `Arc`.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::config::Config;
use crate::store::ProductStore;

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The product collection
    pub store: ProductStore,
    /// Application configuration
    pub config: Arc<Config>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    /// Create application state, seeding the store when the configuration
    /// asks for sample data.
    pub fn new(config: Config) -> Self {
        let store = if config.seed_sample_data {
            let store = ProductStore::seeded();
            info!("Store seeded with sample products");
            store
        } else {
            ProductStore::new()
        };

        Self::with_store(store, config)
    }

    /// Create application state around an existing store.
    pub fn with_store(store: ProductStore, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_seeds_by_default() {
        let state = AppState::new(Config::default());
        assert_eq!(state.store.len().await, 3);
    }

    #[tokio::test]
    async fn test_new_without_seed() {
        let config = Config {
            seed_sample_data: false,
            ..Config::default()
        };
        let state = AppState::new(config);
        assert!(state.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_store() {
        let state = AppState::new(Config::default());
        let clone = state.clone();

        clone.store.remove("1").await.unwrap();

        assert_eq!(state.store.len().await, 2);
    }
}

//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cart::{CartRegistry, MemorySlotStore, PgSlotStore, SlotStore};
use crate::catalog::{Catalog, CatalogError, HttpCatalog};
use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the cart registry and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    carts: CartRegistry,
}

impl AppState {
    /// Create application state talking to the configured lookup service.
    ///
    /// Carts are stored in `PostgreSQL` when `pool` is given and in process
    /// memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup service client cannot be built.
    pub fn new(config: StorefrontConfig, pool: Option<PgPool>) -> Result<Self, CatalogError> {
        let catalog: Arc<dyn Catalog> = Arc::new(HttpCatalog::new(&config.catalog)?);
        let slots: Arc<dyn SlotStore> = match pool {
            Some(pool) => Arc::new(PgSlotStore::new(pool)),
            None => Arc::new(MemorySlotStore::new()),
        };
        Ok(Self::with_parts(config, catalog, slots))
    }

    /// Create application state from explicit collaborators.
    #[must_use]
    pub fn with_parts(
        config: StorefrontConfig,
        catalog: Arc<dyn Catalog>,
        slots: Arc<dyn SlotStore>,
    ) -> Self {
        let carts = CartRegistry::new(catalog, slots, config.cart_idle_timeout);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                carts,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the per-shopper cart registry.
    #[must_use]
    pub fn carts(&self) -> &CartRegistry {
        &self.inner.carts
    }
}

//! Per-shopper cart stores.
//!
//! Each shopper's session carries a cart token. The registry keeps one
//! [`CartStore`] per token in memory so that all requests for the same cart
//! go through the same lock. Stores are created on first use and evicted only
//! after a period of inactivity; the cache has no size bound, so a busy
//! registry never drops or refuses the store of an active cart.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use super::{CartStore, SlotStore, StorageError, slot_key};
use crate::catalog::Catalog;

/// Cache of open cart stores keyed by cart token.
#[derive(Clone)]
pub struct CartRegistry {
    inner: Arc<CartRegistryInner>,
}

struct CartRegistryInner {
    stores: Cache<String, Arc<CartStore>>,
    catalog: Arc<dyn Catalog>,
    slots: Arc<dyn SlotStore>,
}

impl CartRegistry {
    /// Create a registry that evicts carts untouched for `idle_timeout`.
    ///
    /// `idle_timeout` must comfortably exceed the longest operation (two
    /// lookups plus a write), otherwise a store could be evicted mid-operation.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        slots: Arc<dyn SlotStore>,
        idle_timeout: Duration,
    ) -> Self {
        let stores = Cache::builder().time_to_idle(idle_timeout).build();

        Self {
            inner: Arc::new(CartRegistryInner {
                stores,
                catalog,
                slots,
            }),
        }
    }

    /// Get the store for `token`, hydrating it from storage if needed.
    ///
    /// Concurrent first requests for the same token share one hydration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage backend cannot be read.
    pub async fn open(&self, token: &str) -> Result<Arc<CartStore>, StorageError> {
        let inner = &self.inner;
        inner
            .stores
            .try_get_with(token.to_string(), async {
                debug!(token, "Hydrating cart store");
                CartStore::load(slot_key(token), inner.catalog.clone(), inner.slots.clone())
                    .await
                    .map(Arc::new)
            })
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    /// The storage backend shared by every store.
    #[must_use]
    pub fn slots(&self) -> &Arc<dyn SlotStore> {
        &self.inner.slots
    }
}

//! Cart state store.
//!
//! A [`CartStore`] owns one shopper's cart. It re-reads the storage slot at
//! the start of each mutation, validates the change against the lookup
//! service, writes the new cart back to the slot, and only then makes it
//! visible. Reads go straight to the slot and never wait on a mutation.
//!
//! # Serialization
//!
//! Every mutation holds the store's lock from the first lookup until the new
//! cart is persisted, so two overlapping requests for the same cart apply one
//! after the other instead of overwriting each other.
//!
//! # Failures
//!
//! A failed operation leaves the cart unchanged, sends exactly one message to
//! the caller's [`Notifier`], and returns the [`CartError`] so callers can
//! branch on the kind.

pub mod notify;
mod registry;
pub mod storage;

pub use notify::{Notifier, Toast, ToastBuffer, TracingNotifier};
pub use registry::CartRegistry;
pub use storage::{MemorySlotStore, PgSlotStore, SlotStore, StorageError};

use std::sync::Arc;

use cartwright_core::{Cart, CartError, CartOperation, ProductId};
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info, instrument, warn};

use crate::catalog::Catalog;

/// Storage slot key for a cart.
pub const STORAGE_KEY: &str = "cart";

/// Storage slot key for the cart identified by `token`.
#[must_use]
pub fn slot_key(token: &str) -> String {
    format!("{STORAGE_KEY}:{token}")
}

/// One shopper's cart and the collaborators needed to change it.
///
/// The storage slot is the source of truth: every mutation re-reads it under
/// the lock, so a slot cleared from outside the storefront empties the cart.
pub struct CartStore {
    key: String,
    cart: Mutex<Cart>,
    committed: watch::Sender<Cart>,
    catalog: Arc<dyn Catalog>,
    slots: Arc<dyn SlotStore>,
}

/// Decode a slot value. Absent and unreadable slots give an empty cart.
fn decode(key: &str, raw: Option<String>) -> Cart {
    let Some(raw) = raw else {
        return Cart::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(key = %key, error = %e, "Stored cart is unreadable, starting empty");
        Cart::new()
    })
}

impl CartStore {
    /// Hydrate a store from the slot at `key`.
    ///
    /// An absent slot gives an empty cart, as does a slot whose contents
    /// cannot be parsed or repeat a product or hold a zero amount.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage backend cannot be read.
    #[instrument(skip_all)]
    pub async fn load(
        key: impl Into<String>,
        catalog: Arc<dyn Catalog>,
        slots: Arc<dyn SlotStore>,
    ) -> Result<Self, StorageError> {
        let key = key.into();
        let cart = decode(&key, slots.get(&key).await?);
        let (committed, _) = watch::channel(cart.clone());

        Ok(Self {
            key,
            cart: Mutex::new(cart),
            committed,
            catalog,
            slots,
        })
    }

    /// Storage slot key this store writes to.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current cart contents, read from the slot.
    ///
    /// Does not wait for an in-flight mutation. Falls back to the last
    /// committed cart if the slot cannot be read.
    pub async fn snapshot(&self) -> Cart {
        match self.slots.get(&self.key).await {
            Ok(raw) => decode(&self.key, raw),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Cart slot unreadable, serving last committed cart");
                self.committed.borrow().clone()
            }
        }
    }

    /// Take the lock and bring the in-memory cart in line with the slot.
    async fn lock_current(&self) -> MutexGuard<'_, Cart> {
        let mut cart = self.cart.lock().await;

        match self.slots.get(&self.key).await {
            Ok(raw) => {
                let current = decode(&self.key, raw);
                if *cart != current {
                    debug!(key = %self.key, "Cart changed in storage, reloading");
                    cart.clone_from(&current);
                    self.committed.send_replace(current);
                }
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Cart slot unreadable, using last committed cart");
            }
        }

        cart
    }

    /// Add one unit of a product.
    ///
    /// Reads product details and stock. A product not yet in the cart is added
    /// with an amount of one whatever the stock; an existing one is incremented
    /// only within stock.
    ///
    /// # Errors
    ///
    /// - `StockExceeded` if the incremented amount would be above stock
    /// - `LookupFailure` if either lookup fails
    /// - `Persistence` if the new cart cannot be stored
    #[instrument(skip(self, notifier), fields(key = %self.key, product_id = %product_id))]
    pub async fn add_product(
        &self,
        product_id: ProductId,
        notifier: &dyn Notifier,
    ) -> Result<Cart, CartError> {
        let mut cart = self.lock_current().await;

        let next = match tokio::try_join!(
            self.catalog.product(product_id),
            self.catalog.stock(product_id)
        ) {
            Ok((product, stock)) => cart.add_unit(&product, &stock),
            Err(e) => Err(e.into()),
        };

        self.commit(&mut cart, next, CartOperation::AddProduct, notifier)
            .await
    }

    /// Remove a product's line item.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the product is not in the cart
    /// - `Persistence` if the new cart cannot be stored
    #[instrument(skip(self, notifier), fields(key = %self.key, product_id = %product_id))]
    pub async fn remove_product(
        &self,
        product_id: ProductId,
        notifier: &dyn Notifier,
    ) -> Result<Cart, CartError> {
        let mut cart = self.lock_current().await;
        let next = cart.remove(product_id);
        self.commit(&mut cart, next, CartOperation::RemoveProduct, notifier)
            .await
    }

    /// Set a product's amount.
    ///
    /// Reads the stock record first. A product that is not in the cart leaves
    /// the cart as it is (and still counts as success).
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount` is below one
    /// - `StockExceeded` if `amount` is above stock
    /// - `LookupFailure` if the stock lookup fails
    /// - `Persistence` if the new cart cannot be stored
    #[instrument(skip(self, notifier), fields(key = %self.key, product_id = %product_id))]
    pub async fn update_product_amount(
        &self,
        product_id: ProductId,
        amount: i64,
        notifier: &dyn Notifier,
    ) -> Result<Cart, CartError> {
        let mut cart = self.lock_current().await;

        let next = match self.catalog.stock(product_id).await {
            Ok(stock) => cart.set_amount(product_id, amount, &stock),
            Err(e) => Err(e.into()),
        };

        self.commit(
            &mut cart,
            next,
            CartOperation::UpdateProductAmount,
            notifier,
        )
        .await
    }

    /// Persist `next` and swap it in, or report why the operation failed.
    async fn commit(
        &self,
        cart: &mut Cart,
        next: Result<Cart, CartError>,
        operation: CartOperation,
        notifier: &dyn Notifier,
    ) -> Result<Cart, CartError> {
        let outcome = match next {
            Ok(next) => self.persist(&next).await.map(|()| next),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(next) => {
                info!(
                    operation = %operation,
                    lines = next.len(),
                    items = next.item_count(),
                    "Cart updated"
                );
                cart.clone_from(&next);
                self.committed.send_replace(next.clone());
                Ok(next)
            }
            Err(err) => {
                warn!(operation = %operation, kind = err.kind(), error = %err, "Cart operation rejected");
                notifier.notify(err.notification(operation));
                Err(err)
            }
        }
    }

    async fn persist(&self, cart: &Cart) -> Result<(), CartError> {
        let raw =
            serde_json::to_string(cart).map_err(|e| CartError::Persistence(e.to_string()))?;
        self.slots
            .set(&self.key, &raw)
            .await
            .map_err(|e| CartError::Persistence(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use cartwright_core::error::{
        MSG_ADD_FAILED, MSG_PERSIST_FAILED, MSG_REMOVE_FAILED, MSG_STOCK_EXCEEDED,
        MSG_UPDATE_FAILED,
    };
    use cartwright_core::{LineItem, Product};
    use rust_decimal::Decimal;

    use super::storage::testing::FlakySlotStore;
    use super::*;
    use crate::catalog::testing::FakeCatalog;

    fn id(id: i32) -> ProductId {
        ProductId::new(id)
    }

    fn line(product_id: i32, amount: u32) -> LineItem {
        LineItem {
            amount,
            ..LineItem::first_unit(&Product {
                id: id(product_id),
                title: format!("Sneaker {product_id}"),
                price: Decimal::new(1399, 1),
                image: format!("https://cdn.example.com/{product_id}.jpg"),
            })
        }
    }

    async fn seeded_store(
        catalog: FakeCatalog,
        slots: Arc<dyn SlotStore>,
        items: Vec<LineItem>,
    ) -> (CartStore, Arc<FakeCatalog>) {
        let raw = serde_json::to_string(&Cart::try_from(items).unwrap()).unwrap();
        slots.set(STORAGE_KEY, &raw).await.unwrap();
        let catalog = Arc::new(catalog);
        let store = CartStore::load(STORAGE_KEY, catalog.clone(), slots)
            .await
            .unwrap();
        (store, catalog)
    }

    #[tokio::test]
    async fn test_load_absent_slot_is_empty() {
        let store = CartStore::load(
            STORAGE_KEY,
            Arc::new(FakeCatalog::new()),
            Arc::new(MemorySlotStore::new()),
        )
        .await
        .unwrap();
        assert!(store.snapshot().await.is_empty());
        assert_eq!(store.key(), "cart");
    }

    #[tokio::test]
    async fn test_load_unreadable_slot_is_empty() {
        let slots = Arc::new(MemorySlotStore::new());
        slots.set(STORAGE_KEY, "{not json").await.unwrap();
        let store = CartStore::load(STORAGE_KEY, Arc::new(FakeCatalog::new()), slots)
            .await
            .unwrap();
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_new_product_to_empty_cart() {
        let slots: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());
        let (store, _) =
            seeded_store(FakeCatalog::new().with_product(7, 5), slots.clone(), vec![]).await;
        let toasts = ToastBuffer::new();

        let cart = store.add_product(id(7), &toasts).await.unwrap();

        assert_eq!(cart.items(), &[line(7, 1)]);
        assert!(toasts.messages().is_empty());
        let stored: Cart = serde_json::from_str(&slots.get(STORAGE_KEY).await.unwrap().unwrap())
            .unwrap();
        assert_eq!(stored, cart);
    }

    #[tokio::test]
    async fn test_add_new_product_ignores_zero_stock() {
        let (store, _) = seeded_store(
            FakeCatalog::new().with_product(4, 0),
            Arc::new(MemorySlotStore::new()),
            vec![line(1, 2)],
        )
        .await;

        let cart = store.add_product(id(4), &ToastBuffer::new()).await.unwrap();

        assert_eq!(cart.items(), &[line(1, 2), line(4, 1)]);
    }

    #[tokio::test]
    async fn test_add_existing_product_increments() {
        let (store, catalog) = seeded_store(
            FakeCatalog::new().with_product(7, 5),
            Arc::new(MemorySlotStore::new()),
            vec![line(7, 4)],
        )
        .await;

        let cart = store.add_product(id(7), &ToastBuffer::new()).await.unwrap();

        assert_eq!(cart.get(id(7)).unwrap().amount, 5);
        assert_eq!(catalog.product_calls.load(Ordering::SeqCst), 1);
        assert_eq!(catalog.stock_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_add_existing_product_at_stock_limit() {
        let slots = Arc::new(FlakySlotStore::new());
        let (store, _) = seeded_store(
            FakeCatalog::new().with_product(7, 5),
            slots.clone(),
            vec![line(7, 5)],
        )
        .await;
        let toasts = ToastBuffer::new();

        let err = store.add_product(id(7), &toasts).await.unwrap_err();

        assert_eq!(err.kind(), "stock_exceeded");
        assert_eq!(toasts.messages(), vec![MSG_STOCK_EXCEEDED]);
        assert_eq!(store.snapshot().await.items(), &[line(7, 5)]);
        // Only the seed write happened
        assert_eq!(slots.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_add_lookup_failure() {
        let catalog = FakeCatalog::new().with_product(7, 5);
        catalog.set_failing(true);
        let (store, _) = seeded_store(catalog, Arc::new(MemorySlotStore::new()), vec![]).await;
        let toasts = ToastBuffer::new();

        let err = store.add_product(id(7), &toasts).await.unwrap_err();

        assert_eq!(err.kind(), "lookup_failure");
        assert_eq!(toasts.messages(), vec![MSG_ADD_FAILED]);
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_lookup_failure() {
        let (store, _) =
            seeded_store(FakeCatalog::new(), Arc::new(MemorySlotStore::new()), vec![]).await;
        let toasts = ToastBuffer::new();

        let err = store.add_product(id(99), &toasts).await.unwrap_err();

        assert_eq!(err.kind(), "lookup_failure");
        assert_eq!(toasts.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_present_product() {
        let (store, _) = seeded_store(
            FakeCatalog::new(),
            Arc::new(MemorySlotStore::new()),
            vec![line(1, 1), line(2, 2), line(3, 3)],
        )
        .await;

        let cart = store
            .remove_product(id(2), &ToastBuffer::new())
            .await
            .unwrap();

        assert_eq!(cart.items(), &[line(1, 1), line(3, 3)]);
    }

    #[tokio::test]
    async fn test_remove_absent_product() {
        let (store, _) = seeded_store(
            FakeCatalog::new(),
            Arc::new(MemorySlotStore::new()),
            vec![line(1, 1)],
        )
        .await;
        let toasts = ToastBuffer::new();

        let err = store.remove_product(id(2), &toasts).await.unwrap_err();

        assert_eq!(err, CartError::NotFound(id(2)));
        assert_eq!(toasts.messages(), vec![MSG_REMOVE_FAILED]);
        assert_eq!(store.snapshot().await.items(), &[line(1, 1)]);
    }

    #[tokio::test]
    async fn test_update_amount_within_stock_is_idempotent() {
        let (store, _) = seeded_store(
            FakeCatalog::new().with_product(3, 10),
            Arc::new(MemorySlotStore::new()),
            vec![line(1, 1), line(3, 2)],
        )
        .await;
        let toasts = ToastBuffer::new();

        let once = store.update_product_amount(id(3), 6, &toasts).await.unwrap();
        let twice = store.update_product_amount(id(3), 6, &toasts).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(once.items(), &[line(1, 1), line(3, 6)]);
        assert!(toasts.messages().is_empty());
    }

    #[tokio::test]
    async fn test_update_amount_to_zero() {
        let (store, catalog) = seeded_store(
            FakeCatalog::new().with_product(3, 10),
            Arc::new(MemorySlotStore::new()),
            vec![line(3, 2)],
        )
        .await;
        let toasts = ToastBuffer::new();

        let err = store
            .update_product_amount(id(3), 0, &toasts)
            .await
            .unwrap_err();

        assert_eq!(err, CartError::InvalidAmount(0));
        assert_eq!(toasts.messages(), vec![MSG_UPDATE_FAILED]);
        assert_eq!(store.snapshot().await.items(), &[line(3, 2)]);
        // Stock is read before the amount is validated
        assert_eq!(catalog.stock_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_update_amount_above_stock() {
        let (store, _) = seeded_store(
            FakeCatalog::new().with_product(3, 4),
            Arc::new(MemorySlotStore::new()),
            vec![line(3, 2)],
        )
        .await;
        let toasts = ToastBuffer::new();

        let err = store
            .update_product_amount(id(3), 5, &toasts)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "stock_exceeded");
        assert_eq!(toasts.messages(), vec![MSG_STOCK_EXCEEDED]);
        assert_eq!(store.snapshot().await.items(), &[line(3, 2)]);
    }

    #[tokio::test]
    async fn test_update_amount_lookup_failure() {
        let catalog = FakeCatalog::new().with_product(3, 4);
        catalog.set_failing(true);
        let (store, _) =
            seeded_store(catalog, Arc::new(MemorySlotStore::new()), vec![line(3, 2)]).await;
        let toasts = ToastBuffer::new();

        let err = store
            .update_product_amount(id(3), 1, &toasts)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "lookup_failure");
        assert_eq!(toasts.messages(), vec![MSG_UPDATE_FAILED]);
    }

    #[tokio::test]
    async fn test_update_amount_absent_product_is_noop() {
        let (store, _) = seeded_store(
            FakeCatalog::new().with_product(8, 4),
            Arc::new(MemorySlotStore::new()),
            vec![line(3, 2)],
        )
        .await;

        let cart = store
            .update_product_amount(id(8), 2, &ToastBuffer::new())
            .await
            .unwrap();

        assert_eq!(cart.items(), &[line(3, 2)]);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_previous_cart() {
        let slots = Arc::new(FlakySlotStore::new());
        let (store, _) = seeded_store(
            FakeCatalog::new().with_product(7, 5),
            slots.clone(),
            vec![line(7, 1)],
        )
        .await;
        slots.set_failing(true);
        let toasts = ToastBuffer::new();

        let err = store.add_product(id(7), &toasts).await.unwrap_err();

        assert_eq!(err.kind(), "persistence");
        assert_eq!(toasts.messages(), vec![MSG_PERSIST_FAILED]);
        assert_eq!(store.snapshot().await.items(), &[line(7, 1)]);

        slots.set_failing(false);
        let cart = store.add_product(id(7), &toasts).await.unwrap();
        assert_eq!(cart.get(id(7)).unwrap().amount, 2);
    }

    #[tokio::test]
    async fn test_overlapping_adds_both_apply() {
        let (store, _) = seeded_store(
            FakeCatalog::new()
                .with_product(7, 5)
                .with_delay(Duration::from_millis(20)),
            Arc::new(MemorySlotStore::new()),
            vec![line(7, 1)],
        )
        .await;
        let toasts = ToastBuffer::new();

        let (first, second) = tokio::join!(
            store.add_product(id(7), &toasts),
            store.add_product(id(7), &toasts)
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(store.snapshot().await.get(id(7)).unwrap().amount, 3);
    }

    #[tokio::test]
    async fn test_rehydrate_round_trip() {
        let slots: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());
        let catalog = Arc::new(FakeCatalog::new().with_product(1, 9).with_product(2, 9));
        catalog.set_product(2, "Trail Runner", Decimal::new(24_990, 2));

        let store = CartStore::load(slot_key("abc"), catalog.clone(), slots.clone())
            .await
            .unwrap();
        let toasts = ToastBuffer::new();
        store.add_product(id(2), &toasts).await.unwrap();
        store.add_product(id(1), &toasts).await.unwrap();
        store.update_product_amount(id(2), 3, &toasts).await.unwrap();
        let before = store.snapshot().await;

        let fresh = CartStore::load(slot_key("abc"), catalog, slots).await.unwrap();
        let after = fresh.snapshot().await;

        assert_eq!(after, before);
        assert_eq!(after.items()[0].title, "Trail Runner");
        assert_eq!(after.items()[0].price, Decimal::new(24_990, 2));
        assert_eq!(after.items()[0].amount, 3);
        assert_eq!(after.items()[1].id, id(1));
    }

    #[tokio::test]
    async fn test_external_clear_discards_cart() {
        let slots: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());
        let (store, _) = seeded_store(
            FakeCatalog::new().with_product(7, 5).with_product(8, 5),
            slots.clone(),
            vec![],
        )
        .await;
        let toasts = ToastBuffer::new();
        store.add_product(id(7), &toasts).await.unwrap();

        slots.remove(STORAGE_KEY).await.unwrap();
        assert!(store.snapshot().await.is_empty());

        let cart = store.add_product(id(8), &toasts).await.unwrap();
        assert_eq!(cart.items(), &[line(8, 1)]);
        let stored: Cart = serde_json::from_str(&slots.get(STORAGE_KEY).await.unwrap().unwrap())
            .unwrap();
        assert_eq!(stored.items(), &[line(8, 1)]);
        assert!(toasts.messages().is_empty());
    }

    #[tokio::test]
    async fn test_external_write_is_picked_up() {
        let slots: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());
        let (store, _) = seeded_store(
            FakeCatalog::new().with_product(1, 9),
            slots.clone(),
            vec![line(1, 1)],
        )
        .await;

        let raw = serde_json::to_string(&Cart::try_from(vec![line(1, 4)]).unwrap()).unwrap();
        slots.set(STORAGE_KEY, &raw).await.unwrap();

        let cart = store.add_product(id(1), &ToastBuffer::new()).await.unwrap();
        assert_eq!(cart.items(), &[line(1, 5)]);
    }

    #[tokio::test]
    async fn test_invalid_stored_cart_starts_empty() {
        for items in [
            vec![line(1, 0), line(2, 1)],
            vec![line(2, 1), line(2, 4)],
        ] {
            let slots: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());
            slots
                .set(STORAGE_KEY, &serde_json::to_string(&items).unwrap())
                .await
                .unwrap();
            let store = CartStore::load(
                STORAGE_KEY,
                Arc::new(FakeCatalog::new().with_product(2, 9)),
                slots,
            )
            .await
            .unwrap();

            assert!(store.snapshot().await.is_empty());
            let cart = store.add_product(id(2), &ToastBuffer::new()).await.unwrap();
            assert_eq!(cart.items(), &[line(2, 1)]);
        }
    }

    #[tokio::test]
    async fn test_snapshot_does_not_wait_for_lookups() {
        let (store, _) = seeded_store(
            FakeCatalog::new()
                .with_product(7, 5)
                .with_delay(Duration::from_millis(500)),
            Arc::new(MemorySlotStore::new()),
            vec![line(7, 1)],
        )
        .await;
        let store = Arc::new(store);

        let writer = {
            let store = store.clone();
            tokio::spawn(async move { store.add_product(id(7), &ToastBuffer::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let during = tokio::time::timeout(Duration::from_millis(200), store.snapshot())
            .await
            .unwrap();
        assert_eq!(during.items(), &[line(7, 1)]);

        writer.await.unwrap().unwrap();
        assert_eq!(store.snapshot().await.items(), &[line(7, 2)]);
    }

    #[test]
    fn test_slot_key() {
        assert_eq!(slot_key("abc"), "cart:abc");
    }
}

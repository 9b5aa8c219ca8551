//! Stored cart inspection commands.
//!
//! # Usage
//!
//! ```bash
//! # Print the cart stored for a cart token
//! cartwright cart show 0b5f7c1e-...
//!
//! # Delete the cart stored for a cart token
//! cartwright cart clear 0b5f7c1e-...
//! ```

use cartwright_core::{Cart, CurrencyCode};
use cartwright_storefront::cart::{PgSlotStore, SlotStore, slot_key};

use super::{CommandError, connect};

/// Print the cart stored under `token`.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the cart cannot be
/// decoded.
pub async fn show(token: &str, currency: CurrencyCode) -> Result<(), CommandError> {
    let store = PgSlotStore::new(connect().await?);
    let key = slot_key(token);

    let Some(record) = store.get_record(&key).await? else {
        tracing::warn!(key = %key, "No cart stored");
        return Ok(());
    };
    let cart: Cart = serde_json::from_str(&record.value)?;

    #[allow(clippy::print_stdout)]
    {
        println!("Cart {key} (updated {})", record.updated_at);
        for item in cart.items() {
            println!(
                "  {:>6}  {:<40} {:>4} x {}",
                item.id,
                item.title,
                item.amount,
                cartwright_core::Price::new(item.price, currency)
            );
        }
        println!("Items:    {}", cart.item_count());
        println!("Subtotal: {}", cart.subtotal_price(currency));
    }
    Ok(())
}

/// Delete the cart stored under `token`.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn clear(token: &str) -> Result<(), CommandError> {
    let store = PgSlotStore::new(connect().await?);
    let key = slot_key(token);

    store.remove(&key).await?;
    tracing::info!(key = %key, "Cart cleared");
    Ok(())
}

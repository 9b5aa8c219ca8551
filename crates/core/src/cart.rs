//! Cart contents and the pure transitions that change them.
//!
//! A [`Cart`] is an ordered list of [`LineItem`]s, unique by product ID. The
//! transitions here never mutate in place: each returns the next cart or the
//! reason the change was rejected, so a caller can persist the new cart before
//! making it visible.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CartError;
use crate::types::{CurrencyCode, Price, ProductId};

/// Product details returned by the lookup service.
///
/// Extra fields sent by the service are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub image: String,
}

/// Maximum purchasable quantity of a product at lookup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: ProductId,
    pub amount: u32,
}

/// One product entry in the cart.
///
/// Display fields are copied from the [`Product`] when the item is first
/// added and are not refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub image: String,
    pub amount: u32,
}

impl LineItem {
    /// First unit of a product.
    #[must_use]
    pub fn first_unit(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            price: product.price,
            image: product.image.clone(),
            amount: 1,
        }
    }

    /// Price multiplied by amount.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.amount)
    }
}

/// A line item list that cannot form a cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCart {
    /// The same product appears on more than one line.
    #[error("product {0} appears more than once")]
    DuplicateItem(ProductId),

    /// A line has an amount of zero.
    #[error("product {0} has an amount of zero")]
    ZeroAmount(ProductId),
}

/// The shopper's cart.
///
/// Serializes as a plain JSON array of line items. Deserializing rejects
/// arrays that repeat a product or hold a zero amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LineItem>", into = "Vec<LineItem>")]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Line items in display order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Look up the line item for a product.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Whether the product has a line item.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Number of distinct line items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all line items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.amount)).sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Subtotal as a display price.
    #[must_use]
    pub fn subtotal_price(&self, currency_code: CurrencyCode) -> Price {
        Price::new(self.subtotal(), currency_code)
    }

    /// Add one unit of `product`.
    ///
    /// A product not yet in the cart is appended with an amount of one without
    /// consulting `stock`. A product already present is incremented only while
    /// the new amount stays within `stock`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::StockExceeded`] if incrementing would go above the
    /// stock record.
    pub fn add_unit(&self, product: &Product, stock: &StockRecord) -> Result<Self, CartError> {
        let Some(existing) = self.get(product.id) else {
            let mut items = self.items.clone();
            items.push(LineItem::first_unit(product));
            return Ok(Self { items });
        };

        let candidate = u64::from(existing.amount) + 1;
        if candidate > u64::from(stock.amount) {
            return Err(CartError::StockExceeded {
                product_id: product.id,
                requested: candidate,
                available: stock.amount,
            });
        }

        Ok(self.map_item(product.id, |item| LineItem {
            amount: item.amount + 1,
            ..item.clone()
        }))
    }

    /// Remove the line item for `id`, keeping the order of the rest.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if the product is not in the cart.
    pub fn remove(&self, id: ProductId) -> Result<Self, CartError> {
        if !self.contains(id) {
            return Err(CartError::NotFound(id));
        }

        Ok(Self {
            items: self
                .items
                .iter()
                .filter(|item| item.id != id)
                .cloned()
                .collect(),
        })
    }

    /// Set the amount for `id`.
    ///
    /// A product that is not in the cart leaves the cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidAmount`] if `amount` is below one and
    /// [`CartError::StockExceeded`] if it is above the stock record.
    pub fn set_amount(
        &self,
        id: ProductId,
        amount: i64,
        stock: &StockRecord,
    ) -> Result<Self, CartError> {
        if amount < 1 {
            return Err(CartError::InvalidAmount(amount));
        }

        let requested = amount.unsigned_abs();
        let amount = match u32::try_from(amount) {
            Ok(amount) if amount <= stock.amount => amount,
            _ => {
                return Err(CartError::StockExceeded {
                    product_id: id,
                    requested,
                    available: stock.amount,
                });
            }
        };

        Ok(self.map_item(id, |item| LineItem {
            amount,
            ..item.clone()
        }))
    }

    fn map_item(&self, id: ProductId, f: impl Fn(&LineItem) -> LineItem) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|item| if item.id == id { f(item) } else { item.clone() })
                .collect(),
        }
    }
}

impl TryFrom<Vec<LineItem>> for Cart {
    type Error = InvalidCart;

    fn try_from(items: Vec<LineItem>) -> Result<Self, Self::Error> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.amount == 0 {
                return Err(InvalidCart::ZeroAmount(item.id));
            }
            if !seen.insert(item.id) {
                return Err(InvalidCart::DuplicateItem(item.id));
            }
        }
        Ok(Self { items })
    }
}

impl From<Cart> for Vec<LineItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

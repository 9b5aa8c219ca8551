//! Cart error taxonomy.
//!
//! Every cart operation fails with exactly one [`CartError`]. The error carries
//! enough detail for logs and for callers that want to branch on the kind;
//! [`CartError::notification`] maps it to the fixed message shown to the
//! shopper for the operation that failed.

use thiserror::Error;

use crate::types::ProductId;

/// Shown when a requested quantity is above the stock record.
pub const MSG_STOCK_EXCEEDED: &str = "Requested quantity exceeds stock";
/// Shown when adding a product fails for any other reason.
pub const MSG_ADD_FAILED: &str = "Error adding product";
/// Shown when removing a product fails.
pub const MSG_REMOVE_FAILED: &str = "Error removing product";
/// Shown when changing a quantity fails for any reason other than stock.
pub const MSG_UPDATE_FAILED: &str = "Error changing product quantity";
/// Shown when the cart could not be written to storage.
pub const MSG_PERSIST_FAILED: &str = "Error saving cart";

/// The cart operation an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartOperation {
    AddProduct,
    RemoveProduct,
    UpdateProductAmount,
}

impl CartOperation {
    /// Generic failure message for this operation.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::AddProduct => MSG_ADD_FAILED,
            Self::RemoveProduct => MSG_REMOVE_FAILED,
            Self::UpdateProductAmount => MSG_UPDATE_FAILED,
        }
    }
}

impl std::fmt::Display for CartOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddProduct => write!(f, "add_product"),
            Self::RemoveProduct => write!(f, "remove_product"),
            Self::UpdateProductAmount => write!(f, "update_product_amount"),
        }
    }
}

/// Errors produced by cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The product is not in the cart.
    #[error("product {0} is not in the cart")]
    NotFound(ProductId),

    /// The requested quantity is above the stock record.
    #[error("requested {requested} of product {product_id}, only {available} in stock")]
    StockExceeded {
        product_id: ProductId,
        requested: u64,
        available: u32,
    },

    /// The requested quantity is below one.
    #[error("invalid quantity {0}, must be at least 1")]
    InvalidAmount(i64),

    /// The product or stock lookup failed.
    #[error("lookup failed: {0}")]
    LookupFailure(String),

    /// The cart could not be written to storage.
    #[error("failed to persist cart: {0}")]
    Persistence(String),
}

impl CartError {
    /// Stable snake_case tag for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::StockExceeded { .. } => "stock_exceeded",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::LookupFailure(_) => "lookup_failure",
            Self::Persistence(_) => "persistence",
        }
    }

    /// User-facing message for this error raised by `operation`.
    #[must_use]
    pub const fn notification(&self, operation: CartOperation) -> &'static str {
        match self {
            Self::StockExceeded { .. } => MSG_STOCK_EXCEEDED,
            Self::Persistence(_) => MSG_PERSIST_FAILED,
            Self::NotFound(_) | Self::InvalidAmount(_) | Self::LookupFailure(_) => {
                operation.failure_message()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_depends_on_operation() {
        let err = CartError::LookupFailure("connection refused".to_string());
        assert_eq!(err.notification(CartOperation::AddProduct), MSG_ADD_FAILED);
        assert_eq!(
            err.notification(CartOperation::UpdateProductAmount),
            MSG_UPDATE_FAILED
        );
    }

    #[test]
    fn test_stock_exceeded_message_is_shared() {
        let err = CartError::StockExceeded {
            product_id: ProductId::new(7),
            requested: 6,
            available: 5,
        };
        assert_eq!(err.notification(CartOperation::AddProduct), MSG_STOCK_EXCEEDED);
        assert_eq!(
            err.notification(CartOperation::UpdateProductAmount),
            MSG_STOCK_EXCEEDED
        );
        assert_eq!(err.kind(), "stock_exceeded");
        assert_eq!(
            err.to_string(),
            "requested 6 of product 7, only 5 in stock"
        );
    }

    #[test]
    fn test_remove_not_found_message() {
        let err = CartError::NotFound(ProductId::new(1));
        assert_eq!(err.notification(CartOperation::RemoveProduct), MSG_REMOVE_FAILED);
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(CartOperation::UpdateProductAmount.to_string(), "update_product_amount");
    }
}

//! Product and stock lookup service.
//!
//! # Architecture
//!
//! - The lookup service is the source of truth for product details and stock;
//!   nothing here writes to it
//! - [`Catalog`] is the seam the cart store depends on, so tests can swap in
//!   an in-memory catalog
//! - [`HttpCatalog`] talks to the service over HTTP with `reqwest` and caches
//!   product details (never stock) via `moka`
//!
//! # Endpoints
//!
//! ```text
//! GET {base}/products/{id}  -> { id, title, price, image, ... }
//! GET {base}/stock/{id}     -> { id, amount }
//! ```

mod client;

pub use client::HttpCatalog;

use async_trait::async_trait;
use cartwright_core::{CartError, Product, ProductId, StockRecord};
use thiserror::Error;

/// Errors that can occur when talking to the lookup service.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("lookup service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service has no record for the product.
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<CatalogError> for CartError {
    fn from(err: CatalogError) -> Self {
        Self::LookupFailure(err.to_string())
    }
}

/// Read-only product and stock lookups.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Current product details.
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError>;

    /// Current stock record.
    async fn stock(&self, id: ProductId) -> Result<StockRecord, CatalogError>;
}

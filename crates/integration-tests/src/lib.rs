//! Integration test harness for Cartwright.
//!
//! Each [`TestContext`] starts two servers on ephemeral ports: a stub
//! product/stock lookup service and the storefront itself, wired to the stub
//! with in-memory cart and session storage.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartwright-integration-tests
//! ```

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use cartwright_core::CurrencyCode;
use cartwright_storefront::config::{CatalogConfig, StorefrontConfig};
use cartwright_storefront::routes;
use cartwright_storefront::state::AppState;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_sessions::MemoryStore;

/// Stub product/stock lookup service.
#[derive(Clone, Default)]
pub struct StubLookup {
    products: Arc<Mutex<HashMap<i32, Value>>>,
    stock: Arc<Mutex<HashMap<i32, u32>>>,
    product_hits: Arc<AtomicUsize>,
    stock_hits: Arc<AtomicUsize>,
}

impl StubLookup {
    /// Register a product with its price and stock.
    pub fn add_product(&self, id: i32, title: &str, price: f64, stock: u32) {
        self.products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                json!({
                    "id": id,
                    "title": title,
                    "price": price,
                    "image": format!("{id}.jpg"),
                }),
            );
        self.set_stock(id, stock);
    }

    /// Change the stock of a product.
    pub fn set_stock(&self, id: i32, amount: u32) {
        self.stock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, amount);
    }

    /// Number of product detail requests served.
    #[must_use]
    pub fn product_hits(&self) -> usize {
        self.product_hits.load(Ordering::SeqCst)
    }

    /// Number of stock requests served.
    #[must_use]
    pub fn stock_hits(&self) -> usize {
        self.stock_hits.load(Ordering::SeqCst)
    }

    fn router(self) -> Router {
        Router::new()
            .route("/products/{id}", get(stub_product))
            .route("/stock/{id}", get(stub_stock))
            .with_state(self)
    }
}

async fn stub_product(
    State(stub): State<StubLookup>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, StatusCode> {
    stub.product_hits.fetch_add(1, Ordering::SeqCst);
    stub.products
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn stub_stock(
    State(stub): State<StubLookup>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, StatusCode> {
    stub.stock_hits.fetch_add(1, Ordering::SeqCst);
    stub.stock
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .map(|amount| Json(json!({ "id": id, "amount": amount })))
        .ok_or(StatusCode::NOT_FOUND)
}

/// Serve `app` on an ephemeral local port.
async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });
    addr
}

/// Running storefront plus stub lookup service.
pub struct TestContext {
    pub lookup: StubLookup,
    pub base_url: String,
}

impl TestContext {
    /// Start a storefront backed by a fresh stub lookup service.
    pub async fn start(lookup: StubLookup) -> Self {
        let lookup_addr = serve(lookup.clone().router()).await;

        let config = StorefrontConfig {
            host: [127, 0, 0, 1].into(),
            port: 0,
            base_url: "http://localhost".to_string(),
            database_url: None,
            currency: CurrencyCode::USD,
            cart_idle_timeout: Duration::from_secs(300),
            catalog: CatalogConfig::for_base_url(&format!("http://{lookup_addr}"))
                .expect("Invalid lookup URL"),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let state = AppState::new(config, None).expect("Failed to build app state");
        let addr = serve(routes::app(state, MemoryStore::default())).await;

        Self {
            lookup,
            base_url: format!("http://{addr}"),
        }
    }

    /// A new shopper: an HTTP client with its own cookie jar.
    #[must_use]
    pub fn shopper(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Toast messages carried in a response's `HX-Trigger` header.
#[must_use]
pub fn toast_messages(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get("hx-trigger")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| serde_json::from_str::<Value>(value).ok())
        .and_then(|value| value.get("toast")?.get("messages").cloned())
        .and_then(|messages| serde_json::from_value(messages).ok())
        .unwrap_or_default()
}

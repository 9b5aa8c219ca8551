//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness check
//! GET    /health/ready                - Readiness check (cart storage)
//!
//! # Cart (JSON)
//! GET    /api/cart                    - Cart contents, subtotal, item count
//! GET    /api/cart/count              - Item count badge
//! POST   /api/cart/items              - Add one unit   {"product_id": 7}
//! PATCH  /api/cart/items/{product_id} - Set quantity   {"amount": 3}
//! DELETE /api/cart/items/{product_id} - Remove product
//! ```

pub mod cart;
pub mod health;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::from_fn,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(cart::show))
        .route("/api/cart/count", get(cart::count))
        .route("/api/cart/items", post(cart::add))
        .route(
            "/api/cart/items/{product_id}",
            patch(cart::update).delete(cart::remove),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(cart_routes())
}

/// Build the full application with sessions kept in `session_store`.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    routes()
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::{StatusCode, header};
    use cartwright_core::CurrencyCode;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::cart::MemorySlotStore;
    use crate::catalog::testing::FakeCatalog;
    use crate::config::{CatalogConfig, StorefrontConfig};

    fn test_app() -> Router {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost".to_string(),
            database_url: None,
            currency: CurrencyCode::USD,
            cart_idle_timeout: Duration::from_secs(60),
            catalog: CatalogConfig::for_base_url("http://localhost:9").unwrap(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let state = AppState::with_parts(
            config,
            Arc::new(FakeCatalog::new().with_product(7, 5)),
            Arc::new(MemorySlotStore::new()),
        );
        app(state, MemoryStore::default())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_readiness_with_memory_storage() {
        let response = test_app()
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_cart_without_session() {
        let response = test_app()
            .oneshot(Request::get("/api/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["item_count"], 0);
        assert_eq!(body["subtotal_display"], "$0.00");
    }

    #[tokio::test]
    async fn test_add_product_sets_session_cookie() {
        let response = test_app()
            .oneshot(
                Request::post("/api/cart/items")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"product_id": 7}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::SET_COOKIE));
        assert_eq!(response.headers()["hx-trigger"], "cart-updated");
        let body = body_json(response).await;
        assert_eq!(body["items"][0]["id"], 7);
        assert_eq!(body["items"][0]["amount"], 1);
    }

    #[tokio::test]
    async fn test_remove_from_new_session_is_not_found() {
        let response = test_app()
            .oneshot(
                Request::delete("/api/cart/items/7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("hx-trigger"));
        let body = body_json(response).await;
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "Error removing product");
    }

    #[tokio::test]
    async fn test_malformed_product_id_is_rejected() {
        let response = test_app()
            .oneshot(
                Request::delete("/api/cart/items/shoe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

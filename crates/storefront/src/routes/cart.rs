//! Cart route handlers.
//!
//! The cart token is stored in the session and names the shopper's cart in
//! the registry. Successful mutations respond with the updated cart and an
//! `HX-Trigger: cart-updated` header; rejected ones respond with the error
//! body and a toast event in `HX-Trigger`.

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderValue,
    response::{AppendHeaders, IntoResponse, Response},
};
use cartwright_core::{Cart, CartError, CartOperation, CurrencyCode, LineItem, Price, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::cart::{Toast, ToastBuffer};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{cart_token, ensure_cart_token};
use crate::state::AppState;

/// Header carrying client-side events.
pub const HX_TRIGGER: &str = "HX-Trigger";

/// Line item display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemView {
    pub id: ProductId,
    pub title: String,
    pub image: String,
    pub amount: u32,
    pub price: Decimal,
    pub line_total: Decimal,
    pub price_display: String,
    pub line_total_display: String,
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: Decimal,
    pub subtotal_display: String,
    pub item_count: u64,
}

impl CartView {
    /// Build the view of `cart` with prices in `currency`.
    #[must_use]
    pub fn new(cart: &Cart, currency: CurrencyCode) -> Self {
        Self {
            items: cart
                .items()
                .iter()
                .map(|item| CartItemView::new(item, currency))
                .collect(),
            subtotal: cart.subtotal(),
            subtotal_display: cart.subtotal_price(currency).display(),
            item_count: cart.item_count(),
        }
    }
}

impl CartItemView {
    fn new(item: &LineItem, currency: CurrencyCode) -> Self {
        let line_total = item.line_total();
        Self {
            id: item.id,
            title: item.title.clone(),
            image: item.image.clone(),
            amount: item.amount,
            price: item.price,
            line_total,
            price_display: Price::new(item.price, currency).display(),
            line_total_display: Price::new(line_total, currency).display(),
        }
    }
}

/// Cart count badge data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCount {
    pub count: u64,
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateAmountRequest {
    pub amount: i64,
}

/// Current cart for this session, without issuing a token.
async fn current_cart(state: &AppState, session: &Session) -> Result<Cart> {
    match cart_token(session).await? {
        Some(token) => Ok(state.carts().open(&token).await?.snapshot().await),
        None => Ok(Cart::new()),
    }
}

/// Turn an operation result into a response.
fn mutation_response(
    result: std::result::Result<Cart, CartError>,
    operation: CartOperation,
    toasts: ToastBuffer,
    currency: CurrencyCode,
) -> Response {
    match result {
        Ok(cart) => (
            AppendHeaders([(HX_TRIGGER, "cart-updated")]),
            Json(CartView::new(&cart, currency)),
        )
            .into_response(),
        Err(err) => {
            let mut response = AppError::cart(err, operation).into_response();
            if let Some(value) = toasts.into_toast().and_then(|toast| toast_header(&toast)) {
                response.headers_mut().insert(HX_TRIGGER, value);
            }
            response
        }
    }
}

/// `HX-Trigger` value raising a `toast` event.
fn toast_header(toast: &Toast) -> Option<HeaderValue> {
    let payload = serde_json::json!({ "toast": toast });
    HeaderValue::from_str(&payload.to_string()).ok()
}

/// Display the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = current_cart(&state, &session).await?;
    Ok(Json(CartView::new(&cart, state.config().currency)))
}

/// Cart count badge.
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> Result<Json<CartCount>> {
    let cart = current_cart(&state, &session).await?;
    Ok(Json(CartCount {
        count: cart.item_count(),
    }))
}

/// Add one unit of a product.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AddItemRequest>,
) -> Result<Response> {
    let token = ensure_cart_token(&session).await?;
    let store = state.carts().open(&token).await?;
    let product_id = body.product_id.to_string();
    add_breadcrumb("cart", "Add product", Some(&[("product_id", product_id.as_str())]));

    let toasts = ToastBuffer::new();
    let result = store.add_product(body.product_id, &toasts).await;
    Ok(mutation_response(
        result,
        CartOperation::AddProduct,
        toasts,
        state.config().currency,
    ))
}

/// Set a product's quantity.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
    Json(body): Json<UpdateAmountRequest>,
) -> Result<Response> {
    let token = ensure_cart_token(&session).await?;
    let store = state.carts().open(&token).await?;

    let toasts = ToastBuffer::new();
    let result = store
        .update_product_amount(product_id, body.amount, &toasts)
        .await;
    Ok(mutation_response(
        result,
        CartOperation::UpdateProductAmount,
        toasts,
        state.config().currency,
    ))
}

/// Remove a product from the cart.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Response> {
    let token = ensure_cart_token(&session).await?;
    let store = state.carts().open(&token).await?;

    let toasts = ToastBuffer::new();
    let result = store.remove_product(product_id, &toasts).await;
    Ok(mutation_response(
        result,
        CartOperation::RemoveProduct,
        toasts,
        state.config().currency,
    ))
}

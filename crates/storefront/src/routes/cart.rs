//! Cart route handlers.
//!
//! All mutations go through the single-writer cart lock in [`AppState`], so
//! no two cart operations ever interleave. Stock-aware blocking happens here,
//! before the engine is touched: the engine itself never validates stock.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use urban_shoes_core::{CurrencyCode, Money, ProductId};

use crate::cart::{Cart, CartLine};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Cart item display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image: Option<String>,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
    pub error: Option<String>,
}

/// Cart count badge data.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CartCountView {
    pub item_count: u32,
}

/// Format an amount as a display price in the store currency.
fn format_price(amount: Decimal, currency: CurrencyCode) -> String {
    Money::new(amount, currency).display()
}

fn item_view(line: &CartLine, currency: CurrencyCode) -> CartItemView {
    CartItemView {
        product_id: line.product_id.clone(),
        name: line.name.clone(),
        quantity: line.quantity,
        price: format_price(line.unit_price, currency),
        line_price: format_price(line.line_total(), currency),
        image: line.image.clone(),
    }
}

fn cart_view(cart: &Cart, currency: CurrencyCode) -> CartView {
    CartView {
        items: cart.lines().iter().map(|line| item_view(line, currency)).collect(),
        subtotal: format_price(cart.subtotal(), currency),
        item_count: cart.item_count(),
        error: cart.last_error().map(ToOwned::to_owned),
    }
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Update cart request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: String,
    pub quantity: u32,
}

/// Remove from cart request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: String,
}

/// Display the cart.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Json<CartView> {
    let cart = state.cart().lock().await;
    Json(cart_view(cart.cart(), state.config().currency))
}

/// Add an item to the cart.
///
/// Rejects unknown products and products that are out of stock; the quantity
/// defaults to one.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartCountView>> {
    let product_id = ProductId::new(request.product_id);
    let snapshot = state.catalog_snapshot();
    let product = snapshot
        .find(&product_id)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    if !product.in_stock() {
        return Err(AppError::BadRequest("Out of stock".to_string()));
    }

    let quantity = request.quantity.unwrap_or(1);
    let mut cart = state.cart().lock().await;
    cart.add(product, quantity).await;

    Ok(Json(CartCountView {
        item_count: cart.cart().item_count(),
    }))
}

/// Set an item's quantity. Zero removes the line.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Json(request): Json<UpdateCartRequest>,
) -> Json<CartView> {
    let product_id = ProductId::new(request.product_id);
    let mut cart = state.cart().lock().await;
    cart.set_quantity(&product_id, request.quantity).await;
    Json(cart_view(cart.cart(), state.config().currency))
}

/// Remove an item from the cart.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Json(request): Json<RemoveFromCartRequest>,
) -> Json<CartView> {
    let product_id = ProductId::new(request.product_id);
    let mut cart = state.cart().lock().await;
    cart.remove(&product_id).await;
    Json(cart_view(cart.cart(), state.config().currency))
}

/// Empty the cart.
#[instrument(skip(state))]
pub async fn clear(State(state): State<AppState>) -> Json<CartView> {
    let mut cart = state.cart().lock().await;
    cart.clear().await;
    Json(cart_view(cart.cart(), state.config().currency))
}

/// Cart count badge.
#[instrument(skip(state))]
pub async fn count(State(state): State<AppState>) -> Json<CartCountView> {
    let cart = state.cart().lock().await;
    Json(CartCountView {
        item_count: cart.cart().item_count(),
    })
}

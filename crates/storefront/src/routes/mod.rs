//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (verifies database)
//!
//! # Shop
//! GET  /shop                   - Filtered/sorted/paginated catalog listing
//! GET  /products/{id}          - Product detail
//!
//! # Cart
//! GET  /cart                   - Cart contents
//! POST /cart/add               - Add to cart (returns count)
//! POST /cart/update            - Set line quantity (zero removes)
//! POST /cart/remove            - Remove line
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Cart count badge
//!
//! # Checkout (rate limited)
//! GET  /checkout               - Session state + priced totals
//! POST /checkout/submit        - Validate shipping, create gateway order
//! POST /checkout/confirm       - Payment widget success callback
//! POST /checkout/reset         - Start a fresh session
//! ```

pub mod cart;
pub mod checkout;
pub mod shop;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/shop", get(shop::index))
        .route("/products/{id}", get(shop::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::summary))
        .route("/submit", post(checkout::submit))
        .route("/confirm", post(checkout::confirm))
        .route("/reset", post(checkout::reset))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Shop routes
        .merge(shop_routes())
        // Cart routes
        .nest("/cart", cart_routes().layer(api_rate_limiter()))
        // Checkout routes keep gateway traffic bounded
        .nest("/checkout", checkout_routes().layer(checkout_rate_limiter()))
}

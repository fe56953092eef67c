//! Checkout route handlers.
//!
//! `submit` prices the current cart, registers an order with the payment
//! gateway and returns everything the client-side payment widget needs. The
//! widget's success callback posts back to `confirm`. Both go through the
//! single checkout orchestrator lock, so only one submission can ever be in
//! flight.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::checkout::{CheckoutState, CheckoutTotals, PaymentConfirmation, ShippingInfo};
use crate::error::{AppError, Result};
use crate::payment::OrderHandle;
use crate::state::AppState;

/// Checkout form body.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub name: String,
    pub email: String,
    pub address: String,
}

/// Everything the payment widget needs to open.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub order: OrderHandle,
    /// Gateway key id for the widget.
    pub key_id: String,
    pub state: CheckoutState,
}

/// Current checkout session state plus priced totals.
#[derive(Debug, Serialize)]
pub struct CheckoutSummaryResponse {
    pub state: CheckoutState,
    pub totals: CheckoutTotals,
}

/// Checkout state after a transition.
#[derive(Debug, Serialize)]
pub struct CheckoutStateResponse {
    pub state: CheckoutState,
}

/// Summary: session state and totals for the current cart.
#[instrument(skip(state))]
pub async fn summary(State(state): State<AppState>) -> Json<CheckoutSummaryResponse> {
    let subtotal = state.cart().lock().await.cart().subtotal();
    let checkout = state.checkout().lock().await;
    Json(CheckoutSummaryResponse {
        state: checkout.state(),
        totals: CheckoutTotals::from_subtotal(subtotal),
    })
}

/// Submit the checkout form and register a gateway order.
#[instrument(skip(state, request))]
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>> {
    let shipping = ShippingInfo {
        name: request.name,
        email: request.email,
        address: request.address,
    };

    // The order-creation contract requires a positive amount.
    let subtotal = state.cart().lock().await.cart().subtotal();
    if subtotal <= rust_decimal::Decimal::ZERO {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }

    let mut checkout = state.checkout().lock().await;
    let order = checkout.submit(&shipping, subtotal).await?;

    Ok(Json(SubmitResponse {
        order,
        key_id: state.gateway().key_id().to_owned(),
        state: checkout.state(),
    }))
}

/// Record the payment widget's success callback.
#[instrument(skip(state, confirmation))]
pub async fn confirm(
    State(state): State<AppState>,
    Json(confirmation): Json<PaymentConfirmation>,
) -> Result<Json<CheckoutStateResponse>> {
    let mut checkout = state.checkout().lock().await;
    checkout.confirm(confirmation)?;
    Ok(Json(CheckoutStateResponse {
        state: checkout.state(),
    }))
}

/// Start a fresh checkout session.
#[instrument(skip(state))]
pub async fn reset(State(state): State<AppState>) -> Result<Json<CheckoutStateResponse>> {
    let mut checkout = state.checkout().lock().await;
    if !checkout.reset() {
        return Err(AppError::Checkout(
            crate::checkout::CheckoutError::NotCollecting,
        ));
    }
    Ok(Json(CheckoutStateResponse {
        state: checkout.state(),
    }))
}

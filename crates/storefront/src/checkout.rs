//! Checkout orchestration.
//!
//! One checkout session is a small state machine:
//!
//! ```text
//! Collecting ──► Submitting ──► Succeeded
//!      ▲             │
//!      └─────────────┘  (order creation failed)
//! ```
//!
//! `Collecting` gathers shipping info. `submit` validates it, prices the
//! order and registers it with the payment gateway; a gateway failure drops
//! the session back to `Collecting` with a generic error. The external
//! payment widget's success callback drives `confirm`, which lands in
//! `Succeeded`. There is no formal failed state: every failure path returns
//! an error and leaves the machine where recovery is possible. Submitting is
//! never re-entered while an order is in flight.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use urban_shoes_core::{CurrencyCode, GatewayOrderId, Money};

use crate::payment::{OrderGateway, OrderHandle, PaymentError};

/// Orders above this subtotal ship free.
const FREE_SHIPPING_THRESHOLD: i64 = 2000;

/// Flat shipping fee below the free-shipping threshold.
const SHIPPING_FLAT: i64 = 99;

/// Tax rate applied to the subtotal.
const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// The state of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    /// Gathering shipping details.
    #[default]
    Collecting,
    /// Order registered with the gateway, awaiting the widget callback.
    Submitting,
    /// Payment confirmed (terminal state).
    Succeeded,
}

impl CheckoutState {
    /// Returns true if a new submission may start in this state.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        matches!(self, Self::Collecting)
    }

    /// Returns true if a payment confirmation is expected in this state.
    #[must_use]
    pub fn can_confirm(&self) -> bool {
        matches!(self, Self::Submitting)
    }

    /// Returns true if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// The state name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Collecting => "collecting",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shipping details collected from the checkout form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub name: String,
    pub email: String,
    pub address: String,
}

impl ShippingInfo {
    /// Require all fields to be non-empty.
    ///
    /// Email format beyond non-emptiness is not enforced here; the browser's
    /// native validation already gates the form.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.address.trim().is_empty() {
            missing.push("address");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::Validation { missing })
        }
    }
}

/// Priced order summary derived from the cart subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl CheckoutTotals {
    /// Price an order: flat shipping (waived above the threshold) plus tax.
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let shipping = if subtotal > Decimal::from(FREE_SHIPPING_THRESHOLD) {
            Decimal::ZERO
        } else {
            Decimal::from(SHIPPING_FLAT)
        };
        let tax = subtotal * TAX_RATE;
        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }
}

/// Opaque confirmation payload from the payment widget.
///
/// Treated as proof of payment only; it is recorded, not verified locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub payment_id: String,
    pub order_id: GatewayOrderId,
    pub signature: String,
}

/// Errors from the checkout flow.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Required shipping fields are missing.
    #[error("missing required fields: {}", missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    /// A submission is already in flight or the session already succeeded.
    #[error("checkout already in progress")]
    NotCollecting,

    /// A confirmation arrived with no submission in flight.
    #[error("no payment in flight")]
    NotSubmitting,

    /// The gateway refused to create the order.
    #[error("payment initiation failed: {0}")]
    PaymentInitiation(#[source] PaymentError),
}

/// Orchestrates one checkout session against a payment gateway.
#[derive(Debug)]
pub struct CheckoutOrchestrator<G: OrderGateway> {
    gateway: G,
    currency: CurrencyCode,
    state: CheckoutState,
    order: Option<OrderHandle>,
    confirmation: Option<PaymentConfirmation>,
}

impl<G: OrderGateway> CheckoutOrchestrator<G> {
    /// Create an orchestrator in `Collecting`.
    #[must_use]
    pub const fn new(gateway: G, currency: CurrencyCode) -> Self {
        Self {
            gateway,
            currency,
            state: CheckoutState::Collecting,
            order: None,
            confirmation: None,
        }
    }

    /// Current state of the session.
    #[must_use]
    pub const fn state(&self) -> CheckoutState {
        self.state
    }

    /// The in-flight or completed order, if any.
    #[must_use]
    pub const fn order(&self) -> Option<&OrderHandle> {
        self.order.as_ref()
    }

    /// The recorded payment confirmation, once succeeded.
    #[must_use]
    pub const fn confirmation(&self) -> Option<&PaymentConfirmation> {
        self.confirmation.as_ref()
    }

    /// Submit the checkout form: validate, price, register the order.
    ///
    /// On success the session is in `Submitting` and the returned handle is
    /// passed to the payment widget. Validation failures and gateway failures
    /// leave (or put) the session in `Collecting`.
    ///
    /// # Errors
    ///
    /// `Validation` for missing fields, `NotCollecting` when a submission is
    /// already in flight, `PaymentInitiation` when the gateway refuses.
    #[instrument(skip(self, shipping), fields(state = %self.state))]
    pub async fn submit(
        &mut self,
        shipping: &ShippingInfo,
        subtotal: Decimal,
    ) -> Result<OrderHandle, CheckoutError> {
        if !self.state.can_submit() {
            return Err(CheckoutError::NotCollecting);
        }

        shipping.validate()?;

        let totals = CheckoutTotals::from_subtotal(subtotal);
        self.state = CheckoutState::Submitting;

        match self
            .gateway
            .create_order(Money::new(totals.total, self.currency))
            .await
        {
            Ok(handle) => {
                self.order = Some(handle.clone());
                Ok(handle)
            }
            Err(e) => {
                self.state = CheckoutState::Collecting;
                Err(CheckoutError::PaymentInitiation(e))
            }
        }
    }

    /// Record the payment widget's success callback.
    ///
    /// # Errors
    ///
    /// `NotSubmitting` when no submission is in flight.
    pub fn confirm(&mut self, confirmation: PaymentConfirmation) -> Result<(), CheckoutError> {
        if !self.state.can_confirm() {
            return Err(CheckoutError::NotSubmitting);
        }
        self.confirmation = Some(confirmation);
        self.state = CheckoutState::Succeeded;
        Ok(())
    }

    /// Start a fresh session.
    ///
    /// Refused (returns `false`) while a submission is in flight.
    pub fn reset(&mut self) -> bool {
        if self.state.can_confirm() {
            return false;
        }
        self.state = CheckoutState::Collecting;
        self.order = None;
        self.confirmation = None;
        true
    }
}

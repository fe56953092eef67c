//! Payment gateway client.
//!
//! Order creation happens server-side against the gateway's REST API; the
//! buyer then completes payment in the gateway's own widget, which calls back
//! with an opaque confirmation. Amounts go over the wire in integer minor
//! units (major units times 100, rounded).
//!
//! Gateway failures must never leak request details to the buyer: the raw
//! response is logged, the caller gets a generic message.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use urban_shoes_core::{GatewayOrderId, Money};

use crate::config::GatewayConfig;

/// Message surfaced to buyers when order creation fails.
pub const ORDER_CREATE_ERROR: &str = "Failed to create order";

/// Errors from the payment gateway.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway rejected the order request.
    #[error("{ORDER_CREATE_ERROR}")]
    OrderCreation,

    /// The gateway responded with a body we cannot parse.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// An order registered with the gateway, to be handed to the payment widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHandle {
    /// Gateway's order id.
    pub id: GatewayOrderId,
    /// Amount in minor units, as registered with the gateway.
    pub amount: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Seam for order creation, so checkout can be tested without the network.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Register an order for `amount` and return its handle.
    async fn create_order(&self, amount: Money) -> Result<OrderHandle, PaymentError>;
}

// =============================================================================
// GatewayClient
// =============================================================================

/// Client for the payment gateway's order API.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<GatewayClientInner>,
}

struct GatewayClientInner {
    client: reqwest::Client,
    endpoint: String,
    key_id: String,
    key_secret: String,
}

impl GatewayClient {
    /// Create a new gateway client.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &GatewayConfig) -> Self {
        Self {
            inner: Arc::new(GatewayClientInner {
                client,
                endpoint: format!("{}/orders", config.api_url.trim_end_matches('/')),
                key_id: config.key_id.clone(),
                key_secret: config.key_secret.expose_secret().to_owned(),
            }),
        }
    }

    /// The public key id, needed by the client-side widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.inner.key_id
    }
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

/// Generate a receipt id for the gateway's records.
fn receipt_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("receipt_{suffix}")
}

#[async_trait]
impl OrderGateway for GatewayClient {
    #[instrument(skip(self), fields(amount = %amount.amount))]
    async fn create_order(&self, amount: Money) -> Result<OrderHandle, PaymentError> {
        let request = OrderRequest {
            amount: amount.minor_units(),
            currency: amount.currency_code.code(),
            receipt: receipt_id(),
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .basic_auth(&self.inner.key_id, Some(&self.inner.key_secret))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "gateway rejected order creation"
            );
            return Err(PaymentError::OrderCreation);
        }

        let order: OrderResponse = serde_json::from_str(&body)?;
        Ok(OrderHandle {
            id: GatewayOrderId::new(order.id),
            amount: order.amount,
            currency: order.currency,
        })
    }
}

// =============================================================================
// StubGateway
// =============================================================================

/// In-memory gateway for tests.
///
/// Succeeds with a deterministic handle unless told to fail.
#[derive(Debug, Clone, Default)]
pub struct StubGateway {
    state: Arc<std::sync::Mutex<StubState>>,
}

#[derive(Debug, Default)]
struct StubState {
    fail_next: bool,
    orders_created: u32,
}

impl StubGateway {
    /// Create a stub that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_order` call fail.
    pub fn set_fail_next(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = fail;
        }
    }

    /// Number of orders created so far.
    #[must_use]
    pub fn orders_created(&self) -> u32 {
        self.state.lock().map(|state| state.orders_created).unwrap_or(0)
    }
}

#[async_trait]
impl OrderGateway for StubGateway {
    async fn create_order(&self, amount: Money) -> Result<OrderHandle, PaymentError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| PaymentError::OrderCreation)?;
        if state.fail_next {
            state.fail_next = false;
            return Err(PaymentError::OrderCreation);
        }
        state.orders_created += 1;
        Ok(OrderHandle {
            id: GatewayOrderId::new(format!("order_test_{}", state.orders_created)),
            amount: amount.minor_units(),
            currency: amount.currency_code.code().to_owned(),
        })
    }
}

//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::cart::PersistentCart;
use crate::catalog::{CatalogSnapshot, CatalogSubscription};
use crate::checkout::CheckoutOrchestrator;
use crate::config::StorefrontConfig;
use crate::payment::GatewayClient;
use crate::storage::PgKvStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to shared
/// resources: configuration, the database pool, the live catalog
/// subscription, and the cart and checkout state machines.
///
/// The cart and the checkout orchestrator sit behind mutexes: every mutation
/// goes through a single writer, so optimistic undos can never interleave
/// with a concurrent mutation mid-flight.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: CatalogSubscription,
    gateway: GatewayClient,
    cart: Mutex<PersistentCart<PgKvStore>>,
    checkout: Mutex<CheckoutOrchestrator<GatewayClient>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The catalog subscription is owned here: it stays alive for the
    /// server's lifetime and tears its listener down when the state drops.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        pool: PgPool,
        catalog: CatalogSubscription,
        cart: PersistentCart<PgKvStore>,
    ) -> Self {
        let http = reqwest::Client::new();
        let gateway = GatewayClient::new(http, &config.gateway);
        let checkout = CheckoutOrchestrator::new(gateway.clone(), config.currency);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                gateway,
                cart: Mutex::new(cart),
                checkout: Mutex::new(checkout),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The latest catalog snapshot.
    #[must_use]
    pub fn catalog_snapshot(&self) -> CatalogSnapshot {
        self.inner.catalog.snapshot()
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn gateway(&self) -> &GatewayClient {
        &self.inner.gateway
    }

    /// The cart, behind its single-writer lock.
    #[must_use]
    pub fn cart(&self) -> &Mutex<PersistentCart<PgKvStore>> {
        &self.inner.cart
    }

    /// The checkout orchestrator, behind its single-writer lock.
    #[must_use]
    pub fn checkout(&self) -> &Mutex<CheckoutOrchestrator<GatewayClient>> {
        &self.inner.checkout
    }
}

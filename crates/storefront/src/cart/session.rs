//! Persistence-aware cart wrapper.
//!
//! [`PersistentCart`] owns a [`Cart`] and flushes its lines to the key-value
//! store after every mutation, mirroring how the cart survives page reloads.
//! Only the lines are persisted; `last_error` is in-memory state.
//!
//! Persistence failures do not fail the mutation: the in-memory cart is the
//! source of truth for the session, the failure is recorded in `last_error`
//! and logged. The user keeps a working cart that simply will not survive a
//! restart until a later flush succeeds.

use tracing::warn;

use urban_shoes_core::{ProductId, ProductRecord};

use crate::storage::KvStore;

use super::{Cart, CartLine, CartUndo};

/// Namespace key under which cart lines are stored.
pub const CART_STORAGE_KEY: &str = "cart-storage";

/// Message surfaced through `Cart::last_error` when a flush fails.
const CART_SAVE_ERROR: &str = "Failed to save cart.";

/// A cart bound to a persistent store.
#[derive(Debug)]
pub struct PersistentCart<S: KvStore> {
    cart: Cart,
    store: S,
}

impl<S: KvStore> PersistentCart<S> {
    /// Load the persisted cart from the store.
    ///
    /// An absent key is an empty cart. A read failure or corrupt payload also
    /// yields an empty cart: recovery is user-initiated, and a cart that
    /// cannot be read must not block the storefront.
    pub async fn hydrate(store: S) -> Self {
        let cart = match store.get(CART_STORAGE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<CartLine>>(&raw) {
                Ok(lines) => Cart::from_lines(lines),
                Err(e) => {
                    warn!("discarding corrupt persisted cart: {e}");
                    Cart::new()
                }
            },
            Ok(None) => Cart::new(),
            Err(e) => {
                warn!("failed to read persisted cart: {e}");
                Cart::new()
            }
        };

        Self { cart, store }
    }

    /// The underlying cart state.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Add `quantity` units of a product and persist.
    pub async fn add(&mut self, product: &ProductRecord, quantity: u32) -> CartUndo {
        let undo = self.cart.add(product, quantity);
        self.flush().await;
        undo
    }

    /// Remove a product's line and persist.
    pub async fn remove(&mut self, product_id: &ProductId) -> CartUndo {
        let undo = self.cart.remove(product_id);
        self.flush().await;
        undo
    }

    /// Set a line's quantity (zero removes) and persist.
    pub async fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> CartUndo {
        let undo = self.cart.set_quantity(product_id, quantity);
        self.flush().await;
        undo
    }

    /// Empty the cart and persist.
    pub async fn clear(&mut self) -> CartUndo {
        let undo = self.cart.clear();
        self.flush().await;
        undo
    }

    /// Apply an undo and persist the restored lines.
    pub async fn restore(&mut self, undo: CartUndo) {
        self.cart.restore(undo);
        self.flush().await;
    }

    /// Write the current lines to the store.
    ///
    /// Failures are swallowed: recorded in `last_error` and logged at WARN.
    async fn flush(&mut self) {
        let payload = match serde_json::to_string(self.cart.lines()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("failed to serialize cart lines: {e}");
                self.cart.set_last_error(CART_SAVE_ERROR);
                return;
            }
        };

        if let Err(e) = self.store.put(CART_STORAGE_KEY, &payload).await {
            warn!("failed to persist cart: {e}");
            self.cart.set_last_error(CART_SAVE_ERROR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;
    use rust_decimal::Decimal;

    fn product(id: &str, price: i64) -> ProductRecord {
        ProductRecord {
            id: ProductId::new(id),
            name: format!("Shoe {id}"),
            price: Decimal::from(price),
            stock: 10,
            category: "Running".to_string(),
            description: String::new(),
            image: None,
            original_price: None,
        }
    }

    #[tokio::test]
    async fn test_hydrate_missing_key_yields_empty_cart() {
        let session = PersistentCart::hydrate(MemoryKvStore::new()).await;
        assert!(session.cart().is_empty());
        assert!(session.cart().last_error().is_none());
    }

    #[tokio::test]
    async fn test_mutations_persist_lines() {
        let store = MemoryKvStore::new();
        let mut session = PersistentCart::hydrate(store.clone()).await;

        session.add(&product("a", 100), 2).await;

        let raw = store
            .get(CART_STORAGE_KEY)
            .await
            .expect("read")
            .expect("cart persisted");
        let lines: Vec<CartLine> = serde_json::from_str(&raw).expect("valid lines");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_persist_then_hydrate_round_trip() {
        let store = MemoryKvStore::new();

        let mut session = PersistentCart::hydrate(store.clone()).await;
        session.add(&product("a", 100), 1).await;
        session.add(&product("b", 250), 3).await;
        let lines = session.cart().lines().to_vec();
        drop(session);

        let rehydrated = PersistentCart::hydrate(store).await;
        assert_eq!(rehydrated.cart().lines(), lines.as_slice());
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed_and_surfaced() {
        let store = MemoryKvStore::new();
        store.set_fail_writes(true).await;
        let mut session = PersistentCart::hydrate(store.clone()).await;

        session.add(&product("a", 100), 1).await;

        // Mutation applied in memory despite the failed flush.
        assert_eq!(session.cart().item_count(), 1);
        assert_eq!(session.cart().last_error(), Some("Failed to save cart."));
        assert!(store.is_empty().await);

        // A later successful mutation clears the error and persists.
        store.set_fail_writes(false).await;
        session.add(&product("a", 100), 1).await;
        assert!(session.cart().last_error().is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_hydrate_discards_corrupt_payload() {
        let store = MemoryKvStore::new();
        store
            .put(CART_STORAGE_KEY, "not json")
            .await
            .expect("write");

        let session = PersistentCart::hydrate(store).await;
        assert!(session.cart().is_empty());
    }

    #[tokio::test]
    async fn test_restore_persists_restored_lines() {
        let store = MemoryKvStore::new();
        let mut session = PersistentCart::hydrate(store.clone()).await;

        session.add(&product("a", 100), 1).await;
        let undo = session.add(&product("b", 250), 1).await;
        session.restore(undo).await;

        let raw = store
            .get(CART_STORAGE_KEY)
            .await
            .expect("read")
            .expect("cart persisted");
        let lines: Vec<CartLine> = serde_json::from_str(&raw).expect("valid lines");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, ProductId::new("a"));
    }
}

//! Shopping cart engine.
//!
//! The cart is an optimistic-update state machine: every mutation applies
//! immediately and returns a [`CartUndo`] capturing the pre-mutation lines by
//! value. A caller that later learns the downstream effect failed (payment,
//! stock) applies the undo to restore exactly that snapshot. Undos are plain
//! data, not closures, so a stored undo stays valid regardless of mutations
//! that happened in between - applying it is a last-write-wins restore.
//!
//! Mutations never touch stock: stock-aware blocking happens at the route
//! layer before the engine is called.

mod session;

pub use session::{CART_STORAGE_KEY, PersistentCart};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use urban_shoes_core::{ProductId, ProductRecord};

/// A single product entry in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product this line refers to. Unique within the cart.
    pub product_id: ProductId,
    /// Display name, denormalized from the catalog at add time.
    pub name: String,
    /// Unit price at add time.
    pub unit_price: Decimal,
    /// Primary image URL, if the product has one.
    pub image: Option<String>,
    /// Units of this product in the cart. Always at least 1.
    pub quantity: u32,
    /// When the line was first added.
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Line total: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Value-type inverse command returned by every cart mutation.
///
/// Holds the full pre-mutation line set by value. [`Cart::restore`] replaces
/// the current lines with it, whatever has happened since.
#[derive(Debug, Clone, PartialEq)]
pub struct CartUndo {
    lines: Vec<CartLine>,
}

impl CartUndo {
    /// The lines this undo would restore.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }
}

/// The cart state machine.
///
/// Lines keep insertion order. `last_error` carries the most recent
/// user-facing failure (e.g., a persistence write that did not stick) and is
/// cleared by every successful mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: Vec<CartLine>,
    last_error: Option<String>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cart from previously persisted lines.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self {
            lines,
            last_error: None,
        }
    }

    /// The current lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The most recent failure message, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Record a failure message for the UI to surface.
    pub fn set_last_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Add `quantity` units of a product.
    ///
    /// An existing line for the same product has its quantity increased;
    /// otherwise a new line is appended. A `quantity` of zero leaves the cart
    /// unchanged (the undo is still valid).
    pub fn add(&mut self, product: &ProductRecord, quantity: u32) -> CartUndo {
        let undo = self.snapshot();
        self.last_error = None;

        if quantity == 0 {
            return undo;
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            self.lines.push(CartLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                image: product.image.clone(),
                quantity,
                added_at: Utc::now(),
            });
        }

        undo
    }

    /// Remove the line for a product.
    ///
    /// Removing an absent product is a no-op that still returns a valid undo.
    pub fn remove(&mut self, product_id: &ProductId) -> CartUndo {
        let undo = self.snapshot();
        self.last_error = None;
        self.lines.retain(|line| &line.product_id != product_id);
        undo
    }

    /// Set the quantity of a product's line to exactly `quantity`.
    ///
    /// A quantity of zero removes the line. An unknown product is a no-op.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> CartUndo {
        if quantity == 0 {
            return self.remove(product_id);
        }

        let undo = self.snapshot();
        self.last_error = None;
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| &line.product_id == product_id)
        {
            line.quantity = quantity;
        }
        undo
    }

    /// Empty the cart.
    pub fn clear(&mut self) -> CartUndo {
        let undo = self.snapshot();
        self.last_error = None;
        self.lines.clear();
        undo
    }

    /// Restore the lines captured by an undo.
    ///
    /// This is a last-write-wins restore: it replaces whatever the cart holds
    /// now, including changes made after the undo was obtained.
    pub fn restore(&mut self, undo: CartUndo) {
        self.lines = undo.lines;
    }

    /// Sum of unit price times quantity over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn snapshot(&self) -> CartUndo {
        CartUndo {
            lines: self.lines.clone(),
        }
    }
}

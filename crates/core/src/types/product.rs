//! Catalog product record.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;

/// A product as published by the realtime catalog feed.
///
/// Records are read-only to the storefront: the feed is the source of truth
/// and pushes a fresh snapshot on every change. Fields the feed omits
/// (`image`, `original_price`) deserialize to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Feed key for this product.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current price in the store currency's standard unit.
    pub price: Decimal,
    /// Units in stock. Zero means sold out.
    #[serde(default)]
    pub stock: u32,
    /// Category label (e.g., "Running", "Sneakers").
    #[serde(default)]
    pub category: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Primary image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Pre-discount price, when the product is on sale.
    #[serde(default)]
    pub original_price: Option<Decimal>,
}

impl ProductRecord {
    /// Whether the product can currently be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether stock is low enough to warrant a warning badge.
    #[must_use]
    pub const fn low_stock(&self) -> bool {
        self.stock > 0 && self.stock <= 5
    }

    /// Whether the product is on sale (original price above current price).
    #[must_use]
    pub fn on_sale(&self) -> bool {
        self.original_price.is_some_and(|original| original > self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stock: u32) -> ProductRecord {
        ProductRecord {
            id: ProductId::new("shoe-1"),
            name: "Runner".to_string(),
            price: Decimal::from(120),
            stock,
            category: "Running".to_string(),
            description: String::new(),
            image: None,
            original_price: None,
        }
    }

    #[test]
    fn test_stock_predicates() {
        assert!(!record(0).in_stock());
        assert!(!record(0).low_stock());
        assert!(record(3).in_stock());
        assert!(record(3).low_stock());
        assert!(record(20).in_stock());
        assert!(!record(20).low_stock());
    }

    #[test]
    fn test_on_sale_requires_higher_original_price() {
        let mut product = record(1);
        assert!(!product.on_sale());

        product.original_price = Some(Decimal::from(100));
        assert!(!product.on_sale());

        product.original_price = Some(Decimal::from(150));
        assert!(product.on_sale());
    }

    #[test]
    fn test_deserializes_sparse_feed_record() {
        // The feed may omit everything except name and price.
        let json = r#"{"id": "shoe-9", "name": "Court Classic", "price": "89.99"}"#;
        let product: ProductRecord = serde_json::from_str(json).expect("valid record");
        assert_eq!(product.id, ProductId::new("shoe-9"));
        assert_eq!(product.stock, 0);
        assert!(product.category.is_empty());
        assert!(product.image.is_none());
    }
}

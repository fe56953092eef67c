//! End-to-end flows over the cart engine and catalog view pipeline.

use rust_decimal::Decimal;

use urban_shoes_core::{ProductId, ProductRecord};
use urban_shoes_storefront::cart::{CART_STORAGE_KEY, PersistentCart};
use urban_shoes_storefront::catalog::view::{self, PriceBucket, SortKey, ViewFilterState};
use urban_shoes_storefront::storage::{KvStore, MemoryKvStore};

fn catalog() -> Vec<ProductRecord> {
    let mut products = Vec::new();
    for (key, name, price, stock, category) in [
        ("shoe-01", "Aurora Runner", 95, 12, "Running"),
        ("shoe-02", "Boulder Trail", 120, 3, "Trail"),
        ("shoe-03", "Cinder Court", 150, 0, "Court"),
        ("shoe-04", "Dune Drift", 180, 7, "Casual"),
        ("shoe-05", "Ember Sprint", 210, 9, "Running"),
        ("shoe-06", "Flint Walker", 250, 2, "Casual"),
    ] {
        products.push(ProductRecord {
            id: ProductId::new(key),
            name: name.to_string(),
            price: Decimal::from(price),
            stock,
            category: category.to_string(),
            description: String::new(),
            image: None,
            original_price: None,
        });
    }
    products
}

#[test]
fn browse_pipeline_feeds_the_cart() {
    let products = catalog();

    // Shopper narrows down to affordable running shoes.
    let mut filter = ViewFilterState::new();
    filter.set_category("Running");
    filter.set_price(PriceBucket::Under100);

    let page = view::visible_page(&products, &filter);
    assert_eq!(page.filtered_count, 1);
    assert_eq!(page.items[0].name, "Aurora Runner");

    // The pick lands in a cart and the aggregates line up.
    let mut cart = urban_shoes_storefront::cart::Cart::new();
    cart.add(&page.items[0], 2);
    assert_eq!(cart.subtotal(), Decimal::from(190));
    assert_eq!(cart.item_count(), 2);
}

#[test]
fn sorting_and_category_derivation_match_the_snapshot() {
    let products = catalog();

    assert_eq!(
        view::categories(&products),
        vec!["All", "Running", "Trail", "Court", "Casual"]
    );

    let mut filter = ViewFilterState::new();
    filter.set_sort(SortKey::PriceDesc);
    let page = view::visible_page(&products, &filter);
    assert_eq!(page.items[0].name, "Flint Walker");
    assert_eq!(page.items[5].name, "Aurora Runner");
}

#[tokio::test]
async fn cart_survives_a_restart_through_the_store() {
    let store = MemoryKvStore::new();
    let products = catalog();

    {
        let mut session = PersistentCart::hydrate(store.clone()).await;
        session.add(&products[0], 1).await;
        session.add(&products[3], 2).await;
        session.set_quantity(&products[0].id, 4).await;
    }

    // New session over the same store: same lines, same order.
    let session = PersistentCart::hydrate(store.clone()).await;
    let lines = session.cart().lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].product_id, products[0].id);
    assert_eq!(lines[0].quantity, 4);
    assert_eq!(lines[1].quantity, 2);
    assert_eq!(
        session.cart().subtotal(),
        Decimal::from(4 * 95 + 2 * 180)
    );

    // Only the lines are persisted, under the fixed namespace key.
    let raw = store
        .get(CART_STORAGE_KEY)
        .await
        .expect("store readable")
        .expect("cart persisted");
    assert!(raw.starts_with('['));
}

#[tokio::test]
async fn clearing_the_cart_persists_the_empty_state() {
    let store = MemoryKvStore::new();
    let products = catalog();

    let mut session = PersistentCart::hydrate(store.clone()).await;
    session.add(&products[0], 1).await;
    session.clear().await;
    drop(session);

    let session = PersistentCart::hydrate(store).await;
    assert!(session.cart().is_empty());
}

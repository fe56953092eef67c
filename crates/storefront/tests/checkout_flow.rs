//! Checkout flow integration: cart, orchestrator and gateway working together.

use rust_decimal::Decimal;

use urban_shoes_core::{CurrencyCode, ProductId, ProductRecord};
use urban_shoes_storefront::cart::PersistentCart;
use urban_shoes_storefront::checkout::{
    CheckoutOrchestrator, CheckoutState, PaymentConfirmation, ShippingInfo,
};
use urban_shoes_storefront::payment::StubGateway;
use urban_shoes_storefront::storage::MemoryKvStore;

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

fn shipping() -> ShippingInfo {
    ShippingInfo {
        name: "Asha Rao".to_string(),
        email: "asha@example.com".to_string(),
        address: "12 MG Road, Bengaluru".to_string(),
    }
}

#[tokio::test]
async fn full_checkout_from_cart_to_succeeded() {
    let mut session = PersistentCart::hydrate(MemoryKvStore::new()).await;
    session.add(&product("a", 900), 2).await;
    let subtotal = session.cart().subtotal();
    assert_eq!(subtotal, Decimal::from(1800));

    let gateway = StubGateway::new();
    let mut checkout = CheckoutOrchestrator::new(gateway.clone(), CurrencyCode::INR);

    let order = checkout
        .submit(&shipping(), subtotal)
        .await
        .expect("order created");

    // 1800 + 99 shipping + 144 tax = 2043, in paise on the wire.
    assert_eq!(order.amount, 204_300);
    assert_eq!(order.currency, "INR");
    assert_eq!(checkout.state(), CheckoutState::Submitting);

    checkout
        .confirm(PaymentConfirmation {
            payment_id: "pay_9".to_string(),
            order_id: order.id.clone(),
            signature: "sig".to_string(),
        })
        .expect("confirmed");

    assert_eq!(checkout.state(), CheckoutState::Succeeded);
    assert_eq!(checkout.order(), Some(&order));
    assert_eq!(gateway.orders_created(), 1);
}

#[tokio::test]
async fn free_shipping_kicks_in_above_the_threshold() {
    let mut session = PersistentCart::hydrate(MemoryKvStore::new()).await;
    session.add(&product("a", 2100), 1).await;

    let mut checkout = CheckoutOrchestrator::new(StubGateway::new(), CurrencyCode::INR);
    let order = checkout
        .submit(&shipping(), session.cart().subtotal())
        .await
        .expect("order created");

    // 2100 + 0 shipping + 168 tax = 2268.
    assert_eq!(order.amount, 226_800);
}

#[tokio::test]
async fn failed_payment_rolls_the_optimistic_cart_clear_back() {
    let store = MemoryKvStore::new();
    let mut session = PersistentCart::hydrate(store).await;
    session.add(&product("a", 500), 1).await;
    let subtotal = session.cart().subtotal();

    // Optimistically clear the cart for the expected success, keeping the
    // inverse command around.
    let undo = session.clear().await;
    assert!(session.cart().is_empty());

    let gateway = StubGateway::new();
    gateway.set_fail_next(true);
    let mut checkout = CheckoutOrchestrator::new(gateway, CurrencyCode::INR);

    let result = checkout.submit(&shipping(), subtotal).await;
    assert!(result.is_err());
    assert_eq!(checkout.state(), CheckoutState::Collecting);

    // Downstream failed: apply the inverse command.
    session.restore(undo).await;
    assert_eq!(session.cart().item_count(), 1);
    assert_eq!(session.cart().subtotal(), subtotal);
}

#[tokio::test]
async fn incomplete_form_never_reaches_the_gateway() {
    let gateway = StubGateway::new();
    let mut checkout = CheckoutOrchestrator::new(gateway.clone(), CurrencyCode::INR);

    let incomplete = ShippingInfo {
        address: String::new(),
        ..shipping()
    };
    let result = checkout.submit(&incomplete, Decimal::from(100)).await;

    assert!(result.is_err());
    assert_eq!(checkout.state(), CheckoutState::Collecting);
    assert_eq!(gateway.orders_created(), 0);
}

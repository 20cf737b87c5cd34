//! Cross-module flow: browsing selections through cart and checkout drafts.

use common::{Money, ProductId, UserId};
use domain::cart::{Cart, DELIVERY_FEE, ProductSnapshot};
use domain::checkout::{CheckoutDraft, CheckoutError, DeliveryDetails};
use domain::order::{OrderStatus, check_transition};

fn snapshot(name: &str, rupees: i64, farmer_id: UserId) -> ProductSnapshot {
    ProductSnapshot {
        product_id: ProductId::new(),
        name: name.to_string(),
        price: Money::from_rupees(rupees),
        unit: "kg".to_string(),
        image_url: None,
        farmer_id: Some(farmer_id),
    }
}

fn delivery() -> DeliveryDetails {
    DeliveryDetails {
        address: "4 Canal Street".to_string(),
        city: "Kochi".to_string(),
        postal_code: "682001".to_string(),
        notes: Some("Ring twice".to_string()),
    }
}

#[test]
fn cart_to_draft_preserves_totals_and_sellers() {
    let farmer_a = UserId::new();
    let farmer_b = UserId::new();
    let consumer = UserId::new();

    let mut cart = Cart::new();
    cart.add_item(snapshot("Tomatoes", 50, farmer_a), 2).unwrap();
    cart.add_item(snapshot("Paneer", 30, farmer_b), 1).unwrap();
    assert_eq!(cart.subtotal(), Money::from_rupees(130));
    assert_eq!(cart.total(), Money::from_rupees(180));

    let draft = CheckoutDraft::build(consumer, &cart, &delivery()).unwrap();

    // One order, one item per cart entry, each tagged with its own seller.
    assert_eq!(draft.items.len(), 2);
    assert_eq!(draft.order.total_amount, Money::from_rupees(180));
    let sellers: Vec<_> = draft.items.iter().map(|i| i.farmer_id).collect();
    assert!(sellers.contains(&farmer_a));
    assert!(sellers.contains(&farmer_b));

    let items_total: Money = draft.items.iter().map(|i| i.subtotal).sum();
    assert_eq!(draft.order.total_amount - DELIVERY_FEE, items_total);

    // Checkout succeeded: the cart is cleared by the caller.
    cart.clear();
    assert!(cart.is_empty());
    assert!(matches!(
        CheckoutDraft::build(consumer, &cart, &delivery()),
        Err(CheckoutError::EmptyCart)
    ));
}

#[test]
fn order_walks_the_full_fulfilment_sequence() {
    let mut status = OrderStatus::Pending;
    for next in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ] {
        check_transition(status, next).unwrap();
        status = next;
    }
    assert!(status.is_terminal());
    assert!(check_transition(status, OrderStatus::Cancelled).is_err());
}

#[test]
fn order_can_exit_to_cancelled_mid_sequence() {
    let mut status = OrderStatus::Pending;
    check_transition(status, OrderStatus::Confirmed).unwrap();
    status = OrderStatus::Confirmed;
    check_transition(status, OrderStatus::Preparing).unwrap();
    status = OrderStatus::Preparing;

    check_transition(status, OrderStatus::Cancelled).unwrap();
    status = OrderStatus::Cancelled;
    assert!(status.is_terminal());
    assert!(check_transition(status, OrderStatus::Confirmed).is_err());
}

//! End-to-end service flows over the in-memory store: sign-up through
//! checkout, fulfilment, support, and ratings.

use std::sync::Arc;

use common::{Money, ProductId};
use domain::{
    Cart, DELIVERY_FEE, DeliveryDetails, OrderStatus, Priority, ProductDetails, Role,
    TicketStatus,
};
use services::{
    CatalogService, FarmDetails, IdentityError, InMemorySessions, OrderService, RatingError,
    RatingService, ServiceError, Session, SessionProvider, SignUpRequest, SupportService,
};
use store::{InMemoryStore, MarketStore};

struct TestEnv {
    store: Arc<InMemoryStore>,
    sessions: InMemorySessions<InMemoryStore>,
    catalog: CatalogService<InMemoryStore>,
    orders: OrderService<InMemoryStore>,
    support: SupportService<InMemoryStore>,
    ratings: RatingService<InMemoryStore>,
}

fn env() -> TestEnv {
    let store = Arc::new(InMemoryStore::new());
    TestEnv {
        sessions: InMemorySessions::new(store.clone()),
        catalog: CatalogService::new(store.clone()),
        orders: OrderService::new(store.clone()),
        support: SupportService::new(store.clone()),
        ratings: RatingService::new(store.clone()),
        store,
    }
}

async fn sign_up_farmer(env: &TestEnv, email: &str, farm_name: &str) -> Session {
    env.sessions
        .sign_up(SignUpRequest {
            email: email.to_string(),
            password: "good-password-1".to_string(),
            full_name: "Kiran Patil".to_string(),
            phone: None,
            role: Role::Farmer,
            farm: Some(FarmDetails {
                farm_name: farm_name.to_string(),
                farm_address: "NH-48, Karjat".to_string(),
                farm_description: None,
                farm_size: None,
                organic_certified: true,
            }),
            delivery: None,
        })
        .await
        .unwrap()
}

async fn sign_up_consumer(env: &TestEnv, email: &str) -> Session {
    env.sessions
        .sign_up(SignUpRequest {
            email: email.to_string(),
            password: "good-password-1".to_string(),
            full_name: "Asha Rao".to_string(),
            phone: None,
            role: Role::Consumer,
            farm: None,
            delivery: None,
        })
        .await
        .unwrap()
}

async fn sign_up_admin(env: &TestEnv, email: &str) -> Session {
    env.sessions
        .sign_up(SignUpRequest {
            email: email.to_string(),
            password: "good-password-1".to_string(),
            full_name: "Platform Staff".to_string(),
            phone: None,
            role: Role::Admin,
            farm: None,
            delivery: None,
        })
        .await
        .unwrap()
}

fn listing(name: &str, rupees: i64, stock: u32) -> ProductDetails {
    ProductDetails {
        name: name.to_string(),
        description: Some(format!("Fresh {name} from the farm")),
        price: Money::from_rupees(rupees),
        unit: "kg".to_string(),
        category: "vegetable".to_string(),
        quantity_available: stock,
        organic: false,
        is_active: true,
        image_url: None,
        freshness_date: None,
    }
}

fn delivery() -> DeliveryDetails {
    DeliveryDetails {
        address: "12 Lakeview Road".to_string(),
        city: "Pune".to_string(),
        postal_code: "411001".to_string(),
        notes: None,
    }
}

async fn add_to_cart(env: &TestEnv, cart: &mut Cart, product_id: ProductId, qty: u32) {
    let snapshot = env.catalog.snapshot_for_cart(product_id).await.unwrap();
    cart.add_item(snapshot, qty).unwrap();
}

#[tokio::test]
async fn checkout_across_two_farmers_creates_one_order_with_tagged_items() {
    let env = env();
    let farmer_a = sign_up_farmer(&env, "kiran@example.com", "Green Acres").await;
    let farmer_b = sign_up_farmer(&env, "lata@example.com", "Sunrise Farm").await;
    let consumer = sign_up_consumer(&env, "asha@example.com").await;

    let tomatoes = env
        .catalog
        .create_product(&farmer_a, listing("Tomatoes", 50, 20))
        .await
        .unwrap();
    let paneer = env
        .catalog
        .create_product(&farmer_b, listing("Paneer", 30, 10))
        .await
        .unwrap();

    let mut cart = Cart::new();
    add_to_cart(&env, &mut cart, tomatoes.id, 2).await;
    add_to_cart(&env, &mut cart, paneer.id, 1).await;
    assert_eq!(cart.subtotal(), Money::from_rupees(130));

    let placed = env
        .orders
        .checkout(&consumer, &mut cart, &delivery())
        .await
        .unwrap();

    // One order, two items, each tagged with its own seller.
    assert_eq!(placed.order.total_amount, Money::from_rupees(180));
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.items.len(), 2);
    let sellers: Vec<_> = placed.items.iter().map(|i| i.farmer_id).collect();
    assert!(sellers.contains(&farmer_a.user_id));
    assert!(sellers.contains(&farmer_b.user_id));

    let items_total: Money = placed.items.iter().map(|i| i.subtotal).sum();
    assert_eq!(items_total + DELIVERY_FEE, placed.order.total_amount);

    // Cart cleared on success; stock decremented at checkout.
    assert!(cart.is_empty());
    let stored = env.store.get_product(tomatoes.id).await.unwrap().unwrap();
    assert_eq!(stored.details.quantity_available, 18);

    // Each farmer sees only their own line.
    let incoming_a = env.orders.incoming_orders(&farmer_a).await.unwrap();
    assert_eq!(incoming_a.len(), 1);
    assert_eq!(incoming_a[0].product_name, "Tomatoes");
    let incoming_b = env.orders.incoming_orders(&farmer_b).await.unwrap();
    assert_eq!(incoming_b.len(), 1);
    assert_eq!(incoming_b[0].item.subtotal, Money::from_rupees(30));
}

#[tokio::test]
async fn empty_cart_cannot_be_checked_out() {
    let env = env();
    let consumer = sign_up_consumer(&env, "asha@example.com").await;

    let mut cart = Cart::new();
    let result = env.orders.checkout(&consumer, &mut cart, &delivery()).await;
    assert!(matches!(
        result,
        Err(ServiceError::Checkout(domain::CheckoutError::EmptyCart))
    ));
    assert!(env.orders.my_orders(&consumer).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_seller_fails_checkout_with_no_partial_writes() {
    let env = env();
    let farmer = sign_up_farmer(&env, "kiran@example.com", "Green Acres").await;
    let consumer = sign_up_consumer(&env, "asha@example.com").await;

    let tomatoes = env
        .catalog
        .create_product(&farmer, listing("Tomatoes", 50, 20))
        .await
        .unwrap();

    let mut cart = Cart::new();
    add_to_cart(&env, &mut cart, tomatoes.id, 2).await;
    // A stale snapshot without seller information.
    let mut orphan = env.catalog.snapshot_for_cart(tomatoes.id).await.unwrap();
    orphan.product_id = ProductId::new();
    orphan.farmer_id = None;
    cart.add_item(orphan, 1).unwrap();

    let result = env.orders.checkout(&consumer, &mut cart, &delivery()).await;
    assert!(matches!(
        result,
        Err(ServiceError::Checkout(
            domain::CheckoutError::MissingSeller { .. }
        ))
    ));

    // Zero order rows, cart untouched, stock untouched.
    assert!(env.orders.my_orders(&consumer).await.unwrap().is_empty());
    assert_eq!(cart.len(), 2);
    let stored = env.store.get_product(tomatoes.id).await.unwrap().unwrap();
    assert_eq!(stored.details.quantity_available, 20);
}

#[tokio::test]
async fn farmer_advances_and_consumer_sees_it_on_next_read() {
    let env = env();
    let farmer = sign_up_farmer(&env, "kiran@example.com", "Green Acres").await;
    let consumer = sign_up_consumer(&env, "asha@example.com").await;

    let tomatoes = env
        .catalog
        .create_product(&farmer, listing("Tomatoes", 50, 20))
        .await
        .unwrap();
    let mut cart = Cart::new();
    add_to_cart(&env, &mut cart, tomatoes.id, 1).await;
    let placed = env
        .orders
        .checkout(&consumer, &mut cart, &delivery())
        .await
        .unwrap();

    env.orders
        .advance(&farmer, placed.order.id, OrderStatus::Confirmed)
        .await
        .unwrap();

    let mine = env.orders.my_orders(&consumer).await.unwrap();
    assert_eq!(mine[0].order.status, OrderStatus::Confirmed);

    let stats = env.orders.consumer_stats(&consumer).await.unwrap();
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.active_orders, 1);
}

#[tokio::test]
async fn transitions_enforce_adjacency_actors_and_terminality() {
    let env = env();
    let farmer = sign_up_farmer(&env, "kiran@example.com", "Green Acres").await;
    let stranger = sign_up_farmer(&env, "lata@example.com", "Sunrise Farm").await;
    let consumer = sign_up_consumer(&env, "asha@example.com").await;
    let admin = sign_up_admin(&env, "staff@example.com").await;

    let tomatoes = env
        .catalog
        .create_product(&farmer, listing("Tomatoes", 50, 20))
        .await
        .unwrap();
    let mut cart = Cart::new();
    add_to_cart(&env, &mut cart, tomatoes.id, 1).await;
    let placed = env
        .orders
        .checkout(&consumer, &mut cart, &delivery())
        .await
        .unwrap();
    let order_id = placed.order.id;

    // Skipping states is rejected even for the fulfilling farmer.
    let skip = env
        .orders
        .advance(&farmer, order_id, OrderStatus::Delivered)
        .await;
    assert!(matches!(
        skip,
        Err(ServiceError::Order(
            domain::OrderError::InvalidTransition { .. }
        ))
    ));

    // A farmer with no items in the order may not touch it.
    let foreign = env
        .orders
        .advance(&stranger, order_id, OrderStatus::Confirmed)
        .await;
    assert!(matches!(foreign, Err(ServiceError::Forbidden { .. })));

    // Consumers cannot confirm their own orders, but they can cancel.
    let confirm = env
        .orders
        .advance(&consumer, order_id, OrderStatus::Confirmed)
        .await;
    assert!(matches!(confirm, Err(ServiceError::Forbidden { .. })));

    // Admin override may skip, and is the only path that may.
    let denied = env
        .orders
        .override_status(&farmer, order_id, OrderStatus::Delivered)
        .await;
    assert!(matches!(denied, Err(ServiceError::Forbidden { .. })));
    let overridden = env
        .orders
        .override_status(&admin, order_id, OrderStatus::OutForDelivery)
        .await
        .unwrap();
    assert_eq!(overridden.status, OrderStatus::OutForDelivery);

    // Forward to terminal, then everything is rejected.
    env.orders
        .advance(&farmer, order_id, OrderStatus::Delivered)
        .await
        .unwrap();
    let again = env
        .orders
        .advance(&farmer, order_id, OrderStatus::Delivered)
        .await;
    assert!(matches!(
        again,
        Err(ServiceError::Order(domain::OrderError::AlreadyTerminal { .. }))
    ));
    let cancel_terminal = env
        .orders
        .advance(&consumer, order_id, OrderStatus::Cancelled)
        .await;
    assert!(matches!(
        cancel_terminal,
        Err(ServiceError::Order(domain::OrderError::AlreadyTerminal { .. }))
    ));
    let override_terminal = env
        .orders
        .override_status(&admin, order_id, OrderStatus::Pending)
        .await;
    assert!(matches!(
        override_terminal,
        Err(ServiceError::Order(domain::OrderError::AlreadyTerminal { .. }))
    ));
}

#[tokio::test]
async fn consumer_can_cancel_a_pending_order() {
    let env = env();
    let farmer = sign_up_farmer(&env, "kiran@example.com", "Green Acres").await;
    let consumer = sign_up_consumer(&env, "asha@example.com").await;

    let tomatoes = env
        .catalog
        .create_product(&farmer, listing("Tomatoes", 50, 20))
        .await
        .unwrap();
    let mut cart = Cart::new();
    add_to_cart(&env, &mut cart, tomatoes.id, 1).await;
    let placed = env
        .orders
        .checkout(&consumer, &mut cart, &delivery())
        .await
        .unwrap();

    let cancelled = env
        .orders
        .advance(&consumer, placed.order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn product_ownership_is_enforced() {
    let env = env();
    let farmer = sign_up_farmer(&env, "kiran@example.com", "Green Acres").await;
    let other = sign_up_farmer(&env, "lata@example.com", "Sunrise Farm").await;
    let consumer = sign_up_consumer(&env, "asha@example.com").await;

    let tomatoes = env
        .catalog
        .create_product(&farmer, listing("Tomatoes", 50, 20))
        .await
        .unwrap();

    let update = env
        .catalog
        .update_product(&other, tomatoes.id, listing("Tomatoes", 10, 1))
        .await;
    assert!(matches!(update, Err(ServiceError::Forbidden { .. })));

    let delete = env.catalog.delete_product(&other, tomatoes.id).await;
    assert!(matches!(delete, Err(ServiceError::Forbidden { .. })));

    let create = env
        .catalog
        .create_product(&consumer, listing("Herbs", 20, 5))
        .await;
    assert!(matches!(create, Err(ServiceError::Forbidden { .. })));
}

#[tokio::test]
async fn browse_and_search_show_only_purchasable_products() {
    let env = env();
    let farmer = sign_up_farmer(&env, "kiran@example.com", "Green Acres").await;

    env.catalog
        .create_product(&farmer, listing("Tomatoes", 50, 20))
        .await
        .unwrap();
    env.catalog
        .create_product(&farmer, listing("Paneer", 30, 0)) // sold out
        .await
        .unwrap();
    let mut inactive = listing("Spinach", 25, 10);
    inactive.is_active = false;
    env.catalog.create_product(&farmer, inactive).await.unwrap();

    let browse = env.catalog.browse().await.unwrap();
    assert_eq!(browse.len(), 1);
    assert_eq!(browse[0].details.name, "Tomatoes");

    let hit = env.catalog.search("toma").await.unwrap();
    assert_eq!(hit.len(), 1);
    let miss = env.catalog.search("paneer").await.unwrap();
    assert!(miss.is_empty());

    // Out-of-stock products cannot be captured into a cart either.
    let sold_out = env.catalog.my_products(&farmer).await.unwrap();
    let sold_out_id = sold_out
        .iter()
        .find(|p| p.details.name == "Paneer")
        .unwrap()
        .id;
    let snapshot = env.catalog.snapshot_for_cart(sold_out_id).await;
    assert!(matches!(snapshot, Err(ServiceError::ProductUnavailable)));
}

#[tokio::test]
async fn ticket_lifecycle_gates_responses_and_transitions() {
    let env = env();
    let consumer = sign_up_consumer(&env, "asha@example.com").await;
    let admin = sign_up_admin(&env, "staff@example.com").await;

    let ticket = env
        .support
        .create_ticket(&consumer, "Order never arrived", "Placed a week ago.", Priority::High)
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Open);

    // Both parties respond while open; staff flag comes from the role.
    let staff_reply = env
        .support
        .respond(&admin, ticket.id, "Looking into it.")
        .await
        .unwrap();
    assert!(staff_reply.is_staff);
    let consumer_reply = env
        .support
        .respond(&consumer, ticket.id, "Thank you!")
        .await
        .unwrap();
    assert!(!consumer_reply.is_staff);

    let (_, thread) = env.support.ticket_thread(&consumer, ticket.id).await.unwrap();
    assert_eq!(thread.len(), 2);
    assert!(thread[0].created_at <= thread[1].created_at);
    assert!(thread[0].is_staff);

    // Only staff move tickets, and only forward.
    let not_staff = env
        .support
        .advance_ticket(&consumer, ticket.id, TicketStatus::Resolved)
        .await;
    assert!(matches!(not_staff, Err(ServiceError::Forbidden { .. })));

    env.support
        .advance_ticket(&admin, ticket.id, TicketStatus::InProgress)
        .await
        .unwrap();
    let backwards = env
        .support
        .advance_ticket(&admin, ticket.id, TicketStatus::Open)
        .await;
    assert!(matches!(
        backwards,
        Err(ServiceError::Ticket(
            domain::TicketError::InvalidTransition { .. }
        ))
    ));

    env.support
        .advance_ticket(&admin, ticket.id, TicketStatus::Resolved)
        .await
        .unwrap();

    // Resolved ends the conversation for both parties.
    let too_late = env.support.respond(&consumer, ticket.id, "One more thing").await;
    assert!(matches!(
        too_late,
        Err(ServiceError::Ticket(
            domain::TicketError::ConversationEnded { .. }
        ))
    ));
}

#[tokio::test]
async fn tickets_are_private_to_requester_and_staff() {
    let env = env();
    let consumer = sign_up_consumer(&env, "asha@example.com").await;
    let other = sign_up_consumer(&env, "ravi@example.com").await;

    let ticket = env
        .support
        .create_ticket(&consumer, "Billing question", "Charged twice?", Priority::Low)
        .await
        .unwrap();

    let peek = env.support.ticket_thread(&other, ticket.id).await;
    assert!(matches!(peek, Err(ServiceError::Forbidden { .. })));
}

#[tokio::test]
async fn rating_requires_delivery_and_updates_the_rolling_average() {
    let env = env();
    let farmer = sign_up_farmer(&env, "kiran@example.com", "Green Acres").await;
    let consumer = sign_up_consumer(&env, "asha@example.com").await;

    let tomatoes = env
        .catalog
        .create_product(&farmer, listing("Tomatoes", 50, 20))
        .await
        .unwrap();

    let mut order_ids = Vec::new();
    for _ in 0..2 {
        let mut cart = Cart::new();
        add_to_cart(&env, &mut cart, tomatoes.id, 1).await;
        let placed = env
            .orders
            .checkout(&consumer, &mut cart, &delivery())
            .await
            .unwrap();
        order_ids.push(placed.order.id);
    }

    // Not delivered yet.
    let early = env
        .ratings
        .rate_order(&consumer, order_ids[0], farmer.user_id, 5, None)
        .await;
    assert!(matches!(
        early,
        Err(ServiceError::Rating(RatingError::NotDelivered { .. }))
    ));

    for &order_id in &order_ids {
        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            env.orders.advance(&farmer, order_id, status).await.unwrap();
        }
    }

    env.ratings
        .rate_order(&consumer, order_ids[0], farmer.user_id, 5, Some("Great".to_string()))
        .await
        .unwrap();
    env.ratings
        .rate_order(&consumer, order_ids[1], farmer.user_id, 2, None)
        .await
        .unwrap();

    let farm = env
        .store
        .get_farm_profile(farmer.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(farm.total_ratings, 2);
    assert!((farm.rating - 3.5).abs() < 1e-9);

    // One rating per (order, farmer) pair.
    let twice = env
        .ratings
        .rate_order(&consumer, order_ids[0], farmer.user_id, 1, None)
        .await;
    assert!(matches!(
        twice,
        Err(ServiceError::Rating(RatingError::AlreadyRated))
    ));

    // Stars are bounded.
    let zero = env
        .ratings
        .rate_order(&consumer, order_ids[1], farmer.user_id, 0, None)
        .await;
    assert!(matches!(
        zero,
        Err(ServiceError::Rating(RatingError::StarsOutOfRange { stars: 0 }))
    ));
}

#[tokio::test]
async fn sign_in_round_trip_after_sign_out() {
    let env = env();
    let session = sign_up_consumer(&env, "asha@example.com").await;

    env.sessions.sign_out(session.token).await.unwrap();
    assert!(env.sessions.current_session(session.token).await.is_none());

    let again = env
        .sessions
        .sign_in("asha@example.com", "good-password-1")
        .await
        .unwrap();
    assert_eq!(again.user_id, session.user_id);

    let wrong = env.sessions.sign_in("asha@example.com", "nope").await;
    assert!(matches!(wrong, Err(IdentityError::InvalidCredentials)));
}

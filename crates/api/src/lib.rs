//! HTTP API server for the farmers' marketplace.
//!
//! Thin handlers over the `services` crate, with structured logging
//! (tracing) and Prometheus metrics. The UI pages of the storefront are
//! external collaborators; these routes are the operations they invoke.

pub mod config;
pub mod error;
pub mod routes;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use services::{
    AuthEvent, AuthObserver, CatalogService, InMemorySessions, OrderService, RatingService,
    SessionProvider, SupportService,
};
use store::MarketStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::{AppState, CartMap};

/// Drops a session's cart when the session ends.
struct CartReaper {
    carts: CartMap,
}

impl AuthObserver for CartReaper {
    fn on_auth_event(&self, event: &AuthEvent) {
        if let AuthEvent::SignedOut { session } = event {
            self.carts
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&session.token);
        }
    }
}

/// Creates the application state: one store shared by every service,
/// plus the session-scoped cart map wired to the sign-out observer.
pub fn create_default_state<S: MarketStore + 'static>(
    store: S,
    store_timeout: Duration,
) -> Arc<AppState<S>> {
    let store = Arc::new(store);
    let carts: CartMap = Arc::new(RwLock::new(HashMap::new()));

    let sessions = InMemorySessions::new(store.clone());
    sessions.subscribe(Arc::new(CartReaper {
        carts: carts.clone(),
    }));

    Arc::new(AppState {
        sessions,
        catalog: CatalogService::with_timeout(store.clone(), store_timeout),
        orders: OrderService::with_timeout(store.clone(), store_timeout),
        support: SupportService::with_timeout(store.clone(), store_timeout),
        ratings: RatingService::with_timeout(store, store_timeout),
        carts,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // auth
        .route("/auth/sign-up", post(routes::auth::sign_up::<S>))
        .route("/auth/sign-in", post(routes::auth::sign_in::<S>))
        .route("/auth/sign-out", post(routes::auth::sign_out::<S>))
        .route("/auth/session", get(routes::auth::session::<S>))
        // catalog
        .route("/products", get(routes::products::browse::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/{id}", put(routes::products::update::<S>))
        .route("/products/{id}", delete(routes::products::delete::<S>))
        .route("/my/products", get(routes::products::mine::<S>))
        // cart
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart", delete(routes::cart::clear::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route("/cart/items/{id}", patch(routes::cart::set_quantity::<S>))
        .route("/cart/items/{id}", delete(routes::cart::remove_item::<S>))
        // orders
        .route("/checkout", post(routes::orders::checkout::<S>))
        .route("/orders", get(routes::orders::mine::<S>))
        .route("/orders/incoming", get(routes::orders::incoming::<S>))
        .route("/orders/stats", get(routes::orders::stats::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", post(routes::orders::advance::<S>))
        .route(
            "/orders/{id}/override",
            post(routes::orders::override_status::<S>),
        )
        .route("/orders/{id}/ratings", post(routes::orders::rate::<S>))
        // support
        .route("/tickets", get(routes::tickets::list::<S>))
        .route("/tickets", post(routes::tickets::create::<S>))
        .route("/tickets/{id}", get(routes::tickets::thread::<S>))
        .route(
            "/tickets/{id}/responses",
            post(routes::tickets::respond::<S>),
        )
        .route("/tickets/{id}/status", post(routes::tickets::advance::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

//! Route handlers and shared application state.

pub mod auth;
pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod tickets;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::http::HeaderMap;
use domain::Cart;
use services::{
    CatalogService, InMemorySessions, OrderService, RatingService, Session, SessionProvider,
    SessionToken, SupportService,
};
use store::MarketStore;

use crate::error::ApiError;

/// Per-session carts, shared with the sign-out observer that reaps them.
pub type CartMap = Arc<RwLock<HashMap<SessionToken, Cart>>>;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub sessions: InMemorySessions<S>,
    pub catalog: CatalogService<S>,
    pub orders: OrderService<S>,
    pub support: SupportService<S>,
    pub ratings: RatingService<S>,
    pub carts: CartMap,
}

/// Extracts the bearer token from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Result<SessionToken, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("expected a Bearer token".to_string()))?;
    token
        .parse()
        .map_err(|_| ApiError::Unauthorized("malformed session token".to_string()))
}

/// Resolves the request's session or rejects with 401.
pub(crate) async fn require_session<S: MarketStore>(
    state: &AppState<S>,
    headers: &HeaderMap,
) -> Result<Session, ApiError> {
    let token = bearer_token(headers)?;
    state
        .sessions
        .current_session(token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("session expired or unknown".to_string()))
}

//! Checkout, order projections, status transitions, and ratings.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{DeliveryDetails, OrderStatus};
use serde::{Deserialize, Serialize};
use services::OrderWithItems;
use store::{IncomingOrderItem, MarketStore, OrderItemRecord, RatingRecord};

use super::{AppState, require_session};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_postal_code: String,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
pub struct RatingRequest {
    pub farmer_id: String,
    pub stars: u8,
    pub review: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub product_id: String,
    pub farmer_id: String,
    pub quantity: u32,
    pub price_per_unit_paise: i64,
    pub subtotal_paise: i64,
}

impl From<&OrderItemRecord> for OrderItemResponse {
    fn from(item: &OrderItemRecord) -> Self {
        Self {
            id: item.id.to_string(),
            product_id: item.product_id.to_string(),
            farmer_id: item.farmer_id.to_string(),
            quantity: item.quantity,
            price_per_unit_paise: item.price_per_unit.paise(),
            subtotal_paise: item.subtotal.paise(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
    pub total_paise: i64,
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_postal_code: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl From<&OrderWithItems> for OrderResponse {
    fn from(placed: &OrderWithItems) -> Self {
        Self {
            id: placed.order.id.to_string(),
            status: placed.order.status.to_string(),
            total_paise: placed.order.total_amount.paise(),
            delivery_address: placed.order.delivery_address.clone(),
            delivery_city: placed.order.delivery_city.clone(),
            delivery_postal_code: placed.order.delivery_postal_code.clone(),
            notes: placed.order.notes.clone(),
            created_at: placed.order.created_at,
            updated_at: placed.order.updated_at,
            items: placed.items.iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct IncomingItemResponse {
    pub order_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub price_per_unit_paise: i64,
    pub subtotal_paise: i64,
    pub status: String,
    pub delivery_address: String,
    pub delivery_city: String,
    pub placed_at: DateTime<Utc>,
}

impl From<&IncomingOrderItem> for IncomingItemResponse {
    fn from(incoming: &IncomingOrderItem) -> Self {
        Self {
            order_id: incoming.item.order_id.to_string(),
            product_name: incoming.product_name.clone(),
            quantity: incoming.item.quantity,
            price_per_unit_paise: incoming.item.price_per_unit.paise(),
            subtotal_paise: incoming.item.subtotal.paise(),
            status: incoming.status.to_string(),
            delivery_address: incoming.delivery_address.clone(),
            delivery_city: incoming.delivery_city.clone(),
            placed_at: incoming.placed_at,
        }
    }
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_orders: u64,
    pub active_orders: u64,
}

#[derive(Serialize)]
pub struct RatingResponse {
    pub id: String,
    pub order_id: String,
    pub farmer_id: String,
    pub stars: u8,
    pub review: Option<String>,
}

impl From<&RatingRecord> for RatingResponse {
    fn from(rating: &RatingRecord) -> Self {
        Self {
            id: rating.id.to_string(),
            order_id: rating.order_id.to_string(),
            farmer_id: rating.farmer_id.to_string(),
            stars: rating.stars,
            review: rating.review.clone(),
        }
    }
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid order id: {id}")))
}

// -- Handlers --

/// POST /checkout — convert the session cart into an order.
#[tracing::instrument(skip(state, headers, req))]
pub async fn checkout<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let session = require_session(&state, &headers).await?;

    // Work on a copy so a failed checkout leaves the stored cart intact.
    let mut cart = {
        let carts = state.carts.read().unwrap_or_else(|e| e.into_inner());
        carts.get(&session.token).cloned().unwrap_or_default()
    };

    let details = DeliveryDetails {
        address: req.delivery_address,
        city: req.delivery_city,
        postal_code: req.delivery_postal_code,
        notes: req.notes,
    };

    let placed = state.orders.checkout(&session, &mut cart, &details).await?;

    let mut carts = state.carts.write().unwrap_or_else(|e| e.into_inner());
    carts.remove(&session.token);

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&placed))))
}

/// GET /orders — the calling consumer's orders, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn mine<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let orders = state.orders.my_orders(&session).await?;
    Ok(Json(orders.iter().map(Into::into).collect()))
}

/// GET /orders/incoming — the calling farmer's order items.
#[tracing::instrument(skip(state, headers))]
pub async fn incoming<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<IncomingItemResponse>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let items = state.orders.incoming_orders(&session).await?;
    Ok(Json(items.iter().map(Into::into).collect()))
}

/// GET /orders/stats — dashboard counters for the calling consumer.
#[tracing::instrument(skip(state, headers))]
pub async fn stats<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let stats = state.orders.consumer_stats(&session).await?;
    Ok(Json(StatsResponse {
        total_orders: stats.total_orders,
        active_orders: stats.active_orders,
    }))
}

/// GET /orders/{id} — one order with items, for a party to it.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let order = state
        .orders
        .get_order(&session, parse_order_id(&id)?)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/status — advance one step or cancel.
#[tracing::instrument(skip(state, headers, req))]
pub async fn advance<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let order_id = parse_order_id(&id)?;
    state
        .orders
        .advance(&session, order_id, req.status)
        .await?;
    let order = state.orders.get_order(&session, order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/override — admin-only skip of fulfilment steps.
#[tracing::instrument(skip(state, headers, req))]
pub async fn override_status<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let order_id = parse_order_id(&id)?;
    state
        .orders
        .override_status(&session, order_id, req.status)
        .await?;
    let order = state.orders.get_order(&session, order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/ratings — rate one farmer's share of a delivered order.
#[tracing::instrument(skip(state, headers, req))]
pub async fn rate<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RatingRequest>,
) -> Result<(StatusCode, Json<RatingResponse>), ApiError> {
    let session = require_session(&state, &headers).await?;
    let farmer_id: UserId = req
        .farmer_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid farmer id: {}", req.farmer_id)))?;
    let rating = state
        .ratings
        .rate_order(
            &session,
            parse_order_id(&id)?,
            farmer_id,
            req.stars,
            req.review,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(RatingResponse::from(&rating))))
}

//! Session-scoped cart endpoints.
//!
//! The cart lives in server memory keyed by session token; it never
//! touches the store and disappears with the session.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use common::ProductId;
use domain::{Cart, DELIVERY_FEE};
use serde::{Deserialize, Serialize};
use store::MarketStore;

use super::{AppState, require_session};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartItemResponse {
    pub product_id: String,
    pub name: String,
    pub price_paise: i64,
    pub unit: String,
    pub quantity: u32,
    pub line_total_paise: i64,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub subtotal_paise: i64,
    pub delivery_fee_paise: i64,
    pub total_paise: i64,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .items()
                .map(|item| CartItemResponse {
                    product_id: item.product.product_id.to_string(),
                    name: item.product.name.clone(),
                    price_paise: item.product.price.paise(),
                    unit: item.product.unit.clone(),
                    quantity: item.quantity,
                    line_total_paise: item.line_total().paise(),
                })
                .collect(),
            subtotal_paise: cart.subtotal().paise(),
            delivery_fee_paise: DELIVERY_FEE.paise(),
            total_paise: cart.total().paise(),
        }
    }
}

fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid product id: {id}")))
}

// -- Handlers --

/// GET /cart — the current session's cart.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let carts = state.carts.read().unwrap_or_else(|e| e.into_inner());
    let response = carts
        .get(&session.token)
        .map(CartResponse::from)
        .unwrap_or_else(|| CartResponse::from(&Cart::new()));
    Ok(Json(response))
}

/// POST /cart/items — add a product (default quantity 1), merging duplicates.
#[tracing::instrument(skip(state, headers, req))]
pub async fn add_item<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let product_id = parse_product_id(&req.product_id)?;

    // Snapshot before taking the lock; the await must not hold it.
    let snapshot = state.catalog.snapshot_for_cart(product_id).await?;

    let mut carts = state.carts.write().unwrap_or_else(|e| e.into_inner());
    let cart = carts.entry(session.token).or_default();
    cart.add_item(snapshot, req.quantity)
        .map_err(services::ServiceError::from)?;
    Ok(Json(CartResponse::from(&*cart)))
}

/// PATCH /cart/items/{id} — set a quantity (clamped to at least 1).
#[tracing::instrument(skip(state, headers, req))]
pub async fn set_quantity<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let product_id = parse_product_id(&id)?;

    let mut carts = state.carts.write().unwrap_or_else(|e| e.into_inner());
    let cart = carts.entry(session.token).or_default();
    cart.set_quantity(product_id, req.quantity);
    Ok(Json(CartResponse::from(&*cart)))
}

/// DELETE /cart/items/{id} — remove an entry; no-op if absent.
#[tracing::instrument(skip(state, headers))]
pub async fn remove_item<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let product_id = parse_product_id(&id)?;

    let mut carts = state.carts.write().unwrap_or_else(|e| e.into_inner());
    let cart = carts.entry(session.token).or_default();
    cart.remove_item(product_id);
    Ok(Json(CartResponse::from(&*cart)))
}

/// DELETE /cart — empty the cart.
#[tracing::instrument(skip(state, headers))]
pub async fn clear<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let session = require_session(&state, &headers).await?;
    let mut carts = state.carts.write().unwrap_or_else(|e| e.into_inner());
    carts.remove(&session.token);
    Ok(StatusCode::NO_CONTENT)
}

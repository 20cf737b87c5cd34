//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::NaiveDate;
use common::{Money, ProductId};
use domain::ProductDetails;
use serde::{Deserialize, Serialize};
use store::{MarketStore, ProductRecord};

use super::{AppState, require_session};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_paise: i64,
    pub unit: String,
    pub category: String,
    pub quantity_available: u32,
    #[serde(default)]
    pub organic: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub image_url: Option<String>,
    pub freshness_date: Option<NaiveDate>,
}

fn default_active() -> bool {
    true
}

impl From<ProductRequest> for ProductDetails {
    fn from(req: ProductRequest) -> Self {
        ProductDetails {
            name: req.name,
            description: req.description,
            price: Money::from_paise(req.price_paise),
            unit: req.unit,
            category: req.category,
            quantity_available: req.quantity_available,
            organic: req.organic,
            is_active: req.is_active,
            image_url: req.image_url,
            freshness_date: req.freshness_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BrowseParams {
    pub q: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub farmer_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_paise: i64,
    pub unit: String,
    pub category: String,
    pub quantity_available: u32,
    pub organic: bool,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub freshness_date: Option<NaiveDate>,
}

impl From<ProductRecord> for ProductResponse {
    fn from(record: ProductRecord) -> Self {
        Self {
            id: record.id.to_string(),
            farmer_id: record.farmer_id.to_string(),
            name: record.details.name,
            description: record.details.description,
            price_paise: record.details.price.paise(),
            unit: record.details.unit,
            category: record.details.category,
            quantity_available: record.details.quantity_available,
            organic: record.details.organic,
            is_active: record.details.is_active,
            image_url: record.details.image_url,
            freshness_date: record.details.freshness_date,
        }
    }
}

fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid product id: {id}")))
}

// -- Handlers --

/// GET /products — purchasable products, optionally filtered by ?q=.
#[tracing::instrument(skip(state))]
pub async fn browse<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<BrowseParams>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = match params.q.as_deref() {
        Some(query) => state.catalog.search(query).await?,
        None => state.catalog.browse().await?,
    };
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /products/{id} — a single product.
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.catalog.get_product(parse_product_id(&id)?).await?;
    Ok(Json(product.into()))
}

/// GET /my/products — the calling farmer's listings.
#[tracing::instrument(skip(state, headers))]
pub async fn mine<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let products = state.catalog.my_products(&session).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// POST /products — create a listing.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let session = require_session(&state, &headers).await?;
    let product = state.catalog.create_product(&session, req.into()).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// PUT /products/{id} — replace a listing's fields.
#[tracing::instrument(skip(state, headers, req))]
pub async fn update<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let product = state
        .catalog
        .update_product(&session, parse_product_id(&id)?, req.into())
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /products/{id} — hard-delete a listing.
#[tracing::instrument(skip(state, headers))]
pub async fn delete<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session = require_session(&state, &headers).await?;
    state
        .catalog
        .delete_product(&session, parse_product_id(&id)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Delivered-order ratings feeding the farm's rolling average.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{OrderId, RatingId, UserId};
use domain::{OrderStatus, Role};
use store::{MarketStore, RatingRecord, StoreError};
use thiserror::Error;

use crate::error::with_timeout;
use crate::identity::Session;
use crate::{DEFAULT_STORE_TIMEOUT, Result, ServiceError};

/// Errors specific to rating an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RatingError {
    /// Stars must be between 1 and 5.
    #[error("invalid stars: {stars} (must be between 1 and 5)")]
    StarsOutOfRange { stars: u8 },

    /// Only delivered orders can be rated.
    #[error("order is {status}; only delivered orders can be rated")]
    NotDelivered { status: OrderStatus },

    /// The farmer has no items in the order.
    #[error("farmer has no items in this order")]
    FarmerNotInOrder,

    /// This (order, farmer) pair was already rated.
    #[error("order already rated for this farmer")]
    AlreadyRated,
}

/// Service for leaving ratings on fulfilled orders.
pub struct RatingService<S> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: MarketStore> RatingService<S> {
    /// Creates a rating service with the default store timeout.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_timeout(store, DEFAULT_STORE_TIMEOUT)
    }

    /// Creates a rating service with a custom store timeout.
    pub fn with_timeout(store: Arc<S>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Rates one farmer's share of a delivered order.
    ///
    /// One rating per (order, farmer) pair; the farm profile's rolling
    /// average is updated in the same store transaction.
    #[tracing::instrument(skip(self, session, review), fields(consumer_id = %session.user_id))]
    pub async fn rate_order(
        &self,
        session: &Session,
        order_id: OrderId,
        farmer_id: UserId,
        stars: u8,
        review: Option<String>,
    ) -> Result<RatingRecord> {
        if session.role != Role::Consumer {
            return Err(ServiceError::Forbidden {
                reason: "only consumers rate orders",
            });
        }
        if !(1..=5).contains(&stars) {
            return Err(RatingError::StarsOutOfRange { stars }.into());
        }

        let order = with_timeout(self.timeout, "get_order", self.store.get_order(order_id))
            .await?
            .ok_or(ServiceError::NotFound { what: "order" })?;
        if order.consumer_id != session.user_id {
            return Err(ServiceError::Forbidden {
                reason: "not your order",
            });
        }
        if order.status != OrderStatus::Delivered {
            return Err(RatingError::NotDelivered {
                status: order.status,
            }
            .into());
        }

        let items = with_timeout(
            self.timeout,
            "list_order_items",
            self.store.list_order_items(order_id),
        )
        .await?;
        if !items.iter().any(|item| item.farmer_id == farmer_id) {
            return Err(RatingError::FarmerNotInOrder.into());
        }

        let rating = RatingRecord {
            id: RatingId::new(),
            order_id,
            consumer_id: session.user_id,
            farmer_id,
            stars,
            review,
            created_at: Utc::now(),
        };

        let result = with_timeout(
            self.timeout,
            "insert_rating",
            self.store.insert_rating(rating.clone()),
        )
        .await;
        match result {
            Ok(()) => {
                metrics::counter!("ratings_submitted").increment(1);
                Ok(rating)
            }
            // Concurrent double-submit lands on the unique constraint.
            Err(ServiceError::Store(StoreError::Constraint { ref constraint }))
                if constraint.contains("ratings") =>
            {
                Err(RatingError::AlreadyRated.into())
            }
            Err(e) => Err(e),
        }
    }
}

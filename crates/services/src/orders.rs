//! Order lifecycle service: checkout, status transitions, read projections.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::OrderId;
use domain::{Cart, CheckoutDraft, DeliveryDetails, OrderStatus, Role, check_transition};
use store::{IncomingOrderItem, MarketStore, OrderItemRecord, OrderRecord};

use crate::error::with_timeout;
use crate::identity::Session;
use crate::{DEFAULT_STORE_TIMEOUT, Result, ServiceError};

/// An order together with its line items.
#[derive(Debug, Clone)]
pub struct OrderWithItems {
    pub order: OrderRecord,
    pub items: Vec<OrderItemRecord>,
}

/// Dashboard counters for a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerOrderStats {
    pub total_orders: u64,
    pub active_orders: u64,
}

/// Service for placing orders and driving them through fulfilment.
pub struct OrderService<S> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: MarketStore> OrderService<S> {
    /// Creates an order service with the default store timeout.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_timeout(store, DEFAULT_STORE_TIMEOUT)
    }

    /// Creates an order service with a custom store timeout.
    pub fn with_timeout(store: Arc<S>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Converts the cart into one order plus its items, atomically.
    ///
    /// On success the cart is cleared; on any failure the cart is left
    /// untouched and no rows exist. Consumers only.
    #[tracing::instrument(skip(self, session, cart, details), fields(consumer_id = %session.user_id))]
    pub async fn checkout(
        &self,
        session: &Session,
        cart: &mut Cart,
        details: &DeliveryDetails,
    ) -> Result<OrderWithItems> {
        if session.role != Role::Consumer {
            return Err(ServiceError::Forbidden {
                reason: "only consumers place orders",
            });
        }

        let started = Instant::now();
        let draft = CheckoutDraft::build(session.user_id, cart, details)?;

        let now = Utc::now();
        let order = OrderRecord {
            id: draft.order.id,
            consumer_id: draft.order.consumer_id,
            total_amount: draft.order.total_amount,
            delivery_address: draft.order.delivery_address,
            delivery_city: draft.order.delivery_city,
            delivery_postal_code: draft.order.delivery_postal_code,
            notes: draft.order.notes,
            status: draft.order.status,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItemRecord> = draft
            .items
            .into_iter()
            .map(|item| OrderItemRecord {
                id: item.id,
                order_id: item.order_id,
                product_id: item.product_id,
                farmer_id: item.farmer_id,
                quantity: item.quantity,
                price_per_unit: item.price_per_unit,
                subtotal: item.subtotal,
                created_at: now,
            })
            .collect();

        let result = with_timeout(
            self.timeout,
            "create_order",
            self.store.create_order(order.clone(), items.clone()),
        )
        .await;

        match result {
            Ok(()) => {
                cart.clear();
                metrics::counter!("orders_placed").increment(1);
                metrics::histogram!("checkout_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(order_id = %order.id, total = %order.total_amount, "order placed");
                Ok(OrderWithItems { order, items })
            }
            Err(e) => {
                metrics::counter!("orders_failed").increment(1);
                Err(e)
            }
        }
    }

    /// Lists the calling consumer's orders with items, newest first.
    #[tracing::instrument(skip(self, session), fields(consumer_id = %session.user_id))]
    pub async fn my_orders(&self, session: &Session) -> Result<Vec<OrderWithItems>> {
        if session.role != Role::Consumer {
            return Err(ServiceError::Forbidden {
                reason: "only consumers have an order history",
            });
        }

        let orders = with_timeout(
            self.timeout,
            "list_orders_for_consumer",
            self.store.list_orders_for_consumer(session.user_id),
        )
        .await?;

        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let items = with_timeout(
                self.timeout,
                "list_order_items",
                self.store.list_order_items(order.id),
            )
            .await?;
            result.push(OrderWithItems { order, items });
        }
        Ok(result)
    }

    /// Lists the calling farmer's incoming order items, newest first.
    #[tracing::instrument(skip(self, session), fields(farmer_id = %session.user_id))]
    pub async fn incoming_orders(&self, session: &Session) -> Result<Vec<IncomingOrderItem>> {
        if session.role != Role::Farmer {
            return Err(ServiceError::Forbidden {
                reason: "only farmers receive orders",
            });
        }
        with_timeout(
            self.timeout,
            "list_incoming_for_farmer",
            self.store.list_incoming_for_farmer(session.user_id),
        )
        .await
    }

    /// Dashboard counters for the calling consumer.
    #[tracing::instrument(skip(self, session), fields(consumer_id = %session.user_id))]
    pub async fn consumer_stats(&self, session: &Session) -> Result<ConsumerOrderStats> {
        if session.role != Role::Consumer {
            return Err(ServiceError::Forbidden {
                reason: "only consumers have an order history",
            });
        }
        let orders = with_timeout(
            self.timeout,
            "list_orders_for_consumer",
            self.store.list_orders_for_consumer(session.user_id),
        )
        .await?;
        Ok(ConsumerOrderStats {
            total_orders: orders.len() as u64,
            active_orders: orders.iter().filter(|o| o.status.is_active()).count() as u64,
        })
    }

    /// Fetches one order with items; caller must be a party to it.
    #[tracing::instrument(skip(self, session))]
    pub async fn get_order(&self, session: &Session, id: OrderId) -> Result<OrderWithItems> {
        let (order, items) = self.load(id).await?;
        if !is_party(session, &order, &items) {
            return Err(ServiceError::Forbidden {
                reason: "not a party to this order",
            });
        }
        Ok(OrderWithItems { order, items })
    }

    /// Moves an order one step forward, or out to cancelled.
    ///
    /// Forward steps are restricted to farmers with items in the order
    /// (and admins); cancellation is additionally open to the owning
    /// consumer. Skips are rejected; see [`OrderService::override_status`].
    #[tracing::instrument(skip(self, session), fields(actor = %session.user_id))]
    pub async fn advance(
        &self,
        session: &Session,
        id: OrderId,
        new_status: OrderStatus,
    ) -> Result<OrderRecord> {
        let (mut order, items) = self.load(id).await?;

        let fulfils = items.iter().any(|item| item.farmer_id == session.user_id);
        let authorized = if new_status == OrderStatus::Cancelled {
            session.role == Role::Admin || fulfils || order.consumer_id == session.user_id
        } else {
            session.role == Role::Admin || fulfils
        };
        if !authorized {
            return Err(ServiceError::Forbidden {
                reason: "not allowed to change this order's status",
            });
        }

        check_transition(order.status, new_status)?;

        let now = Utc::now();
        with_timeout(
            self.timeout,
            "update_order_status",
            self.store.update_order_status(id, new_status, now),
        )
        .await?;
        metrics::counter!("order_transitions").increment(1);

        order.status = new_status;
        order.updated_at = now;
        Ok(order)
    }

    /// Admin-only override that may skip forward steps.
    ///
    /// Terminal orders still cannot be moved. Every use is logged.
    #[tracing::instrument(skip(self, session), fields(actor = %session.user_id))]
    pub async fn override_status(
        &self,
        session: &Session,
        id: OrderId,
        new_status: OrderStatus,
    ) -> Result<OrderRecord> {
        if session.role != Role::Admin {
            return Err(ServiceError::Forbidden {
                reason: "status override is admin-only",
            });
        }

        let (mut order, _) = self.load(id).await?;
        if order.status.is_terminal() {
            return Err(domain::OrderError::AlreadyTerminal {
                status: order.status,
            }
            .into());
        }

        tracing::warn!(
            order_id = %id,
            from = %order.status,
            to = %new_status,
            "admin status override"
        );

        let now = Utc::now();
        with_timeout(
            self.timeout,
            "update_order_status",
            self.store.update_order_status(id, new_status, now),
        )
        .await?;

        order.status = new_status;
        order.updated_at = now;
        Ok(order)
    }

    async fn load(&self, id: OrderId) -> Result<(OrderRecord, Vec<OrderItemRecord>)> {
        let order = with_timeout(self.timeout, "get_order", self.store.get_order(id))
            .await?
            .ok_or(ServiceError::NotFound { what: "order" })?;
        let items = with_timeout(
            self.timeout,
            "list_order_items",
            self.store.list_order_items(id),
        )
        .await?;
        Ok((order, items))
    }
}

fn is_party(session: &Session, order: &OrderRecord, items: &[OrderItemRecord]) -> bool {
    session.role == Role::Admin
        || order.consumer_id == session.user_id
        || items.iter().any(|item| item.farmer_id == session.user_id)
}

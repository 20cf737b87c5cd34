use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, TicketId, UserId};
use domain::{OrderStatus, TicketStatus};

use crate::Result;
use crate::records::{
    DeliveryProfileRecord, FarmProfileRecord, IncomingOrderItem, OrderItemRecord, OrderRecord,
    ProductRecord, ProfileRecord, RatingRecord, TicketRecord, TicketResponseRecord,
};

/// Core trait for marketplace persistence.
///
/// One method per table operation the system needs; every call is an
/// independent request/response exchange. All implementations must be
/// thread-safe (Send + Sync). Listings are returned newest-first unless
/// noted otherwise.
#[async_trait]
pub trait MarketStore: Send + Sync {
    // -- profiles --

    /// Inserts a new profile row. Fails on a duplicate email.
    async fn insert_profile(&self, profile: ProfileRecord) -> Result<()>;

    /// Fetches a profile by id.
    async fn get_profile(&self, id: UserId) -> Result<Option<ProfileRecord>>;

    /// Fetches a profile by email.
    async fn get_profile_by_email(&self, email: &str) -> Result<Option<ProfileRecord>>;

    /// Inserts or replaces a farmer's farm profile.
    async fn upsert_farm_profile(&self, profile: FarmProfileRecord) -> Result<()>;

    /// Fetches a farmer's farm profile.
    async fn get_farm_profile(&self, farmer_id: UserId) -> Result<Option<FarmProfileRecord>>;

    /// Inserts or replaces a consumer's delivery profile.
    async fn upsert_delivery_profile(&self, profile: DeliveryProfileRecord) -> Result<()>;

    /// Fetches a consumer's delivery profile.
    async fn get_delivery_profile(
        &self,
        consumer_id: UserId,
    ) -> Result<Option<DeliveryProfileRecord>>;

    // -- products --

    /// Inserts a new product row.
    async fn insert_product(&self, product: ProductRecord) -> Result<()>;

    /// Replaces an existing product row.
    async fn update_product(&self, product: ProductRecord) -> Result<()>;

    /// Hard-deletes a product row.
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    /// Fetches a product by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>>;

    /// Lists all products owned by a farmer.
    async fn list_products_by_farmer(&self, farmer_id: UserId) -> Result<Vec<ProductRecord>>;

    /// Lists products currently purchasable (active and in stock).
    async fn list_purchasable_products(&self) -> Result<Vec<ProductRecord>>;

    // -- orders --

    /// Creates an order together with all of its line items.
    ///
    /// The write is atomic: either the order row, every item row, and the
    /// stock decrements land together, or nothing does. Stock is clamped
    /// at zero rather than rejecting the order.
    async fn create_order(&self, order: OrderRecord, items: Vec<OrderItemRecord>) -> Result<()>;

    /// Fetches an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Lists an order's line items in insertion order.
    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Lists all orders placed by a consumer.
    async fn list_orders_for_consumer(&self, consumer_id: UserId) -> Result<Vec<OrderRecord>>;

    /// Lists a farmer's incoming order items joined with parent order data.
    async fn list_incoming_for_farmer(&self, farmer_id: UserId)
    -> Result<Vec<IncomingOrderItem>>;

    /// Overwrites an order's status. Last write wins.
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    // -- support tickets --

    /// Inserts a new ticket row.
    async fn insert_ticket(&self, ticket: TicketRecord) -> Result<()>;

    /// Fetches a ticket by id.
    async fn get_ticket(&self, id: TicketId) -> Result<Option<TicketRecord>>;

    /// Lists all tickets opened by a requester.
    async fn list_tickets_for_requester(&self, requester_id: UserId) -> Result<Vec<TicketRecord>>;

    /// Overwrites a ticket's status.
    async fn update_ticket_status(
        &self,
        id: TicketId,
        status: TicketStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Appends a response to a ticket thread.
    async fn insert_ticket_response(&self, response: TicketResponseRecord) -> Result<()>;

    /// Lists a ticket's responses, oldest first (display order).
    async fn list_ticket_responses(&self, ticket_id: TicketId)
    -> Result<Vec<TicketResponseRecord>>;

    // -- ratings --

    /// Inserts a rating and folds it into the farmer's rolling average.
    ///
    /// Atomic with the farm-profile update. Fails with a constraint error
    /// if the (order, farmer) pair was already rated.
    async fn insert_rating(&self, rating: RatingRecord) -> Result<()>;

    /// Fetches the rating a consumer left for a farmer on an order.
    async fn get_rating(
        &self,
        order_id: OrderId,
        farmer_id: UserId,
    ) -> Result<Option<RatingRecord>>;
}

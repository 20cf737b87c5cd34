//! Row types mirroring the relational tables.
//!
//! Timestamps are stamped by the caller (the service layer) so both store
//! implementations persist identical rows.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderItemId, ProductId, RatingId, ResponseId, TicketId, UserId};
use domain::{OrderStatus, Priority, ProductDetails, Role, TicketStatus};
use serde::{Deserialize, Serialize};

/// A `profiles` row: one per signed-up user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `farm_profiles` row: 1:1 with a farmer profile.
///
/// `rating` and `total_ratings` form the rolling average maintained by
/// [`crate::MarketStore::insert_rating`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmProfileRecord {
    pub farmer_id: UserId,
    pub farm_name: String,
    pub farm_address: String,
    pub farm_description: Option<String>,
    pub farm_size: Option<String>,
    pub organic_certified: bool,
    pub rating: f64,
    pub total_ratings: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `delivery_profiles` row: 1:1 with a consumer profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryProfileRecord {
    pub consumer_id: UserId,
    pub delivery_address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub preferences: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `products` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub farmer_id: UserId,
    #[serde(flatten)]
    pub details: ProductDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Returns true while the product may be added to carts.
    pub fn purchasable(&self) -> bool {
        self.details.purchasable()
    }
}

/// An `orders` row. Never deleted, only transitioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub consumer_id: UserId,
    pub total_amount: Money,
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_postal_code: String,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An `order_items` row. Written once at checkout, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub farmer_id: UserId,
    pub quantity: u32,
    pub price_per_unit: Money,
    pub subtotal: Money,
    pub created_at: DateTime<Utc>,
}

/// A farmer-facing projection row: an order item joined with its product
/// name and the parent order's status and delivery target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingOrderItem {
    pub item: OrderItemRecord,
    pub product_name: String,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub delivery_city: String,
    pub placed_at: DateTime<Utc>,
}

/// A `support_tickets` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: TicketId,
    pub requester_id: UserId,
    pub subject: String,
    pub message: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `ticket_responses` row. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketResponseRecord {
    pub id: ResponseId,
    pub ticket_id: TicketId,
    pub author_id: UserId,
    pub message: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

/// A `ratings` row: one per (order, farmer) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub id: RatingId,
    pub order_id: OrderId,
    pub consumer_id: UserId,
    pub farmer_id: UserId,
    pub stars: u8,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
}

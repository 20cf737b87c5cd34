use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, TicketId, UserId};
use domain::{OrderStatus, TicketStatus};
use tokio::sync::RwLock;

use crate::records::{
    DeliveryProfileRecord, FarmProfileRecord, IncomingOrderItem, OrderItemRecord, OrderRecord,
    ProductRecord, ProfileRecord, RatingRecord, TicketRecord, TicketResponseRecord,
};
use crate::{MarketStore, Result, StoreError};

#[derive(Default)]
struct Inner {
    profiles: HashMap<UserId, ProfileRecord>,
    farm_profiles: HashMap<UserId, FarmProfileRecord>,
    delivery_profiles: HashMap<UserId, DeliveryProfileRecord>,
    products: HashMap<ProductId, ProductRecord>,
    orders: HashMap<OrderId, OrderRecord>,
    order_items: Vec<OrderItemRecord>,
    tickets: HashMap<TicketId, TicketRecord>,
    ticket_responses: Vec<TicketResponseRecord>,
    ratings: Vec<RatingRecord>,
}

/// In-memory store implementation.
///
/// Holds every table in maps behind a single `RwLock`, which makes the
/// multi-row checkout write atomic the same way the PostgreSQL
/// transaction does. Used by tests and the default server.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every table.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        *inner = Inner::default();
    }
}

fn constraint(name: &str) -> StoreError {
    StoreError::Constraint {
        constraint: name.to_string(),
    }
}

#[async_trait]
impl MarketStore for InMemoryStore {
    async fn insert_profile(&self, profile: ProfileRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        // Unique-email constraint simulation.
        if inner.profiles.values().any(|p| p.email == profile.email) {
            return Err(constraint("profiles_email_key"));
        }
        if inner.profiles.contains_key(&profile.id) {
            return Err(constraint("profiles_pkey"));
        }
        inner.profiles.insert(profile.id, profile);
        Ok(())
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<ProfileRecord>> {
        Ok(self.inner.read().await.profiles.get(&id).cloned())
    }

    async fn get_profile_by_email(&self, email: &str) -> Result<Option<ProfileRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .profiles
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn upsert_farm_profile(&self, profile: FarmProfileRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.profiles.contains_key(&profile.farmer_id) {
            return Err(constraint("farm_profiles_farmer_id_fkey"));
        }
        // Re-upserting keeps the rolling rating and original creation time.
        let mut profile = profile;
        if let Some(existing) = inner.farm_profiles.get(&profile.farmer_id) {
            profile.rating = existing.rating;
            profile.total_ratings = existing.total_ratings;
            profile.created_at = existing.created_at;
        }
        inner.farm_profiles.insert(profile.farmer_id, profile);
        Ok(())
    }

    async fn get_farm_profile(&self, farmer_id: UserId) -> Result<Option<FarmProfileRecord>> {
        Ok(self.inner.read().await.farm_profiles.get(&farmer_id).cloned())
    }

    async fn upsert_delivery_profile(&self, profile: DeliveryProfileRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.profiles.contains_key(&profile.consumer_id) {
            return Err(constraint("delivery_profiles_consumer_id_fkey"));
        }
        let mut profile = profile;
        if let Some(existing) = inner.delivery_profiles.get(&profile.consumer_id) {
            profile.created_at = existing.created_at;
        }
        inner.delivery_profiles.insert(profile.consumer_id, profile);
        Ok(())
    }

    async fn get_delivery_profile(
        &self,
        consumer_id: UserId,
    ) -> Result<Option<DeliveryProfileRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .delivery_profiles
            .get(&consumer_id)
            .cloned())
    }

    async fn insert_product(&self, product: ProductRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.profiles.contains_key(&product.farmer_id) {
            return Err(constraint("products_farmer_id_fkey"));
        }
        inner.products.insert(product.id, product);
        Ok(())
    }

    async fn update_product(&self, product: ProductRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.products.contains_key(&product.id) {
            return Err(StoreError::NotFound { table: "products" });
        }
        inner.products.insert(product.id, product);
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut inner = self.inner.write().await;
        // Foreign-key simulation: order items keep referencing the product.
        if inner.order_items.iter().any(|item| item.product_id == id) {
            return Err(constraint("order_items_product_id_fkey"));
        }
        if inner.products.remove(&id).is_none() {
            return Err(StoreError::NotFound { table: "products" });
        }
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn list_products_by_farmer(&self, farmer_id: UserId) -> Result<Vec<ProductRecord>> {
        let inner = self.inner.read().await;
        let mut products: Vec<_> = inner
            .products
            .values()
            .filter(|p| p.farmer_id == farmer_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn list_purchasable_products(&self) -> Result<Vec<ProductRecord>> {
        let inner = self.inner.read().await;
        let mut products: Vec<_> = inner
            .products
            .values()
            .filter(|p| p.purchasable())
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn create_order(&self, order: OrderRecord, items: Vec<OrderItemRecord>) -> Result<()> {
        let mut inner = self.inner.write().await;

        // Foreign-key simulation before any mutation: all item products
        // must still exist, so the write is all-or-nothing.
        for item in &items {
            if !inner.products.contains_key(&item.product_id) {
                return Err(constraint("order_items_product_id_fkey"));
            }
        }
        if inner.orders.contains_key(&order.id) {
            return Err(constraint("orders_pkey"));
        }

        for item in &items {
            if let Some(product) = inner.products.get_mut(&item.product_id) {
                // Stock is clamped at zero, not a reservation system.
                product.details.quantity_available = product
                    .details
                    .quantity_available
                    .saturating_sub(item.quantity);
            }
        }
        inner.orders.insert(order.id, order);
        inner.order_items.extend(items);
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_orders_for_consumer(&self, consumer_id: UserId) -> Result<Vec<OrderRecord>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<_> = inner
            .orders
            .values()
            .filter(|o| o.consumer_id == consumer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_incoming_for_farmer(
        &self,
        farmer_id: UserId,
    ) -> Result<Vec<IncomingOrderItem>> {
        let inner = self.inner.read().await;
        let mut incoming: Vec<_> = inner
            .order_items
            .iter()
            .filter(|item| item.farmer_id == farmer_id)
            .filter_map(|item| {
                let order = inner.orders.get(&item.order_id)?;
                let product_name = inner
                    .products
                    .get(&item.product_id)
                    .map(|p| p.details.name.clone())
                    .unwrap_or_default();
                Some(IncomingOrderItem {
                    item: item.clone(),
                    product_name,
                    status: order.status,
                    delivery_address: order.delivery_address.clone(),
                    delivery_city: order.delivery_city.clone(),
                    placed_at: order.created_at,
                })
            })
            .collect();
        incoming.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
        Ok(incoming)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(&id)
            .ok_or(StoreError::NotFound { table: "orders" })?;
        order.status = status;
        order.updated_at = updated_at;
        Ok(())
    }

    async fn insert_ticket(&self, ticket: TicketRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.profiles.contains_key(&ticket.requester_id) {
            return Err(constraint("support_tickets_requester_id_fkey"));
        }
        inner.tickets.insert(ticket.id, ticket);
        Ok(())
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<TicketRecord>> {
        Ok(self.inner.read().await.tickets.get(&id).cloned())
    }

    async fn list_tickets_for_requester(&self, requester_id: UserId) -> Result<Vec<TicketRecord>> {
        let inner = self.inner.read().await;
        let mut tickets: Vec<_> = inner
            .tickets
            .values()
            .filter(|t| t.requester_id == requester_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn update_ticket_status(
        &self,
        id: TicketId,
        status: TicketStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let ticket = inner.tickets.get_mut(&id).ok_or(StoreError::NotFound {
            table: "support_tickets",
        })?;
        ticket.status = status;
        ticket.updated_at = updated_at;
        Ok(())
    }

    async fn insert_ticket_response(&self, response: TicketResponseRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.tickets.contains_key(&response.ticket_id) {
            return Err(constraint("ticket_responses_ticket_id_fkey"));
        }
        inner.ticket_responses.push(response);
        Ok(())
    }

    async fn list_ticket_responses(
        &self,
        ticket_id: TicketId,
    ) -> Result<Vec<TicketResponseRecord>> {
        let inner = self.inner.read().await;
        let mut responses: Vec<_> = inner
            .ticket_responses
            .iter()
            .filter(|r| r.ticket_id == ticket_id)
            .cloned()
            .collect();
        responses.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(responses)
    }

    async fn insert_rating(&self, rating: RatingRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner
            .ratings
            .iter()
            .any(|r| r.order_id == rating.order_id && r.farmer_id == rating.farmer_id)
        {
            return Err(constraint("ratings_order_farmer_key"));
        }

        let farm = inner
            .farm_profiles
            .get_mut(&rating.farmer_id)
            .ok_or(StoreError::NotFound {
                table: "farm_profiles",
            })?;
        let total = farm.total_ratings as f64;
        farm.rating = (farm.rating * total + rating.stars as f64) / (total + 1.0);
        farm.total_ratings += 1;
        farm.updated_at = rating.created_at;

        inner.ratings.push(rating);
        Ok(())
    }

    async fn get_rating(
        &self,
        order_id: OrderId,
        farmer_id: UserId,
    ) -> Result<Option<RatingRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .ratings
            .iter()
            .find(|r| r.order_id == order_id && r.farmer_id == farmer_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Money, OrderItemId, RatingId};
    use domain::{ProductDetails, Role};

    fn profile(role: Role) -> ProfileRecord {
        let now = Utc::now();
        ProfileRecord {
            id: UserId::new(),
            email: format!("{}@example.com", UserId::new()),
            full_name: "Test User".to_string(),
            phone: None,
            avatar_url: None,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    fn product(farmer_id: UserId, stock: u32) -> ProductRecord {
        let now = Utc::now();
        ProductRecord {
            id: ProductId::new(),
            farmer_id,
            details: ProductDetails {
                name: "Okra".to_string(),
                description: None,
                price: Money::from_rupees(40),
                unit: "kg".to_string(),
                category: "vegetable".to_string(),
                quantity_available: stock,
                organic: false,
                is_active: true,
                image_url: None,
                freshness_date: None,
            },
            created_at: now,
            updated_at: now,
        }
    }

    fn order(consumer_id: UserId) -> OrderRecord {
        let now = Utc::now();
        OrderRecord {
            id: OrderId::new(),
            consumer_id,
            total_amount: Money::from_rupees(130),
            delivery_address: "12 Lakeview Road".to_string(),
            delivery_city: "Pune".to_string(),
            delivery_postal_code: "411001".to_string(),
            notes: None,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(order_id: OrderId, product_id: ProductId, farmer_id: UserId, qty: u32) -> OrderItemRecord {
        OrderItemRecord {
            id: OrderItemId::new(),
            order_id,
            product_id,
            farmer_id,
            quantity: qty,
            price_per_unit: Money::from_rupees(40),
            subtotal: Money::from_rupees(40).multiply(qty),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        let mut first = profile(Role::Consumer);
        first.email = "dup@example.com".to_string();
        let mut second = profile(Role::Consumer);
        second.email = "dup@example.com".to_string();

        store.insert_profile(first).await.unwrap();
        let result = store.insert_profile(second).await;
        assert!(matches!(result, Err(StoreError::Constraint { .. })));
    }

    #[tokio::test]
    async fn create_order_decrements_stock_and_clamps_at_zero() {
        let store = InMemoryStore::new();
        let farmer = profile(Role::Farmer);
        let consumer = profile(Role::Consumer);
        let farmer_id = farmer.id;
        let consumer_id = consumer.id;
        store.insert_profile(farmer).await.unwrap();
        store.insert_profile(consumer).await.unwrap();

        let prod = product(farmer_id, 3);
        let product_id = prod.id;
        store.insert_product(prod).await.unwrap();

        let ord = order(consumer_id);
        let order_id = ord.id;
        store
            .create_order(ord, vec![item(order_id, product_id, farmer_id, 5)])
            .await
            .unwrap();

        let stored = store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(stored.details.quantity_available, 0);
    }

    #[tokio::test]
    async fn create_order_with_missing_product_writes_nothing() {
        let store = InMemoryStore::new();
        let farmer = profile(Role::Farmer);
        let consumer = profile(Role::Consumer);
        let farmer_id = farmer.id;
        let consumer_id = consumer.id;
        store.insert_profile(farmer).await.unwrap();
        store.insert_profile(consumer).await.unwrap();

        let prod = product(farmer_id, 10);
        let product_id = prod.id;
        store.insert_product(prod).await.unwrap();

        let ord = order(consumer_id);
        let order_id = ord.id;
        let items = vec![
            item(order_id, product_id, farmer_id, 2),
            item(order_id, ProductId::new(), farmer_id, 1), // dangling
        ];

        let result = store.create_order(ord, items).await;
        assert!(matches!(result, Err(StoreError::Constraint { .. })));

        // No partial writes: no order, no items, stock untouched.
        assert!(store.get_order(order_id).await.unwrap().is_none());
        assert!(store.list_order_items(order_id).await.unwrap().is_empty());
        let stored = store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(stored.details.quantity_available, 10);
    }

    #[tokio::test]
    async fn referenced_product_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let farmer = profile(Role::Farmer);
        let consumer = profile(Role::Consumer);
        let farmer_id = farmer.id;
        let consumer_id = consumer.id;
        store.insert_profile(farmer).await.unwrap();
        store.insert_profile(consumer).await.unwrap();

        let prod = product(farmer_id, 10);
        let product_id = prod.id;
        store.insert_product(prod).await.unwrap();

        let ord = order(consumer_id);
        let order_id = ord.id;
        store
            .create_order(ord, vec![item(order_id, product_id, farmer_id, 1)])
            .await
            .unwrap();

        let result = store.delete_product(product_id).await;
        assert!(matches!(result, Err(StoreError::Constraint { .. })));
    }

    #[tokio::test]
    async fn rating_rolls_into_farm_average() {
        let store = InMemoryStore::new();
        let farmer = profile(Role::Farmer);
        let consumer = profile(Role::Consumer);
        let farmer_id = farmer.id;
        let consumer_id = consumer.id;
        store.insert_profile(farmer).await.unwrap();
        store.insert_profile(consumer).await.unwrap();

        let now = Utc::now();
        store
            .upsert_farm_profile(FarmProfileRecord {
                farmer_id,
                farm_name: "Green Acres".to_string(),
                farm_address: "NH-48".to_string(),
                farm_description: None,
                farm_size: None,
                organic_certified: false,
                rating: 0.0,
                total_ratings: 0,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        for (order_id, stars) in [(OrderId::new(), 4), (OrderId::new(), 2)] {
            store
                .insert_rating(RatingRecord {
                    id: RatingId::new(),
                    order_id,
                    consumer_id,
                    farmer_id,
                    stars,
                    review: None,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let farm = store.get_farm_profile(farmer_id).await.unwrap().unwrap();
        assert_eq!(farm.total_ratings, 2);
        assert!((farm.rating - 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn duplicate_rating_for_same_order_and_farmer_is_rejected() {
        let store = InMemoryStore::new();
        let farmer = profile(Role::Farmer);
        let consumer = profile(Role::Consumer);
        let farmer_id = farmer.id;
        let consumer_id = consumer.id;
        store.insert_profile(farmer).await.unwrap();
        store.insert_profile(consumer).await.unwrap();

        let now = Utc::now();
        store
            .upsert_farm_profile(FarmProfileRecord {
                farmer_id,
                farm_name: "Green Acres".to_string(),
                farm_address: "NH-48".to_string(),
                farm_description: None,
                farm_size: None,
                organic_certified: false,
                rating: 0.0,
                total_ratings: 0,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let order_id = OrderId::new();
        let rating = RatingRecord {
            id: RatingId::new(),
            order_id,
            consumer_id,
            farmer_id,
            stars: 5,
            review: None,
            created_at: Utc::now(),
        };
        store.insert_rating(rating.clone()).await.unwrap();

        let result = store
            .insert_rating(RatingRecord {
                id: RatingId::new(),
                ..rating
            })
            .await;
        assert!(matches!(result, Err(StoreError::Constraint { .. })));
    }
}

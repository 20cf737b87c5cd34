use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    Money, OrderId, OrderItemId, ProductId, RatingId, ResponseId, TicketId, UserId,
};
use domain::{OrderStatus, Priority, ProductDetails, Role, TicketStatus};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::records::{
    DeliveryProfileRecord, FarmProfileRecord, IncomingOrderItem, OrderItemRecord, OrderRecord,
    ProductRecord, ProfileRecord, RatingRecord, TicketRecord, TicketResponseRecord,
};
use crate::{MarketStore, Result, StoreError};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

/// Maps constraint violations onto `StoreError::Constraint` so callers can
/// tell a broken invariant from an unreachable database.
fn map_db_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && let Some(constraint) = db_err.constraint()
    {
        return StoreError::Constraint {
            constraint: constraint.to_string(),
        };
    }
    StoreError::Database(e)
}

fn parse_status<T: std::str::FromStr<Err = String>>(
    column: &'static str,
    value: String,
) -> Result<T> {
    value
        .parse()
        .map_err(|message| StoreError::Decode { column, message })
}

fn row_to_profile(row: PgRow) -> Result<ProfileRecord> {
    Ok(ProfileRecord {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        phone: row.try_get("phone")?,
        avatar_url: row.try_get("avatar_url")?,
        role: parse_status("role", row.try_get::<String, _>("role")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_farm_profile(row: PgRow) -> Result<FarmProfileRecord> {
    Ok(FarmProfileRecord {
        farmer_id: UserId::from_uuid(row.try_get::<Uuid, _>("farmer_id")?),
        farm_name: row.try_get("farm_name")?,
        farm_address: row.try_get("farm_address")?,
        farm_description: row.try_get("farm_description")?,
        farm_size: row.try_get("farm_size")?,
        organic_certified: row.try_get("organic_certified")?,
        rating: row.try_get("rating")?,
        total_ratings: row.try_get::<i32, _>("total_ratings")? as u32,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_delivery_profile(row: PgRow) -> Result<DeliveryProfileRecord> {
    Ok(DeliveryProfileRecord {
        consumer_id: UserId::from_uuid(row.try_get::<Uuid, _>("consumer_id")?),
        delivery_address: row.try_get("delivery_address")?,
        city: row.try_get("city")?,
        postal_code: row.try_get("postal_code")?,
        preferences: row.try_get("preferences")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_product(row: PgRow) -> Result<ProductRecord> {
    Ok(ProductRecord {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        farmer_id: UserId::from_uuid(row.try_get::<Uuid, _>("farmer_id")?),
        details: ProductDetails {
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_paise(row.try_get("price")?),
            unit: row.try_get("unit")?,
            category: row.try_get("category")?,
            quantity_available: row.try_get::<i32, _>("quantity_available")? as u32,
            organic: row.try_get("organic")?,
            is_active: row.try_get("is_active")?,
            image_url: row.try_get("image_url")?,
            freshness_date: row.try_get("freshness_date")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: PgRow) -> Result<OrderRecord> {
    Ok(OrderRecord {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        consumer_id: UserId::from_uuid(row.try_get::<Uuid, _>("consumer_id")?),
        total_amount: Money::from_paise(row.try_get("total_amount")?),
        delivery_address: row.try_get("delivery_address")?,
        delivery_city: row.try_get("delivery_city")?,
        delivery_postal_code: row.try_get("delivery_postal_code")?,
        notes: row.try_get("notes")?,
        status: parse_status("status", row.try_get::<String, _>("status")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_item(row: &PgRow) -> Result<OrderItemRecord> {
    Ok(OrderItemRecord {
        id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        farmer_id: UserId::from_uuid(row.try_get::<Uuid, _>("farmer_id")?),
        quantity: row.try_get::<i32, _>("quantity")? as u32,
        price_per_unit: Money::from_paise(row.try_get("price_per_unit")?),
        subtotal: Money::from_paise(row.try_get("subtotal")?),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_ticket(row: PgRow) -> Result<TicketRecord> {
    Ok(TicketRecord {
        id: TicketId::from_uuid(row.try_get::<Uuid, _>("id")?),
        requester_id: UserId::from_uuid(row.try_get::<Uuid, _>("requester_id")?),
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        priority: parse_status("priority", row.try_get::<String, _>("priority")?)?,
        status: parse_status("status", row.try_get::<String, _>("status")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_response(row: PgRow) -> Result<TicketResponseRecord> {
    Ok(TicketResponseRecord {
        id: ResponseId::from_uuid(row.try_get::<Uuid, _>("id")?),
        ticket_id: TicketId::from_uuid(row.try_get::<Uuid, _>("ticket_id")?),
        author_id: UserId::from_uuid(row.try_get::<Uuid, _>("author_id")?),
        message: row.try_get("message")?,
        is_staff: row.try_get("is_staff")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_rating(row: PgRow) -> Result<RatingRecord> {
    Ok(RatingRecord {
        id: RatingId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        consumer_id: UserId::from_uuid(row.try_get::<Uuid, _>("consumer_id")?),
        farmer_id: UserId::from_uuid(row.try_get::<Uuid, _>("farmer_id")?),
        stars: row.try_get::<i16, _>("stars")? as u8,
        review: row.try_get("review")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl MarketStore for PostgresStore {
    async fn insert_profile(&self, profile: ProfileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, full_name, phone, avatar_url, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.phone)
        .bind(&profile.avatar_url)
        .bind(profile.role.as_str())
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<ProfileRecord>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_profile).transpose()
    }

    async fn get_profile_by_email(&self, email: &str) -> Result<Option<ProfileRecord>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_profile).transpose()
    }

    async fn upsert_farm_profile(&self, profile: FarmProfileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO farm_profiles
                (farmer_id, farm_name, farm_address, farm_description, farm_size,
                 organic_certified, rating, total_ratings, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (farmer_id) DO UPDATE SET
                farm_name = EXCLUDED.farm_name,
                farm_address = EXCLUDED.farm_address,
                farm_description = EXCLUDED.farm_description,
                farm_size = EXCLUDED.farm_size,
                organic_certified = EXCLUDED.organic_certified,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(profile.farmer_id.as_uuid())
        .bind(&profile.farm_name)
        .bind(&profile.farm_address)
        .bind(&profile.farm_description)
        .bind(&profile.farm_size)
        .bind(profile.organic_certified)
        .bind(profile.rating)
        .bind(profile.total_ratings as i32)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_farm_profile(&self, farmer_id: UserId) -> Result<Option<FarmProfileRecord>> {
        let row = sqlx::query("SELECT * FROM farm_profiles WHERE farmer_id = $1")
            .bind(farmer_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_farm_profile).transpose()
    }

    async fn upsert_delivery_profile(&self, profile: DeliveryProfileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO delivery_profiles
                (consumer_id, delivery_address, city, postal_code, preferences, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (consumer_id) DO UPDATE SET
                delivery_address = EXCLUDED.delivery_address,
                city = EXCLUDED.city,
                postal_code = EXCLUDED.postal_code,
                preferences = EXCLUDED.preferences,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(profile.consumer_id.as_uuid())
        .bind(&profile.delivery_address)
        .bind(&profile.city)
        .bind(&profile.postal_code)
        .bind(&profile.preferences)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_delivery_profile(
        &self,
        consumer_id: UserId,
    ) -> Result<Option<DeliveryProfileRecord>> {
        let row = sqlx::query("SELECT * FROM delivery_profiles WHERE consumer_id = $1")
            .bind(consumer_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_delivery_profile).transpose()
    }

    async fn insert_product(&self, product: ProductRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, farmer_id, name, description, price, unit, category,
                 quantity_available, organic, is_active, image_url, freshness_date,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.farmer_id.as_uuid())
        .bind(&product.details.name)
        .bind(&product.details.description)
        .bind(product.details.price.paise())
        .bind(&product.details.unit)
        .bind(&product.details.category)
        .bind(product.details.quantity_available as i32)
        .bind(product.details.organic)
        .bind(product.details.is_active)
        .bind(&product.details.image_url)
        .bind(product.details.freshness_date)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn update_product(&self, product: ProductRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = $2, description = $3, price = $4, unit = $5, category = $6,
                quantity_available = $7, organic = $8, is_active = $9,
                image_url = $10, freshness_date = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.details.name)
        .bind(&product.details.description)
        .bind(product.details.price.paise())
        .bind(&product.details.unit)
        .bind(&product.details.category)
        .bind(product.details.quantity_available as i32)
        .bind(product.details.organic)
        .bind(product.details.is_active)
        .bind(&product.details.image_url)
        .bind(product.details.freshness_date)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { table: "products" });
        }
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { table: "products" });
        }
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_product).transpose()
    }

    async fn list_products_by_farmer(&self, farmer_id: UserId) -> Result<Vec<ProductRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM products WHERE farmer_id = $1 ORDER BY created_at DESC",
        )
        .bind(farmer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_product).collect()
    }

    async fn list_purchasable_products(&self) -> Result<Vec<ProductRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM products
            WHERE is_active AND quantity_available > 0
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_product).collect()
    }

    async fn create_order(&self, order: OrderRecord, items: Vec<OrderItemRecord>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders
                (id, consumer_id, total_amount, delivery_address, delivery_city,
                 delivery_postal_code, notes, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.consumer_id.as_uuid())
        .bind(order.total_amount.paise())
        .bind(&order.delivery_address)
        .bind(&order.delivery_city)
        .bind(&order.delivery_postal_code)
        .bind(&order.notes)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO order_items
                    (id, order_id, product_id, farmer_id, quantity, price_per_unit, subtotal, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.farmer_id.as_uuid())
            .bind(item.quantity as i32)
            .bind(item.price_per_unit.paise())
            .bind(item.subtotal.paise())
            .bind(item.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

            // Stock is clamped at zero, not a reservation system.
            sqlx::query(
                r#"
                UPDATE products
                SET quantity_available = GREATEST(quantity_available - $2, 0),
                    updated_at = $3
                WHERE id = $1
                "#,
            )
            .bind(item.product_id.as_uuid())
            .bind(item.quantity as i32)
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_order).transpose()
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at ASC",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_order_item).collect()
    }

    async fn list_orders_for_consumer(&self, consumer_id: UserId) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE consumer_id = $1 ORDER BY created_at DESC",
        )
        .bind(consumer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_order).collect()
    }

    async fn list_incoming_for_farmer(
        &self,
        farmer_id: UserId,
    ) -> Result<Vec<IncomingOrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, oi.farmer_id, oi.quantity,
                   oi.price_per_unit, oi.subtotal, oi.created_at,
                   p.name AS product_name,
                   o.status AS order_status,
                   o.delivery_address, o.delivery_city,
                   o.created_at AS placed_at
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE oi.farmer_id = $1
            ORDER BY o.created_at DESC
            "#,
        )
        .bind(farmer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(IncomingOrderItem {
                    item: row_to_order_item(row)?,
                    product_name: row.try_get("product_name")?,
                    status: parse_status(
                        "order_status",
                        row.try_get::<String, _>("order_status")?,
                    )?,
                    delivery_address: row.try_get("delivery_address")?,
                    delivery_city: row.try_get("delivery_city")?,
                    placed_at: row.try_get("placed_at")?,
                })
            })
            .collect()
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { table: "orders" });
        }
        Ok(())
    }

    async fn insert_ticket(&self, ticket: TicketRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO support_tickets
                (id, requester_id, subject, message, priority, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(ticket.id.as_uuid())
        .bind(ticket.requester_id.as_uuid())
        .bind(&ticket.subject)
        .bind(&ticket.message)
        .bind(ticket.priority.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<TicketRecord>> {
        let row = sqlx::query("SELECT * FROM support_tickets WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_ticket).transpose()
    }

    async fn list_tickets_for_requester(&self, requester_id: UserId) -> Result<Vec<TicketRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM support_tickets WHERE requester_id = $1 ORDER BY created_at DESC",
        )
        .bind(requester_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_ticket).collect()
    }

    async fn update_ticket_status(
        &self,
        id: TicketId,
        status: TicketStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE support_tickets SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: "support_tickets",
            });
        }
        Ok(())
    }

    async fn insert_ticket_response(&self, response: TicketResponseRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ticket_responses (id, ticket_id, author_id, message, is_staff, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(response.id.as_uuid())
        .bind(response.ticket_id.as_uuid())
        .bind(response.author_id.as_uuid())
        .bind(&response.message)
        .bind(response.is_staff)
        .bind(response.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn list_ticket_responses(
        &self,
        ticket_id: TicketId,
    ) -> Result<Vec<TicketResponseRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM ticket_responses WHERE ticket_id = $1 ORDER BY created_at ASC",
        )
        .bind(ticket_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_response).collect()
    }

    async fn insert_rating(&self, rating: RatingRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO ratings (id, order_id, consumer_id, farmer_id, stars, review, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(rating.id.as_uuid())
        .bind(rating.order_id.as_uuid())
        .bind(rating.consumer_id.as_uuid())
        .bind(rating.farmer_id.as_uuid())
        .bind(rating.stars as i16)
        .bind(&rating.review)
        .bind(rating.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let result = sqlx::query(
            r#"
            UPDATE farm_profiles
            SET rating = (rating * total_ratings + $2) / (total_ratings + 1),
                total_ratings = total_ratings + 1,
                updated_at = $3
            WHERE farmer_id = $1
            "#,
        )
        .bind(rating.farmer_id.as_uuid())
        .bind(rating.stars as f64)
        .bind(rating.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: "farm_profiles",
            });
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_rating(
        &self,
        order_id: OrderId,
        farmer_id: UserId,
    ) -> Result<Option<RatingRecord>> {
        let row = sqlx::query(
            "SELECT * FROM ratings WHERE order_id = $1 AND farmer_id = $2",
        )
        .bind(order_id.as_uuid())
        .bind(farmer_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_rating).transpose()
    }
}

//! Product catalog service.
//!
//! Farmers manage their own listings; everyone browses the purchasable
//! ones. Search is a case-insensitive substring filter applied after the
//! fetch, matching the storefront's client-side filtering.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::ProductId;
use domain::{ProductDetails, ProductSnapshot, Role};
use store::{MarketStore, ProductRecord};

use crate::error::with_timeout;
use crate::identity::Session;
use crate::{DEFAULT_STORE_TIMEOUT, Result, ServiceError};

/// Service for product listings.
pub struct CatalogService<S> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: MarketStore> CatalogService<S> {
    /// Creates a catalog service with the default store timeout.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_timeout(store, DEFAULT_STORE_TIMEOUT)
    }

    /// Creates a catalog service with a custom store timeout.
    pub fn with_timeout(store: Arc<S>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    fn ensure_farmer(session: &Session) -> Result<()> {
        if session.role != Role::Farmer {
            return Err(ServiceError::Forbidden {
                reason: "only farmers manage products",
            });
        }
        Ok(())
    }

    /// Loads a product and checks the caller owns it.
    async fn owned_product(&self, session: &Session, id: ProductId) -> Result<ProductRecord> {
        let product = with_timeout(self.timeout, "get_product", self.store.get_product(id))
            .await?
            .ok_or(ServiceError::NotFound { what: "product" })?;
        if product.farmer_id != session.user_id {
            return Err(ServiceError::Forbidden {
                reason: "product belongs to another farmer",
            });
        }
        Ok(product)
    }

    /// Lists a new product owned by the calling farmer.
    #[tracing::instrument(skip(self, session, details), fields(farmer_id = %session.user_id))]
    pub async fn create_product(
        &self,
        session: &Session,
        details: ProductDetails,
    ) -> Result<ProductRecord> {
        Self::ensure_farmer(session)?;
        details.validate()?;

        let now = Utc::now();
        let product = ProductRecord {
            id: ProductId::new(),
            farmer_id: session.user_id,
            details,
            created_at: now,
            updated_at: now,
        };

        with_timeout(
            self.timeout,
            "insert_product",
            self.store.insert_product(product.clone()),
        )
        .await?;
        metrics::counter!("catalog_products_created").increment(1);
        Ok(product)
    }

    /// Replaces a listing's fields. Owner only.
    #[tracing::instrument(skip(self, session, details), fields(farmer_id = %session.user_id))]
    pub async fn update_product(
        &self,
        session: &Session,
        id: ProductId,
        details: ProductDetails,
    ) -> Result<ProductRecord> {
        Self::ensure_farmer(session)?;
        details.validate()?;

        let mut product = self.owned_product(session, id).await?;
        product.details = details;
        product.updated_at = Utc::now();

        with_timeout(
            self.timeout,
            "update_product",
            self.store.update_product(product.clone()),
        )
        .await?;
        Ok(product)
    }

    /// Hard-deletes a listing. Owner only.
    #[tracing::instrument(skip(self, session), fields(farmer_id = %session.user_id))]
    pub async fn delete_product(&self, session: &Session, id: ProductId) -> Result<()> {
        Self::ensure_farmer(session)?;
        self.owned_product(session, id).await?;
        with_timeout(
            self.timeout,
            "delete_product",
            self.store.delete_product(id),
        )
        .await
    }

    /// Lists the calling farmer's products, newest first.
    #[tracing::instrument(skip(self, session), fields(farmer_id = %session.user_id))]
    pub async fn my_products(&self, session: &Session) -> Result<Vec<ProductRecord>> {
        Self::ensure_farmer(session)?;
        with_timeout(
            self.timeout,
            "list_products_by_farmer",
            self.store.list_products_by_farmer(session.user_id),
        )
        .await
    }

    /// Fetches a single product by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<ProductRecord> {
        with_timeout(self.timeout, "get_product", self.store.get_product(id))
            .await?
            .ok_or(ServiceError::NotFound { what: "product" })
    }

    /// Lists every purchasable product, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn browse(&self) -> Result<Vec<ProductRecord>> {
        with_timeout(
            self.timeout,
            "list_purchasable_products",
            self.store.list_purchasable_products(),
        )
        .await
    }

    /// Browses with a substring filter over name and description.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<ProductRecord>> {
        let needle = query.trim().to_lowercase();
        let mut products = self.browse().await?;
        if needle.is_empty() {
            return Ok(products);
        }
        products.retain(|p| {
            p.details.name.to_lowercase().contains(&needle)
                || p.details
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        });
        Ok(products)
    }

    /// Captures a purchasable product into a cart snapshot.
    #[tracing::instrument(skip(self))]
    pub async fn snapshot_for_cart(&self, id: ProductId) -> Result<ProductSnapshot> {
        let product = self.get_product(id).await?;
        if !product.purchasable() {
            return Err(ServiceError::ProductUnavailable);
        }
        Ok(ProductSnapshot {
            product_id: product.id,
            name: product.details.name,
            price: product.details.price,
            unit: product.details.unit,
            image_url: product.details.image_url,
            farmer_id: Some(product.farmer_id),
        })
    }
}

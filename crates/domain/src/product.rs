//! Product listing rules.

use chrono::NaiveDate;
use common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The editable fields of a product listing.
///
/// Used for both create and update; the owning farmer and timestamps are
/// managed by the store layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub unit: String,
    pub category: String,
    pub quantity_available: u32,
    pub organic: bool,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub freshness_date: Option<NaiveDate>,
}

/// Errors raised by product validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductError {
    /// A required text field is blank.
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    /// Price must be strictly positive.
    #[error("invalid price: {price} (must be greater than zero)")]
    InvalidPrice { price: Money },
}

impl ProductDetails {
    /// Validates the listing fields.
    pub fn validate(&self) -> Result<(), ProductError> {
        for (field, value) in [
            ("name", &self.name),
            ("unit", &self.unit),
            ("category", &self.category),
        ] {
            if value.trim().is_empty() {
                return Err(ProductError::MissingField { field });
            }
        }
        if !self.price.is_positive() {
            return Err(ProductError::InvalidPrice { price: self.price });
        }
        Ok(())
    }

    /// A product is purchasable only while listed and in stock.
    pub fn purchasable(&self) -> bool {
        self.is_active && self.quantity_available > 0
    }
}

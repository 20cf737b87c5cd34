//! Checkout validation: turning a cart into order drafts.
//!
//! Building a [`CheckoutDraft`] performs every check that can be done
//! without the store. Writing the draft atomically is the store's job.

use common::{Money, OrderId, OrderItemId, ProductId, UserId};
use thiserror::Error;

use crate::cart::{Cart, DELIVERY_FEE};
use crate::order::OrderStatus;

/// Delivery information collected from the checkout form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryDetails {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub notes: Option<String>,
}

impl DeliveryDetails {
    fn validate(&self) -> Result<(), CheckoutError> {
        for (field, value) in [
            ("delivery_address", &self.address),
            ("delivery_city", &self.city),
            ("delivery_postal_code", &self.postal_code),
        ] {
            if value.trim().is_empty() {
                return Err(CheckoutError::MissingField { field });
            }
        }
        Ok(())
    }
}

/// The order row to be created at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub id: OrderId,
    pub consumer_id: UserId,
    pub total_amount: Money,
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_postal_code: String,
    pub notes: Option<String>,
    pub status: OrderStatus,
}

/// One order-item row to be created at checkout.
///
/// `price_per_unit` is captured from the cart snapshot and is immutable
/// afterwards, even if the catalog price later changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub farmer_id: UserId,
    pub quantity: u32,
    pub price_per_unit: Money,
    pub subtotal: Money,
}

/// A fully validated checkout: one order plus its line items.
///
/// The pair must be written in a single store transaction; a failure in
/// either leaves no rows behind.
#[derive(Debug, Clone)]
pub struct CheckoutDraft {
    pub order: NewOrder,
    pub items: Vec<NewOrderItem>,
}

/// Errors that block a checkout before any write is attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// An empty cart cannot be checked out.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart entry carries no resolvable seller id.
    #[error("product {product_id} is missing seller information")]
    MissingSeller { product_id: ProductId },

    /// A required delivery field is blank.
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
}

impl CheckoutDraft {
    /// Validates the cart and delivery details and builds the drafts.
    ///
    /// The order total is the cart subtotal plus the flat delivery fee;
    /// each item's subtotal is quantity × captured unit price.
    pub fn build(
        consumer_id: UserId,
        cart: &Cart,
        details: &DeliveryDetails,
    ) -> Result<CheckoutDraft, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        details.validate()?;

        let order_id = OrderId::new();
        let mut items = Vec::with_capacity(cart.len());
        for item in cart.items() {
            // Data integrity guard: every entry must name the seller that
            // will fulfil it, before anything is written.
            let Some(farmer_id) = item.product.farmer_id else {
                return Err(CheckoutError::MissingSeller {
                    product_id: item.product.product_id,
                });
            };
            items.push(NewOrderItem {
                id: OrderItemId::new(),
                order_id,
                product_id: item.product.product_id,
                farmer_id,
                quantity: item.quantity,
                price_per_unit: item.product.price,
                subtotal: item.line_total(),
            });
        }

        let order = NewOrder {
            id: order_id,
            consumer_id,
            total_amount: cart.subtotal() + DELIVERY_FEE,
            delivery_address: details.address.clone(),
            delivery_city: details.city.clone(),
            delivery_postal_code: details.postal_code.clone(),
            notes: details.notes.clone(),
            status: OrderStatus::Pending,
        };

        Ok(CheckoutDraft { order, items })
    }
}

//! Cart aggregate.
//!
//! The cart is client-local, ephemeral state: it never touches the store
//! and is destroyed on clear, on successful checkout, or with the session.
//! Quantities are advisory only; availability is not reserved here.

use common::{Money, ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Flat delivery fee added to every order, ₹50.00.
pub const DELIVERY_FEE: Money = Money::from_paise(5000);

/// The product fields captured into the cart at add time.
///
/// A snapshot, not a reference: the catalog row may change or disappear
/// while the cart still holds these values. `farmer_id` may be absent for
/// a stale snapshot; checkout rejects such entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub unit: String,
    pub image_url: Option<String>,
    pub farmer_id: Option<UserId>,
}

/// One cart entry: a product snapshot plus the requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: ProductSnapshot,
    pub quantity: u32,
}

impl CartItem {
    /// Returns price × quantity for this entry.
    pub fn line_total(&self) -> Money {
        self.product.price.multiply(self.quantity)
    }
}

/// Errors raised by cart mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Quantity must be at least 1.
    #[error("invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },
}

/// The consumer's in-progress selection.
///
/// Entries keep insertion order. All operations are synchronous and
/// infallible apart from the quantity floor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product to the cart.
    ///
    /// If the product is already present the quantity is incremented;
    /// otherwise a new entry is appended.
    pub fn add_item(&mut self, product: ProductSnapshot, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.product.product_id == product.product_id)
        {
            existing.quantity += quantity;
        } else {
            self.items.push(CartItem { product, quantity });
        }
        Ok(())
    }

    /// Removes an entry; no-op if the product is not in the cart.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.items
            .retain(|item| item.product.product_id != product_id);
    }

    /// Sets an entry's quantity, clamped to a minimum of 1.
    ///
    /// Going below 1 is only possible via [`Cart::remove_item`]. No-op if
    /// the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.product.product_id == product_id)
        {
            item.quantity = quantity.max(1);
        }
    }

    /// Empties the cart. Called after a successful checkout.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum over entries of price × quantity.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Subtotal plus the flat delivery fee.
    ///
    /// Defined for an empty cart too (it equals the fee), but checkout
    /// rejects empty carts so the fee-only total is never charged.
    pub fn total(&self) -> Money {
        self.subtotal() + DELIVERY_FEE
    }

    /// Returns the entry for a product, if present.
    pub fn get(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items
            .iter()
            .find(|item| item.product.product_id == product_id)
    }

    /// Iterates entries in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter()
    }

    /// Number of distinct products in the cart.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the cart has no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(price_paise: i64) -> ProductSnapshot {
        ProductSnapshot {
            product_id: ProductId::new(),
            name: "Tomatoes".to_string(),
            price: Money::from_paise(price_paise),
            unit: "kg".to_string(),
            image_url: None,
            farmer_id: Some(UserId::new()),
        }
    }

    #[test]
    fn add_item_appends_new_entry() {
        let mut cart = Cart::new();
        cart.add_item(snapshot(1000), 2).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.subtotal().paise(), 2000);
    }

    #[test]
    fn add_same_product_increments_quantity() {
        let mut cart = Cart::new();
        let product = snapshot(1000);
        let id = product.product_id;

        cart.add_item(product.clone(), 2).unwrap();
        cart.add_item(product, 3).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(id).unwrap().quantity, 5);
        assert_eq!(cart.subtotal().paise(), 5000);
    }

    #[test]
    fn add_zero_quantity_is_rejected() {
        let mut cart = Cart::new();
        let result = cart.add_item(snapshot(1000), 0);
        assert_eq!(result, Err(CartError::InvalidQuantity { quantity: 0 }));
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_item_deletes_entry() {
        let mut cart = Cart::new();
        let product = snapshot(1000);
        let id = product.product_id;
        cart.add_item(product, 2).unwrap();

        cart.remove_item(id);
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Money::zero());
    }

    #[test]
    fn remove_absent_item_is_a_noop() {
        let mut cart = Cart::new();
        cart.add_item(snapshot(1000), 1).unwrap();
        cart.remove_item(ProductId::new());
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn set_quantity_clamps_to_one() {
        let mut cart = Cart::new();
        let product = snapshot(1000);
        let id = product.product_id;
        cart.add_item(product, 5).unwrap();

        cart.set_quantity(id, 0);
        assert_eq!(cart.get(id).unwrap().quantity, 1);

        cart.set_quantity(id, 7);
        assert_eq!(cart.get(id).unwrap().quantity, 7);
    }

    #[test]
    fn subtotal_tracks_every_mutation() {
        let mut cart = Cart::new();
        let a = snapshot(5000);
        let b = snapshot(3000);
        let a_id = a.product_id;

        cart.add_item(a, 2).unwrap();
        cart.add_item(b, 1).unwrap();
        assert_eq!(cart.subtotal().paise(), 13000);

        cart.set_quantity(a_id, 1);
        assert_eq!(cart.subtotal().paise(), 8000);

        cart.remove_item(a_id);
        assert_eq!(cart.subtotal().paise(), 3000);
    }

    // Two kg of ₹50 tomatoes plus one ₹30 item, ₹50 delivery.
    #[test]
    fn totals_match_the_reference_scenario() {
        let mut cart = Cart::new();
        cart.add_item(snapshot(5000), 2).unwrap();
        cart.add_item(snapshot(3000), 1).unwrap();

        assert_eq!(cart.subtotal(), Money::from_rupees(130));
        assert_eq!(cart.total(), Money::from_rupees(180));
    }

    #[test]
    fn clear_empties_the_cart() {
        let mut cart = Cart::new();
        cart.add_item(snapshot(1000), 2).unwrap();
        cart.add_item(snapshot(2000), 1).unwrap();

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Money::zero());
        assert_eq!(cart.total(), DELIVERY_FEE);
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut cart = Cart::new();
        let first = snapshot(100);
        let second = snapshot(200);
        let third = snapshot(300);
        let ids = [first.product_id, second.product_id, third.product_id];

        cart.add_item(first, 1).unwrap();
        cart.add_item(second, 1).unwrap();
        cart.add_item(third, 1).unwrap();

        let seen: Vec<_> = cart.items().map(|i| i.product.product_id).collect();
        assert_eq!(seen, ids);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut cart = Cart::new();
        cart.add_item(snapshot(1234), 3).unwrap();

        let json = serde_json::to_string(&cart).unwrap();
        let deserialized: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(cart, deserialized);
    }
}

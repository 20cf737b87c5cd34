//! Domain layer for the farmers' marketplace.
//!
//! Everything here is pure and synchronous: the cart aggregate, the order
//! and support-ticket state machines, and the validation that turns a cart
//! plus delivery details into order drafts. Persistence and authorization
//! live in the `store` and `services` crates.

pub mod cart;
pub mod checkout;
pub mod order;
pub mod product;
pub mod role;
pub mod ticket;

pub use cart::{Cart, CartError, CartItem, DELIVERY_FEE, ProductSnapshot};
pub use checkout::{CheckoutDraft, CheckoutError, DeliveryDetails, NewOrder, NewOrderItem};
pub use order::{OrderError, OrderStatus, check_transition};
pub use product::{ProductDetails, ProductError};
pub use role::Role;
pub use ticket::{
    Priority, TicketError, TicketStatus, validate_new_ticket, validate_response,
};

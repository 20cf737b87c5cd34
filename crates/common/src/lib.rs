//! Shared primitives used by every marketplace crate.
//!
//! Typed identifiers prevent mixing up the many Uuid-keyed rows
//! (users, products, orders, tickets), and [`Money`] keeps all amounts
//! in integer paise.

mod ids;
mod money;

pub use ids::{OrderId, OrderItemId, ProductId, RatingId, ResponseId, TicketId, UserId};
pub use money::Money;

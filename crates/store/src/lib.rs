//! Storage layer for the marketplace.
//!
//! The [`MarketStore`] trait is the table/column contract from the data
//! model; any relational or key-value backend satisfying it is
//! substitutable. Two implementations ship here: [`InMemoryStore`] for
//! tests and the default server, and [`PostgresStore`] backed by sqlx.
//!
//! The one multi-row write, [`MarketStore::create_order`], is atomic in
//! both implementations: a single SQL transaction in PostgreSQL, a single
//! write-lock critical section in memory.

mod error;
mod memory;
mod postgres;
mod records;
mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use records::{
    DeliveryProfileRecord, FarmProfileRecord, IncomingOrderItem, OrderItemRecord, OrderRecord,
    ProductRecord, ProfileRecord, RatingRecord, TicketRecord, TicketResponseRecord,
};
pub use store::MarketStore;

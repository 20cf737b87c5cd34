//! Application services for the marketplace.
//!
//! Each service wraps the [`store::MarketStore`] behind a typed API that
//! enforces the domain rules: who may do what, which state transitions
//! are legal, and what gets written atomically. Expected failures are
//! `Err` values, never panics; every store round-trip runs under an
//! explicit timeout.

pub mod catalog;
pub mod error;
pub mod identity;
pub mod orders;
pub mod ratings;
pub mod support;

pub use catalog::CatalogService;
pub use error::{Result, ServiceError};
pub use identity::{
    AuthEvent, AuthObserver, DeliveryPreferences, FarmDetails, IdentityError, InMemorySessions,
    Session, SessionProvider, SessionToken, SignUpRequest,
};
pub use orders::{ConsumerOrderStats, OrderService, OrderWithItems};
pub use ratings::{RatingError, RatingService};
pub use support::SupportService;

use std::time::Duration;

/// Default ceiling for a single store round-trip.
///
/// A stalled remote call surfaces as [`ServiceError::Timeout`] instead of
/// leaving the caller hanging.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

use std::future::Future;
use std::time::Duration;

use store::StoreError;
use thiserror::Error;

use crate::ratings::RatingError;

/// Errors surfaced by the application services.
///
/// Validation variants block the action synchronously; store variants are
/// reported with their cause and never retried automatically.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Cart validation failed.
    #[error(transparent)]
    Cart(#[from] domain::CartError),

    /// Checkout validation failed; nothing was written.
    #[error(transparent)]
    Checkout(#[from] domain::CheckoutError),

    /// An order status transition was rejected.
    #[error(transparent)]
    Order(#[from] domain::OrderError),

    /// A ticket operation was rejected.
    #[error(transparent)]
    Ticket(#[from] domain::TicketError),

    /// A product listing failed validation.
    #[error(transparent)]
    Product(#[from] domain::ProductError),

    /// A rating was rejected.
    #[error(transparent)]
    Rating(#[from] RatingError),

    /// The product exists but is inactive or out of stock.
    #[error("product is not available for purchase")]
    ProductUnavailable,

    /// The caller's role does not permit the action.
    #[error("forbidden: {reason}")]
    Forbidden { reason: &'static str },

    /// The targeted entity does not exist.
    #[error("{what} not found")]
    NotFound { what: &'static str },

    /// The backing store reported a failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The store did not answer within the configured deadline.
    #[error("store call timed out during {operation}")]
    Timeout { operation: &'static str },
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Runs a store call under a deadline.
pub(crate) async fn with_timeout<T, F>(
    timeout: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T>
where
    F: Future<Output = store::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(ServiceError::from),
        Err(_) => Err(ServiceError::Timeout { operation }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_converts_a_stalled_call() {
        let result: Result<()> = with_timeout(
            Duration::from_millis(10),
            "stalled_read",
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(ServiceError::Timeout {
                operation: "stalled_read"
            })
        ));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let result: Result<u32> =
            with_timeout(Duration::from_secs(1), "read", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}

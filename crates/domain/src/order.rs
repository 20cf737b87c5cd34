//! Order lifecycle state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──► Confirmed ──► Preparing ──► Ready ──► OutForDelivery ──► Delivered
///    │            │             │           │              │
///    └────────────┴─────────────┴───────────┴──────────────┴──► Cancelled
/// ```
///
/// Fulfilment only moves forward one step at a time; `Cancelled` is
/// reachable from every non-terminal status. Skipping steps is reserved
/// for an explicitly authorized admin override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, awaiting farmer confirmation.
    #[default]
    Pending,

    /// A farmer has accepted the order.
    Confirmed,

    /// Produce is being gathered and packed.
    Preparing,

    /// Packed and waiting for pickup.
    Ready,

    /// Handed to delivery.
    OutForDelivery,

    /// Delivered to the consumer (terminal).
    Delivered,

    /// Order was cancelled (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Returns the next status in the fulfilment sequence, if any.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::OutForDelivery),
            OrderStatus::OutForDelivery => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// Returns true if `new` is a legal transition from this status.
    ///
    /// Legal means the single next step forward, or cancellation from any
    /// non-terminal status.
    pub fn can_transition_to(&self, new: OrderStatus) -> bool {
        if new == OrderStatus::Cancelled {
            return !self.is_terminal();
        }
        self.next() == Some(new)
    }

    /// Returns true if the order can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this is a terminal status (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns true while the order counts toward a consumer's active orders.
    ///
    /// Matches the dashboard definition: placed but not yet in preparation.
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    /// Returns the wire name as stored in the `orders` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "out_for_delivery" => Ok(OrderStatus::OutForDelivery),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Errors raised by order status transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// The requested transition is not the next forward step.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The order is already in a terminal status.
    #[error("order is already {status}, no further transitions allowed")]
    AlreadyTerminal { status: OrderStatus },
}

/// Validates a regular (non-override) status transition.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
    if from.is_terminal() {
        return Err(OrderError::AlreadyTerminal { status: from });
    }
    if !from.can_transition_to(to) {
        return Err(OrderError::InvalidTransition { from, to });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQUENCE: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ];

    #[test]
    fn default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn forward_steps_follow_the_sequence() {
        for pair in SEQUENCE.windows(2) {
            assert_eq!(pair[0].next(), Some(pair[1]));
            assert!(pair[0].can_transition_to(pair[1]));
        }
        assert_eq!(OrderStatus::Delivered.next(), None);
        assert_eq!(OrderStatus::Cancelled.next(), None);
    }

    #[test]
    fn skipping_states_is_rejected() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Preparing));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Ready));
        assert_eq!(
            check_transition(OrderStatus::Pending, OrderStatus::Delivered),
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered,
            })
        );
    }

    #[test]
    fn backward_steps_are_rejected() {
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::OutForDelivery));
    }

    #[test]
    fn cancel_from_any_non_terminal_state() {
        for status in SEQUENCE.iter().take(5) {
            assert!(status.can_cancel(), "{status} should be cancellable");
            assert!(status.can_transition_to(OrderStatus::Cancelled));
        }
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn terminal_states_reject_everything() {
        for terminal in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            for target in SEQUENCE {
                assert_eq!(
                    check_transition(terminal, target),
                    Err(OrderError::AlreadyTerminal { status: terminal })
                );
            }
            assert_eq!(
                check_transition(terminal, OrderStatus::Cancelled),
                Err(OrderError::AlreadyTerminal { status: terminal })
            );
        }
    }

    #[test]
    fn active_statuses() {
        assert!(OrderStatus::Pending.is_active());
        assert!(OrderStatus::Confirmed.is_active());
        assert!(!OrderStatus::Preparing.is_active());
        assert!(!OrderStatus::Delivered.is_active());
    }

    #[test]
    fn wire_name_roundtrip() {
        for status in SEQUENCE.into_iter().chain([OrderStatus::Cancelled]) {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
    }
}

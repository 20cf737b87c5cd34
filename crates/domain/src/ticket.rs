//! Support ticket lifecycle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of a support ticket.
///
/// Status transitions (staff-driven, forward only):
/// ```text
/// Open ──► InProgress ──► Resolved ──► Closed
///   │           │                        ▲
///   └───────────┴────────────────────────┘
/// ```
///
/// Responses may be appended by either party while the ticket is not
/// resolved or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Newly created, awaiting staff attention.
    #[default]
    Open,

    /// Staff is working on it.
    InProgress,

    /// Staff considers the issue addressed (terminal for responses).
    Resolved,

    /// Conversation is closed for good (terminal).
    Closed,
}

impl TicketStatus {
    /// Returns true while responses may still be appended.
    pub fn accepts_responses(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true for statuses that end the conversation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }

    /// Returns true if staff may move the ticket to `new`.
    ///
    /// Only forward moves are allowed; a closed ticket never reopens.
    pub fn can_transition_to(&self, new: TicketStatus) -> bool {
        match self {
            TicketStatus::Open => matches!(
                new,
                TicketStatus::InProgress | TicketStatus::Resolved | TicketStatus::Closed
            ),
            TicketStatus::InProgress => {
                matches!(new, TicketStatus::Resolved | TicketStatus::Closed)
            }
            TicketStatus::Resolved => matches!(new, TicketStatus::Closed),
            TicketStatus::Closed => false,
        }
    }

    /// Returns the wire name as stored in the `support_tickets` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

/// Ticket priority chosen by the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Errors raised by ticket operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicketError {
    /// A required text field is blank.
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    /// The conversation has ended.
    #[error("ticket is {status}; no further responses accepted")]
    ConversationEnded { status: TicketStatus },

    /// The requested status move is not allowed.
    #[error("invalid ticket transition: {from} -> {to}")]
    InvalidTransition {
        from: TicketStatus,
        to: TicketStatus,
    },
}

/// Validates a new ticket's subject and initial message.
pub fn validate_new_ticket(subject: &str, message: &str) -> Result<(), TicketError> {
    if subject.trim().is_empty() {
        return Err(TicketError::MissingField { field: "subject" });
    }
    if message.trim().is_empty() {
        return Err(TicketError::MissingField { field: "message" });
    }
    Ok(())
}

/// Validates appending a response to a ticket in the given status.
pub fn validate_response(status: TicketStatus, message: &str) -> Result<(), TicketError> {
    if !status.accepts_responses() {
        return Err(TicketError::ConversationEnded { status });
    }
    if message.trim().is_empty() {
        return Err(TicketError::MissingField { field: "message" });
    }
    Ok(())
}

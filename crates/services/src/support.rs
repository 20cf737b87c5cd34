//! Support ticket service.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{ResponseId, TicketId};
use domain::{Priority, TicketError, TicketStatus, validate_new_ticket, validate_response};
use store::{MarketStore, TicketRecord, TicketResponseRecord};

use crate::error::with_timeout;
use crate::identity::Session;
use crate::{DEFAULT_STORE_TIMEOUT, Result, ServiceError};

/// Service for the two-party support conversation.
pub struct SupportService<S> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: MarketStore> SupportService<S> {
    /// Creates a support service with the default store timeout.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_timeout(store, DEFAULT_STORE_TIMEOUT)
    }

    /// Creates a support service with a custom store timeout.
    pub fn with_timeout(store: Arc<S>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Opens a new ticket for the calling user.
    #[tracing::instrument(skip(self, session, subject, message), fields(requester_id = %session.user_id))]
    pub async fn create_ticket(
        &self,
        session: &Session,
        subject: &str,
        message: &str,
        priority: Priority,
    ) -> Result<TicketRecord> {
        validate_new_ticket(subject, message)?;

        let now = Utc::now();
        let ticket = TicketRecord {
            id: TicketId::new(),
            requester_id: session.user_id,
            subject: subject.trim().to_string(),
            message: message.trim().to_string(),
            priority,
            status: TicketStatus::Open,
            created_at: now,
            updated_at: now,
        };

        with_timeout(
            self.timeout,
            "insert_ticket",
            self.store.insert_ticket(ticket.clone()),
        )
        .await?;
        metrics::counter!("tickets_opened").increment(1);
        Ok(ticket)
    }

    /// Lists the calling user's tickets, newest first.
    #[tracing::instrument(skip(self, session), fields(requester_id = %session.user_id))]
    pub async fn my_tickets(&self, session: &Session) -> Result<Vec<TicketRecord>> {
        with_timeout(
            self.timeout,
            "list_tickets_for_requester",
            self.store.list_tickets_for_requester(session.user_id),
        )
        .await
    }

    /// Fetches a ticket and its responses in display order (oldest first).
    #[tracing::instrument(skip(self, session))]
    pub async fn ticket_thread(
        &self,
        session: &Session,
        id: TicketId,
    ) -> Result<(TicketRecord, Vec<TicketResponseRecord>)> {
        let ticket = self.accessible_ticket(session, id).await?;
        let responses = with_timeout(
            self.timeout,
            "list_ticket_responses",
            self.store.list_ticket_responses(id),
        )
        .await?;
        Ok((ticket, responses))
    }

    /// Appends a response while the conversation is still open.
    ///
    /// The staff flag derives from the author's role, never from input.
    #[tracing::instrument(skip(self, session, message))]
    pub async fn respond(
        &self,
        session: &Session,
        id: TicketId,
        message: &str,
    ) -> Result<TicketResponseRecord> {
        let ticket = self.accessible_ticket(session, id).await?;
        validate_response(ticket.status, message)?;

        let response = TicketResponseRecord {
            id: ResponseId::new(),
            ticket_id: id,
            author_id: session.user_id,
            message: message.trim().to_string(),
            is_staff: session.role.is_staff(),
            created_at: Utc::now(),
        };

        with_timeout(
            self.timeout,
            "insert_ticket_response",
            self.store.insert_ticket_response(response.clone()),
        )
        .await?;
        Ok(response)
    }

    /// Moves a ticket forward. Staff only.
    #[tracing::instrument(skip(self, session), fields(actor = %session.user_id))]
    pub async fn advance_ticket(
        &self,
        session: &Session,
        id: TicketId,
        new_status: TicketStatus,
    ) -> Result<TicketRecord> {
        if !session.role.is_staff() {
            return Err(ServiceError::Forbidden {
                reason: "only staff move tickets",
            });
        }

        let mut ticket = with_timeout(self.timeout, "get_ticket", self.store.get_ticket(id))
            .await?
            .ok_or(ServiceError::NotFound { what: "ticket" })?;

        if !ticket.status.can_transition_to(new_status) {
            return Err(TicketError::InvalidTransition {
                from: ticket.status,
                to: new_status,
            }
            .into());
        }

        let now = Utc::now();
        with_timeout(
            self.timeout,
            "update_ticket_status",
            self.store.update_ticket_status(id, new_status, now),
        )
        .await?;

        ticket.status = new_status;
        ticket.updated_at = now;
        Ok(ticket)
    }

    /// Loads a ticket the caller may see: its requester or staff.
    async fn accessible_ticket(&self, session: &Session, id: TicketId) -> Result<TicketRecord> {
        let ticket = with_timeout(self.timeout, "get_ticket", self.store.get_ticket(id))
            .await?
            .ok_or(ServiceError::NotFound { what: "ticket" })?;
        if ticket.requester_id != session.user_id && !session.role.is_staff() {
            return Err(ServiceError::Forbidden {
                reason: "not a party to this ticket",
            });
        }
        Ok(ticket)
    }
}

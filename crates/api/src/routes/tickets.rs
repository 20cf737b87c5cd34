//! Support ticket endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::TicketId;
use domain::{Priority, TicketStatus};
use serde::{Deserialize, Serialize};
use store::{MarketStore, TicketRecord, TicketResponseRecord};

use super::{AppState, require_session};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub message: String,
}

#[derive(Deserialize)]
pub struct TicketStatusRequest {
    pub status: TicketStatus,
}

// -- Response types --

#[derive(Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub subject: String,
    pub message: String,
    pub priority: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&TicketRecord> for TicketResponse {
    fn from(ticket: &TicketRecord) -> Self {
        Self {
            id: ticket.id.to_string(),
            subject: ticket.subject.clone(),
            message: ticket.message.clone(),
            priority: ticket.priority.to_string(),
            status: ticket.status.to_string(),
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct ThreadMessageResponse {
    pub id: String,
    pub author_id: String,
    pub message: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&TicketResponseRecord> for ThreadMessageResponse {
    fn from(response: &TicketResponseRecord) -> Self {
        Self {
            id: response.id.to_string(),
            author_id: response.author_id.to_string(),
            message: response.message.clone(),
            is_staff: response.is_staff,
            created_at: response.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ThreadResponse {
    pub ticket: TicketResponse,
    pub responses: Vec<ThreadMessageResponse>,
}

fn parse_ticket_id(id: &str) -> Result<TicketId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid ticket id: {id}")))
}

// -- Handlers --

/// GET /tickets — the calling user's tickets, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<TicketResponse>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let tickets = state.support.my_tickets(&session).await?;
    Ok(Json(tickets.iter().map(Into::into).collect()))
}

/// POST /tickets — open a new ticket.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let session = require_session(&state, &headers).await?;
    let ticket = state
        .support
        .create_ticket(&session, &req.subject, &req.message, req.priority)
        .await?;
    Ok((StatusCode::CREATED, Json(TicketResponse::from(&ticket))))
}

/// GET /tickets/{id} — a ticket with its thread, oldest response first.
#[tracing::instrument(skip(state, headers))]
pub async fn thread<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let (ticket, responses) = state
        .support
        .ticket_thread(&session, parse_ticket_id(&id)?)
        .await?;
    Ok(Json(ThreadResponse {
        ticket: TicketResponse::from(&ticket),
        responses: responses.iter().map(Into::into).collect(),
    }))
}

/// POST /tickets/{id}/responses — append a message to the thread.
#[tracing::instrument(skip(state, headers, req))]
pub async fn respond<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> Result<(StatusCode, Json<ThreadMessageResponse>), ApiError> {
    let session = require_session(&state, &headers).await?;
    let response = state
        .support
        .respond(&session, parse_ticket_id(&id)?, &req.message)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ThreadMessageResponse::from(&response)),
    ))
}

/// POST /tickets/{id}/status — staff-only forward transition.
#[tracing::instrument(skip(state, headers, req))]
pub async fn advance<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<TicketStatusRequest>,
) -> Result<Json<TicketResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let ticket = state
        .support
        .advance_ticket(&session, parse_ticket_id(&id)?, req.status)
        .await?;
    Ok(Json(TicketResponse::from(&ticket)))
}

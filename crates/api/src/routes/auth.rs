//! Sign-up, sign-in, sign-out, and session introspection.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use services::{Session, SessionProvider, SignUpRequest};
use store::MarketStore;

use super::{AppState, require_session};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            token: session.token.to_string(),
            user_id: session.user_id.to_string(),
            email: session.email.clone(),
            full_name: session.full_name.clone(),
            role: session.role.to_string(),
        }
    }
}

// -- Handlers --

/// POST /auth/sign-up — create an account and open a session.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn sign_up<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = state.sessions.sign_up(req).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(&session))))
}

/// POST /auth/sign-in — exchange credentials for a session.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn sign_in<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.sessions.sign_in(&req.email, &req.password).await?;
    Ok(Json(SessionResponse::from(&session)))
}

/// POST /auth/sign-out — end the current session.
#[tracing::instrument(skip(state, headers))]
pub async fn sign_out<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let session = require_session(&state, &headers).await?;
    state.sessions.sign_out(session.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/session — the current session, if any.
#[tracing::instrument(skip(state, headers))]
pub async fn session<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    Ok(Json(SessionResponse::from(&session)))
}

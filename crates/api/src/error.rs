//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{OrderError, TicketError};
use services::{IdentityError, RatingError, ServiceError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing, malformed, or expired session token.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Resource not found.
    NotFound(String),
    /// Application service error.
    Service(ServiceError),
    /// Session provider error.
    Identity(IdentityError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Service(err) => service_error_to_response(err),
            ApiError::Identity(err) => identity_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn service_error_to_response(err: ServiceError) -> (StatusCode, String) {
    let status = match &err {
        // Validation failures block the action before any write.
        ServiceError::Cart(_) | ServiceError::Checkout(_) | ServiceError::Product(_) => {
            StatusCode::BAD_REQUEST
        }
        ServiceError::Ticket(TicketError::MissingField { .. }) => StatusCode::BAD_REQUEST,
        ServiceError::Rating(RatingError::StarsOutOfRange { .. }) => StatusCode::BAD_REQUEST,

        // State conflicts.
        ServiceError::Order(OrderError::InvalidTransition { .. })
        | ServiceError::Order(OrderError::AlreadyTerminal { .. })
        | ServiceError::Ticket(_)
        | ServiceError::Rating(_)
        | ServiceError::ProductUnavailable => StatusCode::CONFLICT,

        ServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::Store(StoreError::Constraint { .. }) => StatusCode::CONFLICT,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "store failure surfaced to client");
    }
    (status, err.to_string())
}

fn identity_error_to_response(err: IdentityError) -> (StatusCode, String) {
    let status = match &err {
        IdentityError::MissingField { .. } | IdentityError::MissingFarmDetails => {
            StatusCode::BAD_REQUEST
        }
        IdentityError::EmailTaken => StatusCode::CONFLICT,
        IdentityError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        IdentityError::Hashing(_) | IdentityError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::Identity(err)
    }
}

//! Room service error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic to avoid
//! leaking internal details. Actual errors are logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when empty, otherwise `ValidationFailed`.
    pub fn into_result(self) -> Result<(), RoomError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(RoomError::ValidationFailed(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Why a conferencing server refused or failed to create a meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartFailureReason {
    Timeout,
    Unreachable,
    InvalidChecksum,
    MalformedResponse,
    Rejected(String),
}

impl StartFailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartFailureReason::Timeout => "timeout",
            StartFailureReason::Unreachable => "unreachable",
            StartFailureReason::InvalidChecksum => "invalid_checksum",
            StartFailureReason::MalformedResponse => "malformed_response",
            StartFailureReason::Rejected(_) => "rejected",
        }
    }
}

impl fmt::Display for StartFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartFailureReason::Rejected(key) => write!(f, "rejected ({key})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Room service error type.
///
/// Maps to HTTP status codes:
/// - Unauthenticated, TokenInvalid, AccessCodeRequired, AccessCodeInvalid,
///   InvalidCallbackSignature: 401 Unauthorized
/// - GuestsForbidden, RoomTypeRestricted, Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
/// - RoomNotRunning: 409 Conflict
/// - ValidationFailed: 422 Unprocessable Entity
/// - AlreadyStarting: 423 Locked
/// - RoomStartFailed, JoinFailed, ServerRequestFailed: 502 Bad Gateway
/// - NoServerAvailable, ServiceUnavailable: 503 Service Unavailable
/// - Database, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid room token")]
    TokenInvalid,

    #[error("Access code required")]
    AccessCodeRequired,

    #[error("Invalid access code")]
    AccessCodeInvalid,

    #[error("Guests are not allowed in this room")]
    GuestsForbidden,

    #[error("Room type is restricted")]
    RoomTypeRestricted,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(FieldErrors),

    #[error("No conferencing server available")]
    NoServerAvailable,

    #[error("Room start failed: {0}")]
    RoomStartFailed(StartFailureReason),

    #[error("Room is already being started")]
    AlreadyStarting,

    #[error("Room is not running")]
    RoomNotRunning,

    #[error("Join failed: {0}")]
    JoinFailed(String),

    #[error("Conferencing server request failed: {0}")]
    ServerRequestFailed(String),

    #[error("Invalid callback signature")]
    InvalidCallbackSignature,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl RoomError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            RoomError::Unauthenticated
            | RoomError::TokenInvalid
            | RoomError::AccessCodeRequired
            | RoomError::AccessCodeInvalid
            | RoomError::InvalidCallbackSignature => 401,
            RoomError::GuestsForbidden | RoomError::RoomTypeRestricted | RoomError::Forbidden(_) => {
                403
            }
            RoomError::NotFound(_) => 404,
            RoomError::RoomNotRunning => 409,
            RoomError::ValidationFailed(_) => 422,
            RoomError::AlreadyStarting => 423,
            RoomError::RoomStartFailed(_)
            | RoomError::JoinFailed(_)
            | RoomError::ServerRequestFailed(_) => 502,
            RoomError::NoServerAvailable | RoomError::ServiceUnavailable(_) => 503,
            RoomError::Database(_) | RoomError::Internal => 500,
        }
    }

    /// Stable machine-readable code, also used as a metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::Unauthenticated => "UNAUTHENTICATED",
            RoomError::TokenInvalid => "INVALID_TOKEN",
            RoomError::AccessCodeRequired => "ACCESS_CODE_REQUIRED",
            RoomError::AccessCodeInvalid => "INVALID_ACCESS_CODE",
            RoomError::GuestsForbidden => "GUESTS_FORBIDDEN",
            RoomError::RoomTypeRestricted => "ROOM_TYPE_RESTRICTED",
            RoomError::Forbidden(_) => "FORBIDDEN",
            RoomError::ValidationFailed(_) => "VALIDATION_FAILED",
            RoomError::NoServerAvailable => "NO_SERVER_AVAILABLE",
            RoomError::RoomStartFailed(_) => "ROOM_START_FAILED",
            RoomError::AlreadyStarting => "ROOM_ALREADY_STARTING",
            RoomError::RoomNotRunning => "ROOM_NOT_RUNNING",
            RoomError::JoinFailed(_) => "JOIN_FAILED",
            RoomError::ServerRequestFailed(_) => "SERVER_REQUEST_FAILED",
            RoomError::InvalidCallbackSignature => "INVALID_SIGNATURE",
            RoomError::NotFound(_) => "NOT_FOUND",
            RoomError::Database(_) => "DATABASE_ERROR",
            RoomError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            RoomError::Internal => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = self.code();

        let message = match &self {
            RoomError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "rooms.errors.database", error = %err, "Database operation failed");
                "An internal database error occurred".to_string()
            }
            RoomError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "rooms.errors.availability", reason = %reason, "Service unavailable");
                "Service temporarily unavailable".to_string()
            }
            RoomError::RoomStartFailed(reason) => {
                tracing::warn!(target: "rooms.errors.conferencing", reason = %reason, "Room start failed");
                "The conferencing server could not start the room".to_string()
            }
            RoomError::JoinFailed(err) | RoomError::ServerRequestFailed(err) => {
                tracing::warn!(target: "rooms.errors.conferencing", error = %err, "Conferencing request failed");
                "The conferencing server could not be reached".to_string()
            }
            RoomError::Forbidden(reason) | RoomError::NotFound(reason) => reason.clone(),
            other => other.to_string(),
        };

        let errors = match self {
            RoomError::ValidationFailed(errors) => Some(errors),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
            errors,
        };

        (status, Json(body)).into_response()
    }
}

/// Convert sqlx errors to RoomError
impl From<sqlx::Error> for RoomError {
    fn from(err: sqlx::Error) -> Self {
        RoomError::Database(err.to_string())
    }
}

/// Redis failures only come from the lock backend.
impl From<redis::RedisError> for RoomError {
    fn from(err: redis::RedisError) -> Self {
        RoomError::ServiceUnavailable(format!("lock backend: {err}"))
    }
}

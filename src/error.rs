//! Error types and HTTP error response handling.
//!
//! Every failure in the reservation and inventory core is one of the
//! variants below. Each variant maps to exactly one stable error code so
//! the HTTP layer (and any other caller) can pick a status without
//! inspecting messages.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::models::quantity::Quantity;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Input errors**: malformed requests (`Validation`)
/// - **Caller errors**: missing identity or not the owner
/// - **State errors**: insufficient stock, forbidden transitions, blocked
///   destructive operations
/// - **Storage errors**: transient persistence failures, safe to retry
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Validation(String),

    /// The request carried no usable caller identity.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Missing or malformed caller identity")]
    Unauthenticated,

    /// The caller does not own the resource it is acting on.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("{0}")]
    Authorization(String),

    /// Referenced entity does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A reservation cannot move from its current status to the requested one.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Cannot {action} a {from} reservation; only active reservations can be changed")]
    InvalidTransition { action: &'static str, from: String },

    /// A destructive or shrinking operation is blocked by dependent data.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// Requested quantity exceeds what is available.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Not enough available for food item {food_item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        food_item_id: Uuid,
        requested: Quantity,
        available: Quantity,
    },

    /// Database operation failed (e.g., connection error, query error).
    ///
    /// Returns HTTP 503 Service Unavailable; callers may retry.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Non-database storage backend failure.
    ///
    /// Returns HTTP 503 Service Unavailable; callers may retry.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Ledger bookkeeping would become inconsistent. Never expected in a
    /// healthy system; the operation is aborted.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl AppError {
    /// Stable machine-readable category for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Authorization(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Conflict(_) => "conflict",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::Database(_) | AppError::Storage(_) => "storage_error",
            AppError::InvariantViolation(_) => "internal_error",
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Only transient storage failures qualify; semantic errors never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Storage(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "success": false,
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Storage and invariant failures hide their details from the client and
/// are logged instead.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Database(_) | AppError::Storage(_) => {
                tracing::error!(error = %self, "storage failure");
                "Storage temporarily unavailable, please retry".to_string()
            }
            AppError::InvariantViolation(_) => {
                tracing::error!(error = %self, "ledger invariant violated");
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

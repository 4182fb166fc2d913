//! Caller identity middleware.
//!
//! Identity is established upstream (an auth proxy or gateway) and passed
//! in trusted headers. This middleware:
//! 1. Reads `X-User-Id` (required) and `X-Business-Id` (optional)
//! 2. Parses both as UUIDs
//! 3. Injects a [`CallerContext`] into the request
//! 4. Rejects requests without a usable identity with HTTP 401

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const BUSINESS_ID_HEADER: &str = "x-business-id";

/// Who is making the request.
///
/// Handlers extract this with `Extension<CallerContext>`.
#[derive(Debug, Clone, Copy)]
pub struct CallerContext {
    /// The authenticated user; owner of the reservations they create.
    pub user_id: Uuid,

    /// Business the user acts for, if any. Required for inventory routes.
    pub business_id: Option<Uuid>,
}

impl CallerContext {
    /// The caller's business, or 403 when they act for none.
    pub fn require_business(&self) -> Result<Uuid, AppError> {
        self.business_id.ok_or_else(|| {
            AppError::Authorization("This action requires a business account".to_string())
        })
    }
}

fn header_uuid(headers: &HeaderMap, name: &str) -> Result<Option<Uuid>, AppError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(Some)
            .ok_or(AppError::Unauthenticated),
    }
}

/// Caller identity middleware function.
///
/// # Headers
///
/// ```text
/// X-User-Id: 7c9e6679-7425-40de-944b-e07fc1f90ae7
/// X-Business-Id: 550e8400-e29b-41d4-a716-446655440000
/// ```
///
/// # Returns
///
/// - `Ok(Response)` from the next handler when `X-User-Id` is present
/// - `Err(AppError::Unauthenticated)` when it is missing or either header
///   is not a UUID
pub async fn caller_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    let headers = request.headers();
    let user_id = header_uuid(headers, USER_ID_HEADER)?.ok_or(AppError::Unauthenticated)?;
    let business_id = header_uuid(headers, BUSINESS_ID_HEADER)?;

    request.extensions_mut().insert(CallerContext {
        user_id,
        business_id,
    });

    Ok(next.run(request).await)
}

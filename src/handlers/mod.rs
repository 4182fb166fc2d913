//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, caller identity)
//! 2. Calls the matching service operation with the current time
//! 3. Wraps the result in [`ApiResponse`](crate::models::ApiResponse)

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Food item endpoints
pub mod food_items;
/// Health check endpoint
pub mod health;
/// Location and pickup point endpoints
pub mod locations;
/// Reservation endpoints
pub mod reservations;

/// JSON request body whose rejections use the standard error envelope.
///
/// Malformed or mistyped bodies become `AppError::Validation` (HTTP 400)
/// instead of axum's plain-text rejection.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| AppError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}

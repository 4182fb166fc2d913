//! Reservation HTTP handlers.
//!
//! - POST /api/v1/reservations - Reserve food at a location
//! - GET /api/v1/reservations - The caller's reservations
//! - GET /api/v1/reservations/{id} - One reservation
//! - DELETE /api/v1/reservations/{id} - Cancel
//! - POST /api/v1/reservations/{id}/pickup - Mark collected (business side)

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    handlers::JsonBody,
    middleware::caller::CallerContext,
    models::{
        ApiResponse,
        reservation::{CreateReservationRequest, ReservationDetails},
    },
    services::reservation_service,
};

/// Create a reservation.
///
/// # Request Body
///
/// ```json
/// {
///   "location_id": "550e8400-e29b-41d4-a716-446655440000",
///   "items": [
///     { "food_item_id": "6f1c...", "quantity": "2" },
///     { "food_item_id": "9a0b...", "quantity": 1.5 }
///   ]
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the active reservation with its items,
///   expiring 24 hours from now
/// - **Error (400)**: empty items, non-positive quantity, or an item that
///   is not offered at the location
/// - **Error (404)**: location or food item not found
/// - **Error (409)**: location or food item archived
/// - **Error (422)**: not enough available; nothing was reserved
/// - **Error (503)**: storage unavailable; safe to retry
pub async fn create_reservation(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    JsonBody(request): JsonBody<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationDetails>>), AppError> {
    let reservation = reservation_service::create_reservation(
        state.store.as_ref(),
        caller.user_id,
        request,
        state.clock.now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(reservation))))
}

/// List the caller's reservations, newest first.
pub async fn list_reservations(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<ApiResponse<Vec<ReservationDetails>>>, AppError> {
    let reservations =
        reservation_service::list_reservations(state.store.as_ref(), caller.user_id, state.clock.now())
            .await?;

    Ok(Json(ApiResponse::ok(reservations)))
}

/// Get one of the caller's reservations.
pub async fn get_reservation(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationDetails>>, AppError> {
    let reservation = reservation_service::get_reservation(
        state.store.as_ref(),
        reservation_id,
        caller.user_id,
        state.clock.now(),
    )
    .await?;

    Ok(Json(ApiResponse::ok(reservation)))
}

/// Cancel a reservation.
///
/// # Response
///
/// - **Success (200 OK)**: the canceled reservation; its quantities are
///   available again
/// - **Error (403)**: the reservation belongs to someone else
/// - **Error (404)**: reservation not found
/// - **Error (409)**: the reservation is not active
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationDetails>>, AppError> {
    let reservation = reservation_service::cancel_reservation(
        state.store.as_ref(),
        reservation_id,
        caller.user_id,
        state.clock.now(),
    )
    .await?;

    Ok(Json(ApiResponse::ok(reservation)))
}

/// Mark a reservation as picked up.
///
/// Only the business owning the pickup location may call this.
pub async fn pick_up_reservation(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationDetails>>, AppError> {
    let business_id = caller.require_business()?;
    let reservation = reservation_service::pick_up_reservation(
        state.store.as_ref(),
        reservation_id,
        business_id,
        state.clock.now(),
    )
    .await?;

    Ok(Json(ApiResponse::ok(reservation)))
}

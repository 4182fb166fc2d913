//! Location management HTTP handlers.
//!
//! - POST /api/v1/locations - Create a location with its pickup points
//! - POST /api/v1/locations/{location_id}/pickup-points - Add a pickup point
//! - POST /api/v1/locations/{location_id}/archive - Archive a location
//! - DELETE /api/v1/locations/{location_id} - Delete a location with no history
//!
//! All of these act for the caller's business (`X-Business-Id`).

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
        location::{
            BusinessLocation, CreateLocationRequest, CreatePickupPointRequest, LocationDetails,
            PickupPoint,
        },
    },
    services::{inventory_service, lifecycle_service},
};

/// Create a new location.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Downtown Bakery",
///   "address": "12 High St",
///   "pickup_points": ["Front counter", "Back door"]
/// }
/// ```
///
/// The first pickup point is the default. Omit `pickup_points` to get a
/// single default pickup point named after the location.
///
/// # Response
///
/// - **Success (201 Created)**: the location and its pickup points
/// - **Error (400)**: blank name or address
/// - **Error (403)**: caller acts for no business
pub async fn create_location(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    JsonBody(request): JsonBody<CreateLocationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LocationDetails>>), AppError> {
    let business_id = caller.require_business()?;
    let location =
        inventory_service::create_location(state.store.as_ref(), business_id, request, state.clock.now())
            .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(location))))
}

/// Add a pickup point to a location.
///
/// ```json
/// { "name": "Loading bay", "is_default": true }
/// ```
///
/// A new default pickup point replaces the previous default.
pub async fn add_pickup_point(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(location_id): Path<Uuid>,
    JsonBody(request): JsonBody<CreatePickupPointRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PickupPoint>>), AppError> {
    let business_id = caller.require_business()?;
    let point = inventory_service::add_pickup_point(
        state.store.as_ref(),
        business_id,
        location_id,
        request,
        state.clock.now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(point))))
}

/// Archive a location.
///
/// # Response
///
/// - **Success (200 OK)**: the archived location
/// - **Error (409)**: the location still lists food items, or has active
///   reservations at one of its pickup points
pub async fn archive_location(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(location_id): Path<Uuid>,
) -> Result<Json<ApiResponse<BusinessLocation>>, AppError> {
    let business_id = caller.require_business()?;
    let location =
        lifecycle_service::archive_location(state.store.as_ref(), business_id, location_id).await?;

    Ok(Json(ApiResponse::ok(location)))
}

/// Permanently delete a location that never held food items.
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (409)**: the location has food item history; archive it instead
pub async fn delete_location(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(location_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let business_id = caller.require_business()?;
    lifecycle_service::delete_location(state.store.as_ref(), business_id, location_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

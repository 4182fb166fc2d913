//! Food item HTTP handlers.
//!
//! - GET /api/v1/locations/{location_id}/food-items - Public inventory listing
//! - POST /api/v1/locations/{location_id}/food-items - List a new item
//! - PUT /api/v1/locations/{location_id}/food-items/{id} - Edit an item
//! - POST /api/v1/locations/{location_id}/food-items/{id}/archive - Archive
//! - DELETE /api/v1/locations/{location_id}/food-items/{id} - Delete

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
        food_item::{CreateFoodItemRequest, FoodItem, UpdateFoodItemRequest},
        location::LocationInventory,
    },
    services::{inventory_service, lifecycle_service},
};

/// List a location's non-archived food items, newest first.
///
/// Any authenticated caller may browse.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "location": { "id": "...", "name": "Downtown Bakery", "pickup_points": [...] },
///     "count": 1,
///     "food_items": [
///       { "id": "...", "description": "Sourdough", "total_quantity": "10",
///         "available_quantity": "4", "reserved_quantity": "6", ... }
///     ]
///   }
/// }
/// ```
pub async fn list_food_items(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
) -> Result<Json<ApiResponse<LocationInventory>>, AppError> {
    let inventory =
        inventory_service::list_location_food_items(state.store.as_ref(), location_id).await?;

    Ok(Json(ApiResponse::ok(inventory)))
}

/// List a new food item at a location.
///
/// # Request Body
///
/// ```json
/// {
///   "description": "Sourdough",
///   "unit_label": "loaves",
///   "total_quantity": "10",
///   "pickup_point_id": null,
///   "dietary_restrictions": ["vegan"],
///   "best_before": "2026-01-30"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the item, fully available
/// - **Error (400)**: blank text, negative quantity, or a pickup point of
///   another location
pub async fn create_food_item(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(location_id): Path<Uuid>,
    JsonBody(request): JsonBody<CreateFoodItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FoodItem>>), AppError> {
    let business_id = caller.require_business()?;
    let item = inventory_service::create_food_item(
        state.store.as_ref(),
        business_id,
        location_id,
        request,
        state.clock.now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(item))))
}

/// Edit a food item.
///
/// A body carrying only `total_quantity` is a stock adjustment; anything
/// else is a general edit. Either way a new total below what is currently
/// reserved is rejected with 409.
pub async fn update_food_item(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path((location_id, food_item_id)): Path<(Uuid, Uuid)>,
    JsonBody(request): JsonBody<UpdateFoodItemRequest>,
) -> Result<Json<ApiResponse<FoodItem>>, AppError> {
    let business_id = caller.require_business()?;
    let store = state.store.as_ref();

    let item = match request {
        UpdateFoodItemRequest {
            total_quantity: Some(total),
            description: None,
            unit_label: None,
            pickup_point_id: None,
            dietary_restrictions: None,
            best_before: None,
        } => {
            inventory_service::adjust_total(store, business_id, location_id, food_item_id, total)
                .await?
        }
        request => {
            inventory_service::update_food_item(
                store,
                business_id,
                location_id,
                food_item_id,
                request,
            )
            .await?
        }
    };

    Ok(Json(ApiResponse::ok(item)))
}

/// Archive a food item. Fails with 409 while any quantity is reserved.
pub async fn archive_food_item(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path((location_id, food_item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<FoodItem>>, AppError> {
    let business_id = caller.require_business()?;
    let item = lifecycle_service::archive_food_item(
        state.store.as_ref(),
        business_id,
        location_id,
        food_item_id,
    )
    .await?;

    Ok(Json(ApiResponse::ok(item)))
}

/// Delete a food item that was never reserved. Fails with 409 otherwise.
pub async fn delete_food_item(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path((location_id, food_item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let business_id = caller.require_business()?;
    lifecycle_service::delete_food_item(state.store.as_ref(), business_id, location_id, food_item_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

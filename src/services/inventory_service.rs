//! Inventory service - locations, pickup points and food item edits.
//!
//! Every function runs in one store transaction. Mutations check that the
//! calling business owns the location before touching anything, and food
//! item edits route quantity changes through the ledger.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        food_item::{CreateFoodItemRequest, FoodItem, UpdateFoodItemRequest},
        ledger::Ledger,
        location::{
            BusinessLocation, CreateLocationRequest, CreatePickupPointRequest, LocationDetails,
            LocationInventory, PickupPoint, default_pickup_point,
        },
        quantity::Quantity,
    },
    store::{Store, StoreTx},
};

/// Load a location and check the caller's business owns it.
pub(crate) async fn owned_location(
    tx: &mut dyn StoreTx,
    location_id: Uuid,
    business_id: Uuid,
) -> Result<BusinessLocation, AppError> {
    let location = tx
        .location(location_id)
        .await?
        .ok_or(AppError::NotFound("Location"))?;

    if location.business_id != business_id {
        return Err(AppError::Authorization(
            "You do not have permission to manage this location".to_string(),
        ));
    }
    Ok(location)
}

/// Load a food item and check it is listed under the given location.
pub(crate) async fn food_item_at_location(
    tx: &mut dyn StoreTx,
    location_id: Uuid,
    food_item_id: Uuid,
) -> Result<FoodItem, AppError> {
    let item = tx
        .food_item(food_item_id)
        .await?
        .ok_or(AppError::NotFound("Food item"))?;

    let points = tx.pickup_points(location_id).await?;
    if !points.iter().any(|p| p.id == item.pickup_point_id) {
        return Err(AppError::NotFound("Food item"));
    }
    Ok(item)
}

fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Create a location with its pickup points.
///
/// The first pickup point named in the request is the default. With none
/// named, a single default pickup point named after the location is created.
pub async fn create_location(
    store: &dyn Store,
    business_id: Uuid,
    request: CreateLocationRequest,
    now: DateTime<Utc>,
) -> Result<LocationDetails, AppError> {
    let name = required_text(&request.name, "Location name")?;
    let address = required_text(&request.address, "Address")?;

    let mut point_names = request
        .pickup_points
        .iter()
        .map(|n| required_text(n, "Pickup point name"))
        .collect::<Result<Vec<_>, _>>()?;
    if point_names.is_empty() {
        point_names.push(name.clone());
    }

    let location = BusinessLocation {
        id: Uuid::new_v4(),
        business_id,
        name,
        address,
        archived: false,
        created_at: now,
    };

    let mut tx = store.begin().await?;
    tx.insert_location(&location).await?;

    let mut pickup_points = Vec::with_capacity(point_names.len());
    for (i, point_name) in point_names.into_iter().enumerate() {
        let point = PickupPoint {
            id: Uuid::new_v4(),
            location_id: location.id,
            name: point_name,
            is_default: i == 0,
            created_at: now,
        };
        tx.insert_pickup_point(&point).await?;
        pickup_points.push(point);
    }
    tx.commit().await?;

    tracing::info!(
        location_id = %location.id,
        %business_id,
        pickup_points = pickup_points.len(),
        "location created"
    );

    Ok(LocationDetails {
        location,
        pickup_points,
    })
}

/// Add a pickup point to a location the caller owns.
pub async fn add_pickup_point(
    store: &dyn Store,
    business_id: Uuid,
    location_id: Uuid,
    request: CreatePickupPointRequest,
    now: DateTime<Utc>,
) -> Result<PickupPoint, AppError> {
    let name = required_text(&request.name, "Pickup point name")?;

    let mut tx = store.begin().await?;
    let location = owned_location(tx.as_mut(), location_id, business_id).await?;
    if location.archived {
        return Err(AppError::Conflict(
            "Cannot add pickup points to an archived location".to_string(),
        ));
    }

    let point = PickupPoint {
        id: Uuid::new_v4(),
        location_id,
        name,
        is_default: request.is_default,
        created_at: now,
    };
    tx.insert_pickup_point(&point).await?;
    tx.commit().await?;

    Ok(point)
}

/// List a new food item with everything available and nothing reserved.
pub async fn create_food_item(
    store: &dyn Store,
    business_id: Uuid,
    location_id: Uuid,
    request: CreateFoodItemRequest,
    now: DateTime<Utc>,
) -> Result<FoodItem, AppError> {
    let description = required_text(&request.description, "Description")?;
    let unit_label = required_text(&request.unit_label, "Unit label")?;
    if !request.total_quantity.is_positive() {
        return Err(AppError::Validation(
            "Total quantity must be positive".to_string(),
        ));
    }
    let ledger = Ledger::new(request.total_quantity)?;

    let mut tx = store.begin().await?;
    let location = owned_location(tx.as_mut(), location_id, business_id).await?;
    if location.archived {
        return Err(AppError::Conflict(
            "Cannot list food items at an archived location".to_string(),
        ));
    }

    let points = tx.pickup_points(location_id).await?;
    let pickup_point = match request.pickup_point_id {
        Some(id) => points.iter().find(|p| p.id == id).ok_or_else(|| {
            AppError::Validation("Pickup point does not belong to this location".to_string())
        })?,
        None => default_pickup_point(&points).ok_or(AppError::NotFound("Pickup point"))?,
    };

    let item = FoodItem {
        id: Uuid::new_v4(),
        pickup_point_id: pickup_point.id,
        description,
        unit_label,
        ledger,
        best_before: request.best_before,
        dietary_restrictions: request.dietary_restrictions,
        archived: false,
        created_at: now,
    };
    tx.insert_food_item(&item).await?;
    tx.commit().await?;

    tracing::info!(
        food_item_id = %item.id,
        %location_id,
        total = %item.ledger.total(),
        "food item listed"
    );

    Ok(item)
}

/// Edit a food item. A new total goes through [`Ledger::adjust_total`].
pub async fn update_food_item(
    store: &dyn Store,
    business_id: Uuid,
    location_id: Uuid,
    food_item_id: Uuid,
    request: UpdateFoodItemRequest,
) -> Result<FoodItem, AppError> {
    let mut tx = store.begin().await?;
    owned_location(tx.as_mut(), location_id, business_id).await?;
    let mut item = food_item_at_location(tx.as_mut(), location_id, food_item_id).await?;

    if item.archived {
        return Err(AppError::Conflict(
            "Archived food items cannot be edited".to_string(),
        ));
    }

    if let Some(description) = request.description {
        item.description = required_text(&description, "Description")?;
    }
    if let Some(unit_label) = request.unit_label {
        item.unit_label = required_text(&unit_label, "Unit label")?;
    }
    if let Some(dietary_restrictions) = request.dietary_restrictions {
        item.dietary_restrictions = dietary_restrictions;
    }
    if let Some(best_before) = request.best_before {
        item.best_before = best_before;
    }
    if let Some(pickup_point_id) = request.pickup_point_id
        && pickup_point_id != item.pickup_point_id
    {
        let points = tx.pickup_points(location_id).await?;
        if !points.iter().any(|p| p.id == pickup_point_id) {
            return Err(AppError::Validation(
                "Invalid pickup point for this location".to_string(),
            ));
        }
        item.pickup_point_id = pickup_point_id;
    }
    if let Some(total) = request.total_quantity {
        item.ledger.adjust_total(total)?;
    }

    tx.update_food_item(&item).await?;
    tx.commit().await?;

    tracing::info!(
        %food_item_id,
        total = %item.ledger.total(),
        available = %item.ledger.available(),
        "food item updated"
    );

    Ok(item)
}

/// Set a food item's total quantity.
///
/// Availability becomes `new_total - reserved`; reservations already held
/// are untouched, so only future reservations see the smaller stock.
pub async fn adjust_total(
    store: &dyn Store,
    business_id: Uuid,
    location_id: Uuid,
    food_item_id: Uuid,
    new_total: Quantity,
) -> Result<FoodItem, AppError> {
    let mut tx = store.begin().await?;
    owned_location(tx.as_mut(), location_id, business_id).await?;
    let mut item = food_item_at_location(tx.as_mut(), location_id, food_item_id).await?;

    if item.archived {
        return Err(AppError::Conflict(
            "Archived food items cannot be edited".to_string(),
        ));
    }

    let previous = item.ledger;
    item.ledger.adjust_total(new_total)?;
    tx.update_food_item(&item).await?;
    tx.commit().await?;

    tracing::info!(
        %food_item_id,
        from = %previous.total(),
        to = %item.ledger.total(),
        available = %item.ledger.available(),
        "food item total adjusted"
    );

    Ok(item)
}

/// A location's pickup points and non-archived food items, newest first.
pub async fn list_location_food_items(
    store: &dyn Store,
    location_id: Uuid,
) -> Result<LocationInventory, AppError> {
    let mut tx = store.begin().await?;
    let location = tx
        .read_location(location_id)
        .await?
        .ok_or(AppError::NotFound("Location"))?;
    let pickup_points = tx.pickup_points(location_id).await?;
    let food_items: Vec<FoodItem> = tx
        .food_items_at_location(location_id)
        .await?
        .into_iter()
        .filter(|i| !i.archived)
        .collect();

    Ok(LocationInventory {
        location: LocationDetails {
            location,
            pickup_points,
        },
        count: food_items.len(),
        food_items,
    })
}

//! Business locations and their pickup points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::food_item::FoodItem;

/// Represents a business location record from the database.
///
/// Maps to the `business_locations` table. A location is owned by one
/// business and is archived, never deleted, once it has held inventory.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct BusinessLocation {
    pub id: Uuid,

    /// Owning business; every mutating call checks it against the caller
    pub business_id: Uuid,

    pub name: String,

    pub address: String,

    pub archived: bool,

    pub created_at: DateTime<Utc>,
}

/// A spot within a location where reserved food is collected.
///
/// Maps to the `pickup_points` table. At most one pickup point per location
/// is the default.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct PickupPoint {
    pub id: Uuid,

    pub location_id: Uuid,

    pub name: String,

    pub is_default: bool,

    pub created_at: DateTime<Utc>,
}

/// Request body for creating a location.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Downtown Bakery",
///   "address": "12 Main St",
///   "pickup_points": ["Front counter", "Back door"]
/// }
/// ```
///
/// The first pickup point becomes the default. With no pickup points, one
/// default pickup point named after the location is created.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,

    pub address: String,

    #[serde(default)]
    pub pickup_points: Vec<String>,
}

/// Request body for adding a pickup point to an existing location.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePickupPointRequest {
    pub name: String,

    #[serde(default)]
    pub is_default: bool,
}

/// A location together with its pickup points.
#[derive(Debug, Clone, Serialize)]
pub struct LocationDetails {
    #[serde(flatten)]
    pub location: BusinessLocation,

    pub pickup_points: Vec<PickupPoint>,
}

/// Response body for a location's current listings.
#[derive(Debug, Clone, Serialize)]
pub struct LocationInventory {
    pub location: LocationDetails,

    pub count: usize,

    pub food_items: Vec<FoodItem>,
}

/// Pick the pickup point reservations default to: the one flagged default,
/// else the earliest created.
pub fn default_pickup_point(points: &[PickupPoint]) -> Option<&PickupPoint> {
    points
        .iter()
        .find(|p| p.is_default)
        .or_else(|| points.iter().min_by_key(|p| p.created_at))
}

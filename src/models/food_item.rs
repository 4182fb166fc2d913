//! Food item data models and API request types.
//!
//! This module defines:
//! - `FoodItem`: Database entity representing a listed food item
//! - `CreateFoodItemRequest` / `UpdateFoodItemRequest`: request bodies

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ledger::Ledger, quantity::Quantity};

/// Represents a food item record from the database.
///
/// # Database Table
///
/// Maps to the `food_items` table. Each item:
/// - Belongs to exactly one pickup point
/// - Carries its quantity ledger (total and available; reserved is derived)
/// - Is archived rather than deleted once any reservation referenced it
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct FoodItem {
    pub id: Uuid,

    /// Pickup point the item is collected from
    pub pickup_point_id: Uuid,

    pub description: String,

    /// Free-form unit, e.g. "kg", "boxes", "servings"
    pub unit_label: String,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub ledger: Ledger,

    pub best_before: Option<NaiveDate>,

    /// Opaque labels validated upstream (e.g. "vegan", "gluten_free")
    pub dietary_restrictions: Vec<String>,

    /// Soft-delete flag
    pub archived: bool,

    pub created_at: DateTime<Utc>,
}

/// Request body for listing a new food item at a location.
///
/// # JSON Example
///
/// ```json
/// {
///   "description": "Sourdough loaves",
///   "unit_label": "loaves",
///   "total_quantity": 12,
///   "pickup_point_id": "550e8400-e29b-41d4-a716-446655440000",
///   "dietary_restrictions": ["vegan"],
///   "best_before": "2026-10-21"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFoodItemRequest {
    pub description: String,

    pub unit_label: String,

    pub total_quantity: Quantity,

    /// Pickup point under the location in the path. When omitted the
    /// location's default pickup point is used.
    pub pickup_point_id: Option<Uuid>,

    #[serde(default)]
    pub dietary_restrictions: Vec<String>,

    pub best_before: Option<NaiveDate>,
}

/// Partial update of a food item. Absent fields are left unchanged.
///
/// Changing `total_quantity` goes through the ledger so availability is
/// recomputed around existing reservations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFoodItemRequest {
    pub description: Option<String>,

    pub unit_label: Option<String>,

    pub total_quantity: Option<Quantity>,

    /// Move the item to another pickup point of the same location
    pub pickup_point_id: Option<Uuid>,

    pub dietary_restrictions: Option<Vec<String>>,

    /// `Some(None)` clears the date; absent leaves it unchanged
    #[serde(default, with = "double_option")]
    pub best_before: Option<Option<NaiveDate>>,
}

/// Distinguishes an explicit `null` from a missing field.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

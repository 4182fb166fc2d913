//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the pure rules that govern them (the quantity ledger and the
//! reservation state machine).

/// Listed food items
pub mod food_item;
/// Quantity ledger of a food item
pub mod ledger;
/// Business locations and pickup points
pub mod location;
/// Exact fixed-point quantities
pub mod quantity;
/// Reservations and their lifecycle
pub mod reservation;

use serde::Serialize;

/// Success envelope returned by every endpoint.
///
/// ```json
/// { "success": true, "data": { ... } }
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

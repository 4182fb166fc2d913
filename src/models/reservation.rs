//! Reservation data models and the reservation state machine.
//!
//! A reservation starts `active` and ends in exactly one terminal status.
//! Each transition carries a ledger effect that the coordinator applies to
//! every line item in the same transaction as the status change:
//!
//! | transition             | ledger effect |
//! |------------------------|---------------|
//! | active -> canceled     | release       |
//! | active -> expired      | release       |
//! | active -> picked_up    | consume       |

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, models::quantity::Quantity};

/// How long an active reservation holds stock.
pub const RESERVATION_TTL_HOURS: i64 = 24;

pub fn reservation_ttl() -> Duration {
    Duration::hours(RESERVATION_TTL_HOURS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "reservation_status", rename_all = "snake_case")]
pub enum ReservationStatus {
    Active,
    PickedUp,
    Canceled,
    Expired,
}

/// What a transition does to the ledger of each line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEffect {
    /// Held units go back to available.
    Release,
    /// Held units leave stock for good.
    Consume,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Active => "active",
            ReservationStatus::PickedUp => "picked_up",
            ReservationStatus::Canceled => "canceled",
            ReservationStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != ReservationStatus::Active
    }

    /// Validate `self -> target` and return the ledger effect to apply.
    ///
    /// Only `active` may transition, and only to a terminal status.
    pub fn transition_to(self, target: ReservationStatus) -> Result<LedgerEffect, AppError> {
        if self != ReservationStatus::Active {
            return Err(AppError::InvalidTransition {
                action: target.verb(),
                from: self.to_string(),
            });
        }
        match target {
            ReservationStatus::Canceled | ReservationStatus::Expired => Ok(LedgerEffect::Release),
            ReservationStatus::PickedUp => Ok(LedgerEffect::Consume),
            ReservationStatus::Active => Err(AppError::InvalidTransition {
                action: target.verb(),
                from: self.to_string(),
            }),
        }
    }

    fn verb(self) -> &'static str {
        match self {
            ReservationStatus::Active => "reactivate",
            ReservationStatus::PickedUp => "pick up",
            ReservationStatus::Canceled => "cancel",
            ReservationStatus::Expired => "expire",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a reservation record from the database.
///
/// Maps to the `reservations` table. Line items live in
/// `reservation_items` and are never detached from their reservation.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Reservation {
    pub id: Uuid,

    /// The individual who reserved
    pub user_id: Uuid,

    pub pickup_point_id: Uuid,

    pub status: ReservationStatus,

    pub created_at: DateTime<Utc>,

    /// `created_at` plus the fixed TTL
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    /// A new active reservation created at `now`.
    pub fn new(user_id: Uuid, pickup_point_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            pickup_point_id,
            status: ReservationStatus::Active,
            created_at: now,
            expires_at: now + reservation_ttl(),
        }
    }

    /// Active and past its expiry time.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Active && now >= self.expires_at
    }
}

/// One line of a reservation. Immutable once written.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct ReservationItem {
    pub reservation_id: Uuid,

    pub food_item_id: Uuid,

    pub quantity: Quantity,
}

/// A reservation with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,

    pub items: Vec<ReservationItem>,
}

/// Request body for creating a reservation.
///
/// # JSON Example
///
/// ```json
/// {
///   "location_id": "550e8400-e29b-41d4-a716-446655440000",
///   "items": [
///     { "food_item_id": "660e8400-e29b-41d4-a716-446655440001", "quantity": 2 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReservationRequest {
    pub location_id: Uuid,

    pub items: Vec<RequestedItem>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RequestedItem {
    pub food_item_id: Uuid,

    pub quantity: Quantity,
}

/// Collapse a request into one line per food item, summing duplicates and
/// ordering by food item id (the lock order).
pub fn merge_requested_items(items: &[RequestedItem]) -> Result<Vec<RequestedItem>, AppError> {
    if items.is_empty() {
        return Err(AppError::Validation(
            "At least one item is required".to_string(),
        ));
    }

    let mut merged: Vec<RequestedItem> = Vec::with_capacity(items.len());
    for item in items {
        if !item.quantity.is_positive() {
            return Err(AppError::Validation(format!(
                "Quantity for food item {} must be positive",
                item.food_item_id
            )));
        }
        match merged
            .iter_mut()
            .find(|m| m.food_item_id == item.food_item_id)
        {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| AppError::Validation("Quantity too large".to_string()))?;
            }
            None => merged.push(*item),
        }
    }
    merged.sort_by_key(|m| m.food_item_id);
    Ok(merged)
}

//! Persistence seam for the reservation and inventory core.
//!
//! Every operation in `services` runs inside one [`StoreTx`]. A transaction
//! either commits all of its writes or none of them: dropping a `StoreTx`
//! without calling [`StoreTx::commit`] rolls it back.
//!
//! Read methods that return a single row (`location`, `food_item`,
//! `reservation`) lock that row for the rest of the transaction, so
//! read-check-write sequences on the same row are serialized. The `read_*`
//! variants skip the lock and serve read-only paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        food_item::FoodItem,
        location::{BusinessLocation, PickupPoint},
        reservation::{Reservation, ReservationItem, ReservationStatus},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A transactional store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError>;

    /// Cheap connectivity check for health probes.
    async fn ping(&self) -> Result<(), AppError>;
}

/// One open transaction.
#[async_trait]
pub trait StoreTx: Send {
    // Locations and pickup points

    async fn location(&mut self, id: Uuid) -> Result<Option<BusinessLocation>, AppError>;

    /// Like [`StoreTx::location`] but without a row lock, for read-only paths.
    async fn read_location(&mut self, id: Uuid) -> Result<Option<BusinessLocation>, AppError>;

    async fn insert_location(&mut self, location: &BusinessLocation) -> Result<(), AppError>;

    async fn set_location_archived(&mut self, id: Uuid, archived: bool) -> Result<(), AppError>;

    /// Remove a location and its pickup points.
    async fn delete_location(&mut self, id: Uuid) -> Result<(), AppError>;

    /// Pickup points of a location, default first, then oldest first.
    async fn pickup_points(&mut self, location_id: Uuid) -> Result<Vec<PickupPoint>, AppError>;

    async fn pickup_point(&mut self, id: Uuid) -> Result<Option<PickupPoint>, AppError>;

    /// Insert a pickup point. A default point clears the flag on its siblings.
    async fn insert_pickup_point(&mut self, point: &PickupPoint) -> Result<(), AppError>;

    // Food items

    async fn food_item(&mut self, id: Uuid) -> Result<Option<FoodItem>, AppError>;

    /// Every food item under the location's pickup points, archived or not,
    /// newest first.
    async fn food_items_at_location(&mut self, location_id: Uuid)
    -> Result<Vec<FoodItem>, AppError>;

    async fn insert_food_item(&mut self, item: &FoodItem) -> Result<(), AppError>;

    /// Overwrite every mutable column of an existing item.
    async fn update_food_item(&mut self, item: &FoodItem) -> Result<(), AppError>;

    async fn delete_food_item(&mut self, id: Uuid) -> Result<(), AppError>;

    /// Number of reservation line items that ever referenced the food item,
    /// regardless of reservation status.
    async fn reservation_item_count(&mut self, food_item_id: Uuid) -> Result<i64, AppError>;

    // Reservations

    async fn reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError>;

    /// Like [`StoreTx::reservation`] but without a row lock.
    async fn read_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError>;

    async fn reservation_items(
        &mut self,
        reservation_id: Uuid,
    ) -> Result<Vec<ReservationItem>, AppError>;

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError>;

    async fn insert_reservation_item(&mut self, item: &ReservationItem) -> Result<(), AppError>;

    /// Compare-and-set on status. Returns `false` (and writes nothing) when
    /// the current status is not `from`.
    async fn update_reservation_status(
        &mut self,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<bool, AppError>;

    /// A user's reservations, newest first.
    async fn reservations_for_user(&mut self, user_id: Uuid)
    -> Result<Vec<Reservation>, AppError>;

    /// Number of active reservations on any pickup point of the location.
    async fn active_reservation_count_at_location(
        &mut self,
        location_id: Uuid,
    ) -> Result<i64, AppError>;

    /// Ids of active reservations whose `expires_at` is at or before `now`.
    async fn due_reservation_ids(
        &mut self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

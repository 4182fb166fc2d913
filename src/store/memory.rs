//! In-memory store for tests and local runs.
//!
//! Transactions are serialized by a single async mutex. Each transaction
//! works on a staged copy of the state which replaces the shared state only
//! on commit, so an abandoned transaction leaves no trace.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        food_item::FoodItem,
        location::{BusinessLocation, PickupPoint},
        reservation::{Reservation, ReservationItem, ReservationStatus},
    },
    store::{Store, StoreTx},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    locations: HashMap<Uuid, BusinessLocation>,
    pickup_points: HashMap<Uuid, PickupPoint>,
    food_items: HashMap<Uuid, FoodItem>,
    reservations: HashMap<Uuid, Reservation>,
    reservation_items: Vec<ReservationItem>,
}

impl MemoryState {
    fn pickup_point_ids(&self, location_id: Uuid) -> Vec<Uuid> {
        self.pickup_points
            .values()
            .filter(|p| p.location_id == location_id)
            .map(|p| p.id)
            .collect()
    }
}

/// Injected failures, shared by every transaction of a store.
#[derive(Debug, Default)]
struct Faults {
    /// Fail the n-th line item insert of a transaction (1-based, 0 = off).
    fail_item_insert_at: AtomicUsize,
    unavailable: AtomicBool,
}

/// In-memory [`Store`] implementation.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every transaction fail when it inserts its `nth` reservation
    /// line item (1-based). Pass 0 to turn the fault off.
    pub fn fail_on_reservation_item(&self, nth: usize) {
        self.faults.fail_item_insert_at.store(nth, Ordering::SeqCst);
    }

    /// Simulate a lost connection: `begin` and `ping` fail while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of committed reservations.
    pub async fn reservation_count(&self) -> usize {
        self.state.lock().await.reservations.len()
    }

    /// Number of committed reservation line items.
    pub async fn reservation_item_count(&self) -> usize {
        self.state.lock().await.reservation_items.len()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Storage("memory store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError> {
        self.check_available()?;
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            staged,
            fail_item_insert_at: self.faults.fail_item_insert_at.load(Ordering::SeqCst),
            items_inserted: 0,
        }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_available()
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_item_insert_at: usize,
    items_inserted: usize,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn location(&mut self, id: Uuid) -> Result<Option<BusinessLocation>, AppError> {
        Ok(self.staged.locations.get(&id).cloned())
    }

    async fn read_location(&mut self, id: Uuid) -> Result<Option<BusinessLocation>, AppError> {
        self.location(id).await
    }

    async fn insert_location(&mut self, location: &BusinessLocation) -> Result<(), AppError> {
        self.staged.locations.insert(location.id, location.clone());
        Ok(())
    }

    async fn set_location_archived(&mut self, id: Uuid, archived: bool) -> Result<(), AppError> {
        if let Some(location) = self.staged.locations.get_mut(&id) {
            location.archived = archived;
        }
        Ok(())
    }

    async fn delete_location(&mut self, id: Uuid) -> Result<(), AppError> {
        self.staged.locations.remove(&id);
        self.staged.pickup_points.retain(|_, p| p.location_id != id);
        Ok(())
    }

    async fn pickup_points(&mut self, location_id: Uuid) -> Result<Vec<PickupPoint>, AppError> {
        let mut points: Vec<PickupPoint> = self
            .staged
            .pickup_points
            .values()
            .filter(|p| p.location_id == location_id)
            .cloned()
            .collect();
        points.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(points)
    }

    async fn pickup_point(&mut self, id: Uuid) -> Result<Option<PickupPoint>, AppError> {
        Ok(self.staged.pickup_points.get(&id).cloned())
    }

    async fn insert_pickup_point(&mut self, point: &PickupPoint) -> Result<(), AppError> {
        if point.is_default {
            for sibling in self.staged.pickup_points.values_mut() {
                if sibling.location_id == point.location_id {
                    sibling.is_default = false;
                }
            }
        }
        self.staged.pickup_points.insert(point.id, point.clone());
        Ok(())
    }

    async fn food_item(&mut self, id: Uuid) -> Result<Option<FoodItem>, AppError> {
        Ok(self.staged.food_items.get(&id).cloned())
    }

    async fn food_items_at_location(
        &mut self,
        location_id: Uuid,
    ) -> Result<Vec<FoodItem>, AppError> {
        let points = self.staged.pickup_point_ids(location_id);
        let mut items: Vec<FoodItem> = self
            .staged
            .food_items
            .values()
            .filter(|i| points.contains(&i.pickup_point_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn insert_food_item(&mut self, item: &FoodItem) -> Result<(), AppError> {
        self.staged.food_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn update_food_item(&mut self, item: &FoodItem) -> Result<(), AppError> {
        match self.staged.food_items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Food item")),
        }
    }

    async fn delete_food_item(&mut self, id: Uuid) -> Result<(), AppError> {
        self.staged.food_items.remove(&id);
        Ok(())
    }

    async fn reservation_item_count(&mut self, food_item_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .staged
            .reservation_items
            .iter()
            .filter(|i| i.food_item_id == food_item_id)
            .count() as i64)
    }

    async fn reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        Ok(self.staged.reservations.get(&id).cloned())
    }

    async fn read_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        self.reservation(id).await
    }

    async fn reservation_items(
        &mut self,
        reservation_id: Uuid,
    ) -> Result<Vec<ReservationItem>, AppError> {
        Ok(self
            .staged
            .reservation_items
            .iter()
            .filter(|i| i.reservation_id == reservation_id)
            .cloned()
            .collect())
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError> {
        self.staged
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn insert_reservation_item(&mut self, item: &ReservationItem) -> Result<(), AppError> {
        self.items_inserted += 1;
        if self.items_inserted == self.fail_item_insert_at {
            return Err(AppError::Storage(format!(
                "injected failure on reservation item {}",
                self.items_inserted
            )));
        }
        self.staged.reservation_items.push(item.clone());
        Ok(())
    }

    async fn update_reservation_status(
        &mut self,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<bool, AppError> {
        match self.staged.reservations.get_mut(&id) {
            Some(reservation) if reservation.status == from => {
                reservation.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reservations_for_user(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<Reservation>, AppError> {
        let mut reservations: Vec<Reservation> = self
            .staged
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reservations)
    }

    async fn active_reservation_count_at_location(
        &mut self,
        location_id: Uuid,
    ) -> Result<i64, AppError> {
        let points = self.staged.pickup_point_ids(location_id);
        Ok(self
            .staged
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Active)
            .filter(|r| points.contains(&r.pickup_point_id))
            .count() as i64)
    }

    async fn due_reservation_ids(
        &mut self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, AppError> {
        let mut due: Vec<&Reservation> = self
            .staged
            .reservations
            .values()
            .filter(|r| r.is_due(now))
            .collect();
        due.sort_by_key(|r| r.expires_at);
        Ok(due
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|r| r.id)
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTx {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }
}

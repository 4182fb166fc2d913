//! Reservation service - the transactional boundary for reservations.
//!
//! This service handles:
//! - Creating a reservation, its line items and the ledger holds as one unit
//! - Cancel, expiry and pickup transitions with their ledger effects
//! - Lazy expiry on access plus the batch sweep used by the background task
//!
//! # Atomicity Guarantees
//!
//! Every operation runs in a single store transaction. A failure at any
//! step returns before `commit`, and dropping the transaction rolls back
//! the reservation row, any line items and every ledger change together.
//!
//! # Concurrency
//!
//! Food items are locked in ascending id order. Status changes are a
//! compare-and-set from `active`, so when a cancel races an expiry exactly
//! one of them wins and the ledger is released exactly once.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        location::default_pickup_point,
        reservation::{
            CreateReservationRequest, LedgerEffect, Reservation, ReservationDetails,
            ReservationItem, ReservationStatus, merge_requested_items,
        },
    },
    services::inventory_service::owned_location,
    store::{Store, StoreTx},
};

/// Upper bound on reservations expired per sweep transaction batch.
const SWEEP_BATCH: i64 = 100;

/// Reserve food at a location.
///
/// # Process
///
/// 1. Expire due reservations so stale holds do not block stock
/// 2. Start a transaction and lock the location
/// 3. Pick the pickup point (default first, else oldest)
/// 4. Insert the reservation row
/// 5. Per food item, in id order: lock, check it is offered here, reserve
///    in the ledger, insert the line item
/// 6. Commit (or roll back everything on any error)
///
/// # Errors
///
/// - `Validation`: empty item list, non-positive quantity, item not offered
///   at this location
/// - `NotFound`: location, pickup point or food item missing
/// - `Conflict`: location or food item archived
/// - `InsufficientStock`: a requested quantity exceeds availability
/// - `Database` / `Storage`: persistence failure
pub async fn create_reservation(
    store: &dyn Store,
    user_id: Uuid,
    request: CreateReservationRequest,
    now: DateTime<Utc>,
) -> Result<ReservationDetails, AppError> {
    let lines = merge_requested_items(&request.items)?;

    expire_due_reservations(store, now).await?;

    let mut tx = store.begin().await?;

    let location = tx
        .location(request.location_id)
        .await?
        .ok_or(AppError::NotFound("Location"))?;
    if location.archived {
        return Err(AppError::Conflict(
            "This location is no longer accepting reservations".to_string(),
        ));
    }

    let points = tx.pickup_points(location.id).await?;
    let pickup_point = default_pickup_point(&points).ok_or(AppError::NotFound("Pickup point"))?;

    let reservation = Reservation::new(user_id, pickup_point.id, now);
    tx.insert_reservation(&reservation).await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let mut food_item = tx
            .food_item(line.food_item_id)
            .await?
            .ok_or(AppError::NotFound("Food item"))?;

        if !points.iter().any(|p| p.id == food_item.pickup_point_id) {
            return Err(AppError::Validation(format!(
                "Food item {} is not offered at this location",
                food_item.id
            )));
        }
        if food_item.archived {
            return Err(AppError::Conflict(format!(
                "Food item {} is no longer listed",
                food_item.id
            )));
        }

        food_item.ledger.reserve(food_item.id, line.quantity)?;
        tx.update_food_item(&food_item).await?;

        let item = ReservationItem {
            reservation_id: reservation.id,
            food_item_id: food_item.id,
            quantity: line.quantity,
        };
        tx.insert_reservation_item(&item).await?;
        items.push(item);
    }

    tx.commit().await?;

    tracing::info!(
        reservation_id = %reservation.id,
        %user_id,
        location_id = %location.id,
        pickup_point_id = %reservation.pickup_point_id,
        items = items.len(),
        "reservation created"
    );

    Ok(ReservationDetails { reservation, items })
}

/// Move an active reservation to `target` and apply the ledger effect to
/// every line item, inside the caller's transaction.
async fn apply_transition(
    tx: &mut dyn StoreTx,
    reservation: &mut Reservation,
    target: ReservationStatus,
) -> Result<Vec<ReservationItem>, AppError> {
    let effect = reservation.status.transition_to(target)?;

    if !tx
        .update_reservation_status(reservation.id, ReservationStatus::Active, target)
        .await?
    {
        // Another writer got there first; report against its status
        let current = tx
            .reservation(reservation.id)
            .await?
            .ok_or(AppError::NotFound("Reservation"))?;
        current.status.transition_to(target)?;
        return Err(AppError::InvariantViolation(format!(
            "status of reservation {} changed concurrently",
            reservation.id
        )));
    }

    let mut items = tx.reservation_items(reservation.id).await?;
    items.sort_by_key(|i| i.food_item_id);

    for item in &items {
        let mut food_item = tx.food_item(item.food_item_id).await?.ok_or_else(|| {
            AppError::InvariantViolation(format!(
                "food item {} of reservation {} is missing",
                item.food_item_id, reservation.id
            ))
        })?;

        match effect {
            LedgerEffect::Release => food_item.ledger.release(item.quantity)?,
            LedgerEffect::Consume => food_item.ledger.consume(item.quantity)?,
        }
        tx.update_food_item(&food_item).await?;
    }

    reservation.status = target;
    Ok(items)
}

/// Expire an overdue reservation inside an open transaction and commit.
async fn expire_in(
    mut tx: Box<dyn StoreTx>,
    mut reservation: Reservation,
) -> Result<ReservationDetails, AppError> {
    let items = apply_transition(tx.as_mut(), &mut reservation, ReservationStatus::Expired).await?;
    tx.commit().await?;

    tracing::info!(
        reservation_id = %reservation.id,
        expires_at = %reservation.expires_at,
        "reservation expired"
    );

    Ok(ReservationDetails { reservation, items })
}

/// Cancel a reservation on behalf of its owner.
///
/// A reservation that is already past its expiry time is expired instead
/// (releasing its stock) and the cancel is reported as an invalid
/// transition.
///
/// # Errors
///
/// - `NotFound`: no such reservation
/// - `Authorization`: the caller does not own it
/// - `InvalidTransition`: the reservation is not active
pub async fn cancel_reservation(
    store: &dyn Store,
    reservation_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ReservationDetails, AppError> {
    let mut tx = store.begin().await?;
    let mut reservation = tx
        .reservation(reservation_id)
        .await?
        .ok_or(AppError::NotFound("Reservation"))?;

    if reservation.user_id != user_id {
        return Err(AppError::Authorization(
            "You do not have permission to cancel this reservation".to_string(),
        ));
    }

    if reservation.is_due(now) {
        let expired = expire_in(tx, reservation).await?;
        return Err(AppError::InvalidTransition {
            action: "cancel",
            from: expired.reservation.status.to_string(),
        });
    }

    let items = apply_transition(tx.as_mut(), &mut reservation, ReservationStatus::Canceled).await?;
    tx.commit().await?;

    tracing::info!(%reservation_id, %user_id, "reservation canceled");

    Ok(ReservationDetails { reservation, items })
}

/// Mark a reservation as collected. Only the business owning the pickup
/// location may do this; the held units leave stock.
pub async fn pick_up_reservation(
    store: &dyn Store,
    reservation_id: Uuid,
    business_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ReservationDetails, AppError> {
    let mut tx = store.begin().await?;
    let mut reservation = tx
        .reservation(reservation_id)
        .await?
        .ok_or(AppError::NotFound("Reservation"))?;

    let point = tx
        .pickup_point(reservation.pickup_point_id)
        .await?
        .ok_or(AppError::NotFound("Pickup point"))?;
    owned_location(tx.as_mut(), point.location_id, business_id).await?;

    if reservation.is_due(now) {
        let expired = expire_in(tx, reservation).await?;
        return Err(AppError::InvalidTransition {
            action: "pick up",
            from: expired.reservation.status.to_string(),
        });
    }

    let items = apply_transition(tx.as_mut(), &mut reservation, ReservationStatus::PickedUp).await?;
    tx.commit().await?;

    tracing::info!(%reservation_id, %business_id, "reservation picked up");

    Ok(ReservationDetails { reservation, items })
}

/// Expire one reservation. Used by the sweep.
///
/// # Errors
///
/// - `InvalidTransition`: the reservation already reached a terminal
///   status (e.g. the owner canceled it first); nothing is released
/// - `Conflict`: the reservation is active but not yet due
pub async fn expire_reservation(
    store: &dyn Store,
    reservation_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ReservationDetails, AppError> {
    let mut tx = store.begin().await?;
    let reservation = tx
        .reservation(reservation_id)
        .await?
        .ok_or(AppError::NotFound("Reservation"))?;

    if reservation.status == ReservationStatus::Active && !reservation.is_due(now) {
        return Err(AppError::Conflict(
            "Reservation has not reached its expiry time".to_string(),
        ));
    }

    expire_in(tx, reservation).await
}

/// Expire every active reservation whose time is up. Returns how many this
/// call expired; reservations that reached a terminal status concurrently
/// are skipped.
pub async fn expire_due_reservations(store: &dyn Store, now: DateTime<Utc>) -> Result<usize, AppError> {
    let mut expired = 0;
    loop {
        let ids = {
            let mut tx = store.begin().await?;
            tx.due_reservation_ids(now, SWEEP_BATCH).await?
        };
        let batch_len = ids.len();

        for id in ids {
            match expire_reservation(store, id, now).await {
                Ok(_) => expired += 1,
                Err(AppError::InvalidTransition { .. }) => {
                    tracing::debug!(reservation_id = %id, "reservation settled before expiry");
                }
                Err(e) => return Err(e),
            }
        }

        if batch_len < SWEEP_BATCH as usize {
            return Ok(expired);
        }
    }
}

/// Fetch one of the caller's reservations, expiring it first if due.
pub async fn get_reservation(
    store: &dyn Store,
    reservation_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ReservationDetails, AppError> {
    let mut tx = store.begin().await?;
    let mut reservation = tx
        .read_reservation(reservation_id)
        .await?
        .ok_or(AppError::NotFound("Reservation"))?;

    if reservation.user_id != user_id {
        return Err(AppError::Authorization(
            "You do not have permission to view this reservation".to_string(),
        ));
    }

    if reservation.is_due(now) {
        // Take the row lock only when the read turns into an expiry
        reservation = tx
            .reservation(reservation_id)
            .await?
            .ok_or(AppError::NotFound("Reservation"))?;
        if reservation.is_due(now) {
            return expire_in(tx, reservation).await;
        }
    }

    let items = tx.reservation_items(reservation_id).await?;
    Ok(ReservationDetails { reservation, items })
}

/// The caller's reservations with their line items, newest first.
pub async fn list_reservations(
    store: &dyn Store,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<ReservationDetails>, AppError> {
    expire_due_reservations(store, now).await?;

    let mut tx = store.begin().await?;
    let reservations = tx.reservations_for_user(user_id).await?;

    let mut details = Vec::with_capacity(reservations.len());
    for reservation in reservations {
        let items = tx.reservation_items(reservation.id).await?;
        details.push(ReservationDetails { reservation, items });
    }
    Ok(details)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::{
        models::{
            food_item::{CreateFoodItemRequest, FoodItem},
            location::{CreateLocationRequest, LocationDetails},
            quantity::Quantity,
            reservation::RequestedItem,
        },
        services::inventory_service,
        store::MemoryStore,
    };

    fn units(n: i64) -> Quantity {
        Quantity::from_units(n)
    }

    struct Fixture {
        store: MemoryStore,
        business: Uuid,
        location: LocationDetails,
        now: DateTime<Utc>,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = MemoryStore::new();
            let business = Uuid::new_v4();
            let now = Utc::now();
            let location = inventory_service::create_location(
                &store,
                business,
                CreateLocationRequest {
                    name: "Community Pantry".into(),
                    address: "21 Oak Ave".into(),
                    pickup_points: vec!["Side door".into()],
                },
                now,
            )
            .await
            .unwrap();
            Self {
                store,
                business,
                location,
                now,
            }
        }

        fn location_id(&self) -> Uuid {
            self.location.location.id
        }

        async fn item(&self, total: i64) -> FoodItem {
            inventory_service::create_food_item(
                &self.store,
                self.business,
                self.location_id(),
                CreateFoodItemRequest {
                    description: "Vegetable soup".into(),
                    unit_label: "servings".into(),
                    total_quantity: units(total),
                    pickup_point_id: None,
                    dietary_restrictions: vec![],
                    best_before: None,
                },
                self.now,
            )
            .await
            .unwrap()
        }

        fn request(&self, lines: &[(&FoodItem, i64)]) -> CreateReservationRequest {
            CreateReservationRequest {
                location_id: self.location_id(),
                items: lines
                    .iter()
                    .map(|(item, q)| RequestedItem {
                        food_item_id: item.id,
                        quantity: units(*q),
                    })
                    .collect(),
            }
        }

        async fn reserve(&self, user: Uuid, lines: &[(&FoodItem, i64)]) -> Result<ReservationDetails, AppError> {
            create_reservation(&self.store, user, self.request(lines), self.now).await
        }

        /// (total, available, reserved) in whole units.
        async fn ledger(&self, item: &FoodItem) -> (i64, i64, i64) {
            let mut tx = self.store.begin().await.unwrap();
            let current = tx.food_item(item.id).await.unwrap().unwrap();
            (
                current.ledger.total().milli() / 1000,
                current.ledger.available().milli() / 1000,
                current.ledger.reserved().milli() / 1000,
            )
        }
    }

    #[tokio::test]
    async fn reserve_cancel_adjust_scenario() {
        let fx = Fixture::new().await;
        let user = Uuid::new_v4();
        let item = fx.item(10).await;
        assert_eq!(fx.ledger(&item).await, (10, 10, 0));

        let reservation = fx.reserve(user, &[(&item, 6)]).await.unwrap();
        assert_eq!(reservation.reservation.status, ReservationStatus::Active);
        assert_eq!(reservation.reservation.pickup_point_id, fx.location.pickup_points[0].id);
        assert_eq!(fx.ledger(&item).await, (10, 4, 6));

        cancel_reservation(&fx.store, reservation.reservation.id, user, fx.now)
            .await
            .unwrap();
        assert_eq!(fx.ledger(&item).await, (10, 10, 0));

        inventory_service::adjust_total(&fx.store, fx.business, fx.location_id(), item.id, units(15))
            .await
            .unwrap();
        assert_eq!(fx.ledger(&item).await, (15, 15, 0));

        fx.reserve(Uuid::new_v4(), &[(&item, 2)]).await.unwrap();
        inventory_service::adjust_total(&fx.store, fx.business, fx.location_id(), item.id, units(3))
            .await
            .unwrap();
        assert_eq!(fx.ledger(&item).await, (3, 1, 2));
    }

    #[tokio::test]
    async fn insufficient_stock_persists_nothing() {
        let fx = Fixture::new().await;
        let plenty = fx.item(10).await;
        let scarce = fx.item(1).await;

        let err = fx
            .reserve(Uuid::new_v4(), &[(&plenty, 3), (&scarce, 2)])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InsufficientStock { food_item_id, .. } if food_item_id == scarce.id));
        assert_eq!(fx.store.reservation_count().await, 0);
        assert_eq!(fx.ledger(&plenty).await, (10, 10, 0));
        assert_eq!(fx.ledger(&scarce).await, (1, 1, 0));
    }

    #[tokio::test]
    async fn failed_line_item_insert_rolls_back_everything() {
        let fx = Fixture::new().await;
        let a = fx.item(5).await;
        let b = fx.item(5).await;
        let c = fx.item(5).await;
        fx.store.fail_on_reservation_item(3);

        let err = fx
            .reserve(Uuid::new_v4(), &[(&a, 1), (&b, 2), (&c, 3)])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert!(err.is_retryable());
        assert_eq!(fx.store.reservation_count().await, 0);
        assert_eq!(fx.store.reservation_item_count().await, 0);
        for item in [&a, &b, &c] {
            assert_eq!(fx.ledger(item).await, (5, 5, 0));
        }

        fx.store.fail_on_reservation_item(0);
        fx.reserve(Uuid::new_v4(), &[(&a, 1), (&b, 2), (&c, 3)])
            .await
            .unwrap();
        assert_eq!(fx.store.reservation_item_count().await, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reserves_never_oversell() {
        let fx = Arc::new(Fixture::new().await);
        let item = fx.item(5).await;

        let first = {
            let fx = fx.clone();
            let item = item.clone();
            tokio::spawn(async move { fx.reserve(Uuid::new_v4(), &[(&item, 3)]).await })
        };
        let second = {
            let fx = fx.clone();
            let item = item.clone();
            tokio::spawn(async move { fx.reserve(Uuid::new_v4(), &[(&item, 4)]).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let short = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::InsufficientStock { .. })))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(short, 1);
        let (total, available, reserved) = fx.ledger(&item).await;
        assert_eq!(total, 5);
        assert!(reserved == 3 || reserved == 4);
        assert_eq!(available + reserved, 5);
    }

    #[tokio::test]
    async fn second_release_is_rejected_and_changes_nothing() {
        let fx = Fixture::new().await;
        let user = Uuid::new_v4();
        let item = fx.item(8).await;
        let reservation = fx.reserve(user, &[(&item, 4)]).await.unwrap();
        let id = reservation.reservation.id;

        cancel_reservation(&fx.store, id, user, fx.now).await.unwrap();
        assert_eq!(fx.ledger(&item).await, (8, 8, 0));

        let later = fx.now + Duration::hours(25);
        let err = expire_reservation(&fx.store, id, later).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        let err = cancel_reservation(&fx.store, id, user, fx.now).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert_eq!(fx.ledger(&item).await, (8, 8, 0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_cancel_and_expiry_release_once() {
        let fx = Arc::new(Fixture::new().await);
        let user = Uuid::new_v4();
        let item = fx.item(6).await;
        let id = fx.reserve(user, &[(&item, 6)]).await.unwrap().reservation.id;
        let later = fx.now + Duration::hours(24);

        let cancel = {
            let fx = fx.clone();
            tokio::spawn(async move { cancel_reservation(&fx.store, id, user, fx.now).await })
        };
        let expire = {
            let fx = fx.clone();
            tokio::spawn(async move { expire_reservation(&fx.store, id, later).await })
        };
        let cancel = cancel.await.unwrap();
        let expire = expire.await.unwrap();

        assert!(cancel.is_ok() != expire.is_ok());
        assert_eq!(fx.ledger(&item).await, (6, 6, 0));
    }

    #[tokio::test]
    async fn only_the_owner_can_cancel() {
        let fx = Fixture::new().await;
        let item = fx.item(4).await;
        let reservation = fx.reserve(Uuid::new_v4(), &[(&item, 1)]).await.unwrap();

        let err = cancel_reservation(&fx.store, reservation.reservation.id, Uuid::new_v4(), fx.now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
        assert_eq!(fx.ledger(&item).await, (4, 3, 1));

        let err = cancel_reservation(&fx.store, Uuid::new_v4(), Uuid::new_v4(), fx.now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Reservation")));
    }

    #[tokio::test]
    async fn cancel_after_expiry_releases_but_reports_expired() {
        let fx = Fixture::new().await;
        let user = Uuid::new_v4();
        let item = fx.item(4).await;
        let id = fx.reserve(user, &[(&item, 4)]).await.unwrap().reservation.id;

        let err = cancel_reservation(&fx.store, id, user, fx.now + Duration::hours(30))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { ref from, .. } if from == "expired"));
        assert_eq!(fx.ledger(&item).await, (4, 4, 0));

        let details = get_reservation(&fx.store, id, user, fx.now).await.unwrap();
        assert_eq!(details.reservation.status, ReservationStatus::Expired);
    }

    #[tokio::test]
    async fn stale_holds_do_not_block_new_reservations() {
        let fx = Fixture::new().await;
        let item = fx.item(3).await;
        let stale = fx.reserve(Uuid::new_v4(), &[(&item, 3)]).await.unwrap();

        let later = fx.now + Duration::hours(24);
        let fresh = create_reservation(&fx.store, Uuid::new_v4(), fx.request(&[(&item, 2)]), later)
            .await
            .unwrap();

        assert_eq!(fresh.reservation.expires_at, later + Duration::hours(24));
        assert_eq!(fx.ledger(&item).await, (3, 1, 2));

        let mut tx = fx.store.begin().await.unwrap();
        let stale = tx.reservation(stale.reservation.id).await.unwrap().unwrap();
        assert_eq!(stale.status, ReservationStatus::Expired);
    }

    #[tokio::test]
    async fn sweep_expires_only_due_reservations() {
        let fx = Fixture::new().await;
        let item = fx.item(10).await;
        fx.reserve(Uuid::new_v4(), &[(&item, 2)]).await.unwrap();
        fx.reserve(Uuid::new_v4(), &[(&item, 3)]).await.unwrap();

        assert_eq!(expire_due_reservations(&fx.store, fx.now).await.unwrap(), 0);
        assert_eq!(
            expire_due_reservations(&fx.store, fx.now + Duration::hours(24))
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            expire_due_reservations(&fx.store, fx.now + Duration::hours(48))
                .await
                .unwrap(),
            0
        );
        assert_eq!(fx.ledger(&item).await, (10, 10, 0));
    }

    #[tokio::test]
    async fn early_expiry_is_refused() {
        let fx = Fixture::new().await;
        let item = fx.item(2).await;
        let id = fx.reserve(Uuid::new_v4(), &[(&item, 1)]).await.unwrap().reservation.id;

        let err = expire_reservation(&fx.store, id, fx.now + Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(fx.ledger(&item).await, (2, 1, 1));
    }

    #[tokio::test]
    async fn pickup_consumes_held_stock() {
        let fx = Fixture::new().await;
        let item = fx.item(10).await;
        let id = fx
            .reserve(Uuid::new_v4(), &[(&item, 4)])
            .await
            .unwrap()
            .reservation
            .id;

        let err = pick_up_reservation(&fx.store, id, Uuid::new_v4(), fx.now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let done = pick_up_reservation(&fx.store, id, fx.business, fx.now)
            .await
            .unwrap();
        assert_eq!(done.reservation.status, ReservationStatus::PickedUp);
        assert_eq!(fx.ledger(&item).await, (6, 6, 0));

        let err = pick_up_reservation(&fx.store, id, fx.business, fx.now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn items_must_belong_to_the_requested_location() {
        let fx = Fixture::new().await;
        let other = Fixture::new().await;
        let foreign = other.item(5).await;

        let mut tx = fx.store.begin().await.unwrap();
        let points = other.location.pickup_points.clone();
        tx.insert_location(&other.location.location).await.unwrap();
        for p in &points {
            tx.insert_pickup_point(p).await.unwrap();
        }
        tx.insert_food_item(&foreign).await.unwrap();
        tx.commit().await.unwrap();

        let err = fx
            .reserve(Uuid::new_v4(), &[(&foreign, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn archived_location_rejects_reservations() {
        let fx = Fixture::new().await;
        crate::services::lifecycle_service::archive_location(&fx.store, fx.business, fx.location_id())
            .await
            .unwrap();

        let err = create_reservation(
            &fx.store,
            Uuid::new_v4(),
            CreateReservationRequest {
                location_id: fx.location_id(),
                items: vec![RequestedItem {
                    food_item_id: Uuid::new_v4(),
                    quantity: units(1),
                }],
            },
            fx.now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_returns_newest_first_with_items() {
        let fx = Fixture::new().await;
        let user = Uuid::new_v4();
        let item = fx.item(10).await;
        let older = fx.reserve(user, &[(&item, 1)]).await.unwrap();
        let newer = create_reservation(
            &fx.store,
            user,
            fx.request(&[(&item, 2)]),
            fx.now + Duration::minutes(5),
        )
        .await
        .unwrap();
        fx.reserve(Uuid::new_v4(), &[(&item, 1)]).await.unwrap();

        let listed = list_reservations(&fx.store, user, fx.now + Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].reservation.id, newer.reservation.id);
        assert_eq!(listed[1].reservation.id, older.reservation.id);
        assert_eq!(listed[0].items[0].quantity, units(2));
    }

    #[tokio::test]
    async fn storage_outage_is_retryable() {
        let fx = Fixture::new().await;
        let item = fx.item(2).await;
        fx.store.set_unavailable(true);

        let err = fx.reserve(Uuid::new_v4(), &[(&item, 1)]).await.unwrap_err();
        assert!(err.is_retryable());

        fx.store.set_unavailable(false);
        assert_eq!(fx.ledger(&item).await, (2, 2, 0));
    }

    #[tokio::test]
    async fn reading_a_due_reservation_expires_it() {
        let fx = Fixture::new().await;
        let user = Uuid::new_v4();
        let item = fx.item(5).await;
        let id = fx.reserve(user, &[(&item, 5)]).await.unwrap().reservation.id;

        let before = get_reservation(&fx.store, id, user, fx.now).await.unwrap();
        assert_eq!(before.reservation.status, ReservationStatus::Active);
        assert_eq!(fx.ledger(&item).await, (5, 0, 5));

        let after = get_reservation(&fx.store, id, user, fx.now + Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(after.reservation.status, ReservationStatus::Expired);
        assert_eq!(after.items.len(), 1);
        assert_eq!(fx.ledger(&item).await, (5, 5, 0));

        let err = get_reservation(&fx.store, id, Uuid::new_v4(), fx.now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }
}

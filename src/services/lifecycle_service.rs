//! Lifecycle service - archival and deletion of food items and locations.
//!
//! Destructive operations are gated on reservation state:
//! - archiving requires that nothing is currently held
//! - hard deletion requires that nothing was ever reserved
//!
//! The gate checks are plain functions over the facts loaded inside the
//! transaction, so the decision and the write see the same state.

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{food_item::FoodItem, location::BusinessLocation},
    services::inventory_service::{food_item_at_location, owned_location},
    store::Store,
};

/// An item may be archived only while nothing is reserved against it.
pub fn check_food_item_archivable(item: &FoodItem) -> Result<(), AppError> {
    if item.ledger.reserved().is_positive() {
        return Err(AppError::Conflict(
            "Cannot archive food item with active reservations. Cancel reservations first."
                .to_string(),
        ));
    }
    Ok(())
}

/// An item may be hard-deleted only if no reservation ever referenced it.
pub fn check_food_item_deletable(lifetime_references: i64) -> Result<(), AppError> {
    if lifetime_references > 0 {
        return Err(AppError::Conflict(
            "Food item has reservation history and cannot be deleted. Archive it instead."
                .to_string(),
        ));
    }
    Ok(())
}

/// A location may be archived once every item is archived and no
/// reservation is active at any of its pickup points.
pub fn check_location_archivable(
    items: &[FoodItem],
    active_reservations: i64,
) -> Result<(), AppError> {
    if items.iter().any(|i| !i.archived) {
        return Err(AppError::Conflict(
            "Cannot archive location with active food items. Please archive all food items first."
                .to_string(),
        ));
    }
    if active_reservations > 0 {
        return Err(AppError::Conflict(
            "Cannot archive location with active reservations. Wait for all reservations to be completed first."
                .to_string(),
        ));
    }
    Ok(())
}

/// A location may be hard-deleted only if it never held inventory.
pub fn check_location_deletable(items: &[FoodItem]) -> Result<(), AppError> {
    if !items.is_empty() {
        return Err(AppError::Conflict(
            "Location has food item history and cannot be deleted. Archive it instead."
                .to_string(),
        ));
    }
    Ok(())
}

/// Soft-delete a food item. Quantities are left as they are.
pub async fn archive_food_item(
    store: &dyn Store,
    business_id: Uuid,
    location_id: Uuid,
    food_item_id: Uuid,
) -> Result<FoodItem, AppError> {
    let mut tx = store.begin().await?;
    owned_location(tx.as_mut(), location_id, business_id).await?;
    let mut item = food_item_at_location(tx.as_mut(), location_id, food_item_id).await?;

    if item.archived {
        return Ok(item);
    }
    check_food_item_archivable(&item)?;

    item.archived = true;
    tx.update_food_item(&item).await?;
    tx.commit().await?;

    tracing::info!(%food_item_id, %location_id, "food item archived");
    Ok(item)
}

/// Permanently remove a food item that was never reserved.
pub async fn delete_food_item(
    store: &dyn Store,
    business_id: Uuid,
    location_id: Uuid,
    food_item_id: Uuid,
) -> Result<(), AppError> {
    let mut tx = store.begin().await?;
    owned_location(tx.as_mut(), location_id, business_id).await?;
    food_item_at_location(tx.as_mut(), location_id, food_item_id).await?;

    let references = tx.reservation_item_count(food_item_id).await?;
    check_food_item_deletable(references)?;

    tx.delete_food_item(food_item_id).await?;
    tx.commit().await?;

    tracing::info!(%food_item_id, %location_id, "food item deleted");
    Ok(())
}

/// Soft-delete a location.
pub async fn archive_location(
    store: &dyn Store,
    business_id: Uuid,
    location_id: Uuid,
) -> Result<BusinessLocation, AppError> {
    let mut tx = store.begin().await?;
    let mut location = owned_location(tx.as_mut(), location_id, business_id).await?;

    if location.archived {
        return Ok(location);
    }

    let items = tx.food_items_at_location(location_id).await?;
    let active = tx.active_reservation_count_at_location(location_id).await?;
    check_location_archivable(&items, active)?;

    tx.set_location_archived(location_id, true).await?;
    tx.commit().await?;
    location.archived = true;

    tracing::info!(%location_id, %business_id, "location archived");
    Ok(location)
}

/// Permanently remove a location that never held inventory, together with
/// its pickup points.
pub async fn delete_location(
    store: &dyn Store,
    business_id: Uuid,
    location_id: Uuid,
) -> Result<(), AppError> {
    let mut tx = store.begin().await?;
    owned_location(tx.as_mut(), location_id, business_id).await?;

    let items = tx.food_items_at_location(location_id).await?;
    check_location_deletable(&items)?;

    tx.delete_location(location_id).await?;
    tx.commit().await?;

    tracing::info!(%location_id, %business_id, "location deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{
        models::{
            food_item::CreateFoodItemRequest,
            location::{CreateLocationRequest, LocationDetails},
            quantity::Quantity,
            reservation::{CreateReservationRequest, RequestedItem},
        },
        services::{inventory_service, reservation_service},
        store::MemoryStore,
    };

    struct Fixture {
        store: MemoryStore,
        business: Uuid,
        location: LocationDetails,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = MemoryStore::new();
            let business = Uuid::new_v4();
            let location = inventory_service::create_location(
                &store,
                business,
                CreateLocationRequest {
                    name: "Market Hall".into(),
                    address: "3 Square".into(),
                    pickup_points: vec![],
                },
                Utc::now(),
            )
            .await
            .unwrap();
            Self {
                store,
                business,
                location,
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
                    description: "Apples".into(),
                    unit_label: "kg".into(),
                    total_quantity: Quantity::from_units(total),
                    pickup_point_id: None,
                    dietary_restrictions: vec![],
                    best_before: None,
                },
                Utc::now(),
            )
            .await
            .unwrap()
        }

        async fn reserve(&self, item: &FoodItem, quantity: i64) -> Uuid {
            reservation_service::create_reservation(
                &self.store,
                Uuid::new_v4(),
                CreateReservationRequest {
                    location_id: self.location_id(),
                    items: vec![RequestedItem {
                        food_item_id: item.id,
                        quantity: Quantity::from_units(quantity),
                    }],
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .reservation
            .id
        }
    }

    #[tokio::test]
    async fn item_without_history_can_be_deleted() {
        let fx = Fixture::new().await;
        let item = fx.item(5).await;

        delete_food_item(&fx.store, fx.business, fx.location_id(), item.id)
            .await
            .unwrap();

        let listed = inventory_service::list_location_food_items(&fx.store, fx.location_id())
            .await
            .unwrap();
        assert_eq!(listed.count, 0);
    }

    #[tokio::test]
    async fn item_with_canceled_history_must_be_archived() {
        let fx = Fixture::new().await;
        let item = fx.item(5).await;
        let reservation_id = fx.reserve(&item, 2).await;

        let user = {
            let mut tx = fx.store.begin().await.unwrap();
            tx.reservation(reservation_id).await.unwrap().unwrap().user_id
        };
        reservation_service::cancel_reservation(&fx.store, reservation_id, user, Utc::now())
            .await
            .unwrap();

        let err = delete_food_item(&fx.store, fx.business, fx.location_id(), item.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let archived = archive_food_item(&fx.store, fx.business, fx.location_id(), item.id)
            .await
            .unwrap();
        assert!(archived.archived);
        assert_eq!(archived.ledger.available(), Quantity::from_units(5));
    }

    #[tokio::test]
    async fn item_with_held_stock_cannot_be_archived() {
        let fx = Fixture::new().await;
        let item = fx.item(5).await;
        fx.reserve(&item, 1).await;

        let err = archive_food_item(&fx.store, fx.business, fx.location_id(), item.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn archiving_twice_is_a_no_op() {
        let fx = Fixture::new().await;
        let item = fx.item(5).await;

        archive_food_item(&fx.store, fx.business, fx.location_id(), item.id)
            .await
            .unwrap();
        let again = archive_food_item(&fx.store, fx.business, fx.location_id(), item.id)
            .await
            .unwrap();
        assert!(again.archived);
    }

    #[tokio::test]
    async fn location_with_open_items_cannot_be_archived() {
        let fx = Fixture::new().await;
        let item = fx.item(5).await;

        let err = archive_location(&fx.store, fx.business, fx.location_id())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        archive_food_item(&fx.store, fx.business, fx.location_id(), item.id)
            .await
            .unwrap();
        let location = archive_location(&fx.store, fx.business, fx.location_id())
            .await
            .unwrap();
        assert!(location.archived);
    }

    #[test]
    fn active_reservations_block_location_archival() {
        assert!(check_location_archivable(&[], 0).is_ok());
        assert!(matches!(
            check_location_archivable(&[], 1),
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn location_with_any_item_history_cannot_be_deleted() {
        let fx = Fixture::new().await;
        let item = fx.item(5).await;
        archive_food_item(&fx.store, fx.business, fx.location_id(), item.id)
            .await
            .unwrap();

        let err = delete_location(&fx.store, fx.business, fx.location_id())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn empty_location_can_be_deleted_by_its_owner_only() {
        let fx = Fixture::new().await;

        let err = delete_location(&fx.store, Uuid::new_v4(), fx.location_id())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        delete_location(&fx.store, fx.business, fx.location_id())
            .await
            .unwrap();
        let err = inventory_service::list_location_food_items(&fx.store, fx.location_id())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Location")));
    }

    #[tokio::test]
    async fn expired_hold_no_longer_blocks_archival_after_sweep() {
        let fx = Fixture::new().await;
        let item = fx.item(5).await;
        fx.reserve(&item, 5).await;

        let later = Utc::now() + Duration::hours(25);
        let expired = reservation_service::expire_due_reservations(&fx.store, later)
            .await
            .unwrap();
        assert_eq!(expired, 1);

        let archived = archive_food_item(&fx.store, fx.business, fx.location_id(), item.id)
            .await
            .unwrap();
        assert_eq!(archived.ledger.reserved(), Quantity::ZERO);
    }
}

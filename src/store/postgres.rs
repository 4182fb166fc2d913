//! PostgreSQL store backed by sqlx.
//!
//! Each [`StoreTx`] wraps one database transaction. Single-row reads take
//! `FOR UPDATE` row locks so concurrent operations on the same food item,
//! reservation or location queue behind each other instead of overwriting
//! each other's quantities.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        food_item::FoodItem,
        location::{BusinessLocation, PickupPoint},
        reservation::{Reservation, ReservationItem, ReservationStatus},
    },
    store::{Store, StoreTx},
};

const FOOD_ITEM_COLUMNS: &str = "id, pickup_point_id, description, unit_label, total_quantity, \
     available_quantity, best_before, dietary_restrictions, archived, created_at";

const RESERVATION_COLUMNS: &str = "id, user_id, pickup_point_id, status, created_at, expires_at";

/// PostgreSQL [`Store`] implementation.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn location(&mut self, id: Uuid) -> Result<Option<BusinessLocation>, AppError> {
        let location = sqlx::query_as::<_, BusinessLocation>(
            r#"
            SELECT id, business_id, name, address, archived, created_at
            FROM business_locations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(location)
    }

    async fn read_location(&mut self, id: Uuid) -> Result<Option<BusinessLocation>, AppError> {
        let location = sqlx::query_as::<_, BusinessLocation>(
            "SELECT id, business_id, name, address, archived, created_at FROM business_locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(location)
    }

    async fn insert_location(&mut self, location: &BusinessLocation) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO business_locations (id, business_id, name, address, archived, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(location.id)
        .bind(location.business_id)
        .bind(&location.name)
        .bind(&location.address)
        .bind(location.archived)
        .bind(location.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn set_location_archived(&mut self, id: Uuid, archived: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE business_locations SET archived = $1 WHERE id = $2")
            .bind(archived)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn delete_location(&mut self, id: Uuid) -> Result<(), AppError> {
        // Pickup points go with the location (ON DELETE CASCADE)
        sqlx::query("DELETE FROM business_locations WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn pickup_points(&mut self, location_id: Uuid) -> Result<Vec<PickupPoint>, AppError> {
        let points = sqlx::query_as::<_, PickupPoint>(
            r#"
            SELECT id, location_id, name, is_default, created_at
            FROM pickup_points
            WHERE location_id = $1
            ORDER BY is_default DESC, created_at ASC
            "#,
        )
        .bind(location_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(points)
    }

    async fn pickup_point(&mut self, id: Uuid) -> Result<Option<PickupPoint>, AppError> {
        let point = sqlx::query_as::<_, PickupPoint>(
            "SELECT id, location_id, name, is_default, created_at FROM pickup_points WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(point)
    }

    async fn insert_pickup_point(&mut self, point: &PickupPoint) -> Result<(), AppError> {
        if point.is_default {
            sqlx::query("UPDATE pickup_points SET is_default = FALSE WHERE location_id = $1")
                .bind(point.location_id)
                .execute(&mut *self.tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO pickup_points (id, location_id, name, is_default, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(point.id)
        .bind(point.location_id)
        .bind(&point.name)
        .bind(point.is_default)
        .bind(point.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn food_item(&mut self, id: Uuid) -> Result<Option<FoodItem>, AppError> {
        let item = sqlx::query_as::<_, FoodItem>(&format!(
            "SELECT {FOOD_ITEM_COLUMNS} FROM food_items WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(item)
    }

    async fn food_items_at_location(
        &mut self,
        location_id: Uuid,
    ) -> Result<Vec<FoodItem>, AppError> {
        let items = sqlx::query_as::<_, FoodItem>(&format!(
            r#"
            SELECT {FOOD_ITEM_COLUMNS}
            FROM food_items
            WHERE pickup_point_id IN (SELECT id FROM pickup_points WHERE location_id = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(location_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(items)
    }

    async fn insert_food_item(&mut self, item: &FoodItem) -> Result<(), AppError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO food_items ({FOOD_ITEM_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#
        ))
        .bind(item.id)
        .bind(item.pickup_point_id)
        .bind(&item.description)
        .bind(&item.unit_label)
        .bind(item.ledger.total())
        .bind(item.ledger.available())
        .bind(item.best_before)
        .bind(&item.dietary_restrictions)
        .bind(item.archived)
        .bind(item.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_food_item(&mut self, item: &FoodItem) -> Result<(), AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE food_items
            SET pickup_point_id = $1,
                description = $2,
                unit_label = $3,
                total_quantity = $4,
                available_quantity = $5,
                best_before = $6,
                dietary_restrictions = $7,
                archived = $8
            WHERE id = $9
            "#,
        )
        .bind(item.pickup_point_id)
        .bind(&item.description)
        .bind(&item.unit_label)
        .bind(item.ledger.total())
        .bind(item.ledger.available())
        .bind(item.best_before)
        .bind(&item.dietary_restrictions)
        .bind(item.archived)
        .bind(item.id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("Food item"));
        }
        Ok(())
    }

    async fn delete_food_item(&mut self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM food_items WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn reservation_item_count(&mut self, food_item_id: Uuid) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reservation_items WHERE food_item_id = $1")
                .bind(food_item_id)
                .fetch_one(&mut *self.tx)
                .await?;

        Ok(count)
    }

    async fn reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(reservation)
    }

    async fn read_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(reservation)
    }

    async fn reservation_items(
        &mut self,
        reservation_id: Uuid,
    ) -> Result<Vec<ReservationItem>, AppError> {
        let items = sqlx::query_as::<_, ReservationItem>(
            r#"
            SELECT reservation_id, food_item_id, quantity
            FROM reservation_items
            WHERE reservation_id = $1
            ORDER BY food_item_id
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(items)
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO reservations ({RESERVATION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6)
            "#
        ))
        .bind(reservation.id)
        .bind(reservation.user_id)
        .bind(reservation.pickup_point_id)
        .bind(reservation.status)
        .bind(reservation.created_at)
        .bind(reservation.expires_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_reservation_item(&mut self, item: &ReservationItem) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO reservation_items (reservation_id, food_item_id, quantity)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(item.reservation_id)
        .bind(item.food_item_id)
        .bind(item.quantity)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_reservation_status(
        &mut self,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<bool, AppError> {
        let updated = sqlx::query("UPDATE reservations SET status = $1 WHERE id = $2 AND status = $3")
            .bind(to)
            .bind(id)
            .bind(from)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(updated == 1)
    }

    async fn reservations_for_user(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<Reservation>, AppError> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(reservations)
    }

    async fn active_reservation_count_at_location(
        &mut self,
        location_id: Uuid,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM reservations r
            JOIN pickup_points p ON p.id = r.pickup_point_id
            WHERE p.location_id = $1 AND r.status = 'active'
            "#,
        )
        .bind(location_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn due_reservation_ids(
        &mut self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM reservations
            WHERE status = 'active' AND expires_at <= $1
            ORDER BY expires_at
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}

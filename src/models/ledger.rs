//! Quantity ledger for a single food item.
//!
//! The ledger stores `total_quantity` and `available_quantity`; the reserved
//! amount is always derived as `total - available` and never written on its
//! own. Every mutation below checks `0 <= available <= total` before it
//! takes effect, so a ledger that fails an operation is left untouched.

use serde::{Serialize, Serializer, ser::SerializeStruct};
use uuid::Uuid;

use crate::{error::AppError, models::quantity::Quantity};

/// The (total, available, reserved) triple of one food item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct Ledger {
    total_quantity: Quantity,
    available_quantity: Quantity,
}

impl Ledger {
    /// A fresh ledger: everything available, nothing reserved.
    pub fn new(total: Quantity) -> Result<Self, AppError> {
        if total.is_negative() {
            return Err(AppError::Validation(
                "Total quantity cannot be negative".to_string(),
            ));
        }
        Ok(Self {
            total_quantity: total,
            available_quantity: total,
        })
    }

    pub fn total(&self) -> Quantity {
        self.total_quantity
    }

    pub fn available(&self) -> Quantity {
        self.available_quantity
    }

    pub fn reserved(&self) -> Quantity {
        Quantity::from_milli(self.total_quantity.milli() - self.available_quantity.milli())
    }

    /// Set a new total, recomputing availability from what is reserved.
    ///
    /// Reservations already held are never shrunk: a total below the
    /// reserved amount is rejected rather than clamped.
    pub fn adjust_total(&mut self, new_total: Quantity) -> Result<(), AppError> {
        if new_total.is_negative() {
            return Err(AppError::Validation(
                "Total quantity cannot be negative".to_string(),
            ));
        }
        let reserved = self.reserved();
        if new_total < reserved {
            return Err(AppError::Conflict(format!(
                "Total quantity {new_total} is below the {reserved} currently reserved; cancel reservations first"
            )));
        }

        self.total_quantity = new_total;
        self.available_quantity = Quantity::from_milli(new_total.milli() - reserved.milli());
        Ok(())
    }

    /// Move `quantity` from available to reserved.
    pub fn reserve(&mut self, food_item_id: Uuid, quantity: Quantity) -> Result<(), AppError> {
        if !quantity.is_positive() {
            return Err(AppError::Validation(
                "Reserved quantity must be positive".to_string(),
            ));
        }
        if quantity > self.available_quantity {
            return Err(AppError::InsufficientStock {
                food_item_id,
                requested: quantity,
                available: self.available_quantity,
            });
        }

        self.available_quantity =
            Quantity::from_milli(self.available_quantity.milli() - quantity.milli());
        Ok(())
    }

    /// Move `quantity` from reserved back to available.
    pub fn release(&mut self, quantity: Quantity) -> Result<(), AppError> {
        self.check_reserved_covers(quantity, "release")?;
        self.available_quantity =
            Quantity::from_milli(self.available_quantity.milli() + quantity.milli());
        Ok(())
    }

    /// Remove `quantity` from stock entirely after it has been picked up.
    ///
    /// Availability already excludes these units, so only total (and with it
    /// the derived reserved amount) shrinks.
    pub fn consume(&mut self, quantity: Quantity) -> Result<(), AppError> {
        self.check_reserved_covers(quantity, "consume")?;
        self.total_quantity = Quantity::from_milli(self.total_quantity.milli() - quantity.milli());
        Ok(())
    }

    fn check_reserved_covers(&self, quantity: Quantity, op: &str) -> Result<(), AppError> {
        if quantity.is_negative() || quantity > self.reserved() {
            return Err(AppError::InvariantViolation(format!(
                "cannot {op} {quantity}: only {} reserved",
                self.reserved()
            )));
        }
        Ok(())
    }
}

impl Serialize for Ledger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Ledger", 3)?;
        state.serialize_field("total_quantity", &self.total_quantity)?;
        state.serialize_field("available_quantity", &self.available_quantity)?;
        state.serialize_field("reserved_quantity", &self.reserved())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: i64) -> Quantity {
        Quantity::from_units(n)
    }

    fn assert_consistent(ledger: &Ledger) {
        assert!(!ledger.available().is_negative());
        assert!(ledger.available() <= ledger.total());
        assert_eq!(
            ledger.reserved().milli(),
            ledger.total().milli() - ledger.available().milli()
        );
    }

    #[test]
    fn new_ledger_has_everything_available() {
        let ledger = Ledger::new(units(10)).unwrap();
        assert_eq!(ledger.available(), units(10));
        assert_eq!(ledger.reserved(), Quantity::ZERO);
        assert!(Ledger::new(units(-1)).is_err());
    }

    #[test]
    fn reserve_rejects_more_than_available() {
        let id = Uuid::new_v4();
        let mut ledger = Ledger::new(units(5)).unwrap();
        ledger.reserve(id, units(3)).unwrap();

        let err = ledger.reserve(id, units(4)).unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { requested, available, .. }
                if requested == units(4) && available == units(2)
        ));
        assert_eq!(ledger.available(), units(2));
        assert_eq!(ledger.reserved(), units(3));
    }

    #[test]
    fn reserve_rejects_non_positive_quantities() {
        let mut ledger = Ledger::new(units(5)).unwrap();
        assert!(matches!(
            ledger.reserve(Uuid::nil(), Quantity::ZERO),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ledger.reserve(Uuid::nil(), units(-1)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn reserve_then_release_round_trips_exactly() {
        let mut ledger = Ledger::new("7.25".parse().unwrap()).unwrap();
        let before = ledger;

        ledger.reserve(Uuid::nil(), units(4)).unwrap();
        ledger.release(units(4)).unwrap();

        assert_eq!(ledger, before);
    }

    #[test]
    fn release_beyond_reserved_is_an_invariant_violation() {
        let mut ledger = Ledger::new(units(5)).unwrap();
        ledger.reserve(Uuid::nil(), units(1)).unwrap();

        assert!(matches!(
            ledger.release(units(2)),
            Err(AppError::InvariantViolation(_))
        ));
        assert_eq!(ledger.reserved(), units(1));
    }

    #[test]
    fn consume_removes_reserved_units_from_total() {
        let mut ledger = Ledger::new(units(10)).unwrap();
        ledger.reserve(Uuid::nil(), units(4)).unwrap();
        ledger.consume(units(4)).unwrap();

        assert_eq!(ledger.total(), units(6));
        assert_eq!(ledger.available(), units(6));
        assert_eq!(ledger.reserved(), Quantity::ZERO);
        assert!(ledger.consume(units(1)).is_err());
    }

    #[test]
    fn adjust_total_recomputes_availability_around_reservations() {
        let mut ledger = Ledger::new(units(10)).unwrap();
        ledger.reserve(Uuid::nil(), units(2)).unwrap();

        ledger.adjust_total(units(15)).unwrap();
        assert_eq!(ledger.available(), units(13));
        assert_eq!(ledger.reserved(), units(2));

        ledger.adjust_total(units(3)).unwrap();
        assert_eq!(ledger.total(), units(3));
        assert_eq!(ledger.available(), units(1));
        assert_eq!(ledger.reserved(), units(2));
    }

    #[test]
    fn adjust_total_rejects_negative_and_below_reserved() {
        let mut ledger = Ledger::new(units(10)).unwrap();
        ledger.reserve(Uuid::nil(), units(6)).unwrap();

        assert!(matches!(
            ledger.adjust_total(units(-1)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ledger.adjust_total(units(5)),
            Err(AppError::Conflict(_))
        ));
        assert_eq!(ledger.total(), units(10));
        assert_eq!(ledger.available(), units(4));

        ledger.adjust_total(units(6)).unwrap();
        assert_eq!(ledger.available(), Quantity::ZERO);
    }

    #[test]
    fn invariant_holds_across_mixed_operation_sequences() {
        // Deterministic pseudo-random walk over every ledger operation.
        let mut ledger = Ledger::new(units(20)).unwrap();
        let mut held: Vec<Quantity> = Vec::new();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;

        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let amount = Quantity::from_milli((seed % 7_500) as i64 + 1);

            match seed % 4 {
                0 => {
                    if ledger.reserve(Uuid::nil(), amount).is_ok() {
                        held.push(amount);
                    }
                }
                1 => {
                    if let Some(q) = held.pop() {
                        ledger.release(q).unwrap();
                    }
                }
                2 => {
                    let target = Quantity::from_milli((seed % 40_000) as i64);
                    let _ = ledger.adjust_total(target);
                }
                _ => {
                    if let Some(q) = held.pop() {
                        ledger.consume(q).unwrap();
                    }
                }
            }

            assert_consistent(&ledger);
            let held_sum: i64 = held.iter().map(|q| q.milli()).sum();
            assert_eq!(ledger.reserved().milli(), held_sum);
        }
    }

    #[test]
    fn serializes_derived_reserved_quantity() {
        let mut ledger = Ledger::new(units(10)).unwrap();
        ledger.reserve(Uuid::nil(), units(6)).unwrap();

        let json = serde_json::to_value(ledger).unwrap();
        assert_eq!(json["total_quantity"], "10");
        assert_eq!(json["available_quantity"], "4");
        assert_eq!(json["reserved_quantity"], "6");
    }
}

//! Exact fixed-point quantities for physical stock.
//!
//! Food is measured in kilograms, boxes, servings and so on, often with a
//! fractional part. Quantities are stored as `i64` thousandths of a unit
//! (the minimal unit is 0.001) so that repeated reserve/release cycles can
//! never drift the way floating-point values would.
//!
//! For example:
//! - 2.5 kg is stored as 2500
//! - 12 boxes is stored as 12000

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// Number of stored steps per whole unit.
const SCALE: i64 = 1000;
const FRACTION_DIGITS: u32 = 3;

/// A quantity of some unit, in thousandths.
///
/// Serialized as decimal text (`"2.5"`) so the value survives JSON round
/// trips exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Build from a raw count of thousandths.
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Build from whole units.
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * SCALE)
    }

    /// Convert an exact decimal, rejecting more than three decimal places
    /// and values outside the storable range.
    pub fn from_decimal(value: Decimal) -> Result<Self, AppError> {
        let value = value.normalize();
        if value.scale() > FRACTION_DIGITS {
            return Err(AppError::Validation(format!(
                "Quantity {value} has more than {FRACTION_DIGITS} decimal places"
            )));
        }
        value
            .checked_mul(Decimal::from(SCALE))
            .and_then(|milli| milli.to_i64())
            .map(Quantity)
            .ok_or_else(|| AppError::Validation(format!("Quantity {value} is out of range")))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, FRACTION_DIGITS).normalize()
    }

    pub const fn milli(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }

    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_sub(other.0).map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_decimal(), f)
    }
}

impl FromStr for Quantity {
    type Err = AppError;

    /// Parse decimal text such as `"3"`, `"0.25"` or `"-1.5"`.
    ///
    /// Exponent notation and more than three fractional digits are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s.trim())
            .map_err(|_| AppError::Validation(format!("Invalid quantity: {s:?}")))?;
        Quantity::from_decimal(value)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts either a JSON string (`"2.5"`) or a JSON number (`2.5`).
///
/// Numbers keep their exact decimal text (serde_json `arbitrary_precision`
/// via `rust_decimal`), so large values are not rounded through `f64`.
impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Quantity::from_decimal(value).map_err(serde::de::Error::custom)
    }
}

//! Fixed-point price and the scalar aliases shared across the crate.

use std::fmt;
use std::ops::{Add, Sub};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate or per-order share quantity.
///
/// Signed so that an over-decrement shows up as a negative level instead of
/// wrapping to a huge positive value.
pub type Quantity = i64;

/// Exchange order reference number (unique per venue per day).
pub type OrderId = u64;

/// Instrument locator code carried in every message header.
pub type Locate = u16;

/// 8-decimal fixed-point price (`$1.00` is `100_000_000`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Number of decimal places in the underlying representation.
    pub const DECIMALS: u32 = 8;

    /// Underlying units per whole currency unit.
    pub const SCALE: i64 = 100_000_000;

    /// Returned for an empty side of the book.
    pub const INVALID: Price = Price(i64::MAX);

    /// Wire prices carry 4 decimals; this bridges to the internal 8.
    const WIRE_RESCALE: i64 = 10_000;

    /// Wrap an already-scaled underlying value.
    #[inline]
    pub const fn from_underlying(underlying: i64) -> Self {
        Self(underlying)
    }

    /// Whole currency units, e.g. `Price::from_units(3)` is `$3.00`.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Self(units * Self::SCALE)
    }

    /// Rescale a 4-decimal wire price.
    #[inline]
    pub const fn from_wire(wire: i32) -> Self {
        Self(wire as i64 * Self::WIRE_RESCALE)
    }

    /// The raw scaled integer.
    #[inline]
    pub const fn underlying(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != i64::MAX
    }

    /// Exact decimal form, for display and CSV output.
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, Self::DECIMALS)
    }
}

impl Add for Price {
    type Output = Price;

    #[inline]
    fn add(self, rhs: Price) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Price;

    #[inline]
    fn sub(self, rhs: Price) -> Price {
        Price(self.0 - rhs.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.to_decimal().normalize())
        } else {
            f.write_str("-")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_rescale() {
        // $123.4500 on the wire
        let price = Price::from_wire(1_234_500);
        assert_eq!(price.underlying(), 12_345_000_000);
        assert_eq!(price, Price::from_units(123) + Price::from_underlying(45_000_000));
    }

    #[test]
    fn test_invalid_price() {
        assert!(!Price::INVALID.is_valid());
        assert!(Price::from_units(0).is_valid());
        assert_eq!(Price::INVALID.to_string(), "-");
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_wire(1_005_000).to_string(), "100.5");
        assert_eq!(Price::from_units(3).to_string(), "3");
    }

    #[test]
    fn test_arithmetic() {
        let a = Price::from_units(5);
        let b = Price::from_units(3);
        assert_eq!(a - b, Price::from_units(2));
        assert!(b < a);
    }
}

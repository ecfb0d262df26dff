//! # Quantity Module
//!
//! Line-item quantities stored as integer hundredths of a unit.
//!
//! ## Representation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Wire (JSON number)      Stored (i64 hundredths)                        │
//! │  ─────────────────       ───────────────────────                        │
//! │        2           ──►          200                                     │
//! │        0.25        ──►           25                                     │
//! │        1.5         ──►          150                                     │
//! │        0.001       ──►   rejected (more than two decimals)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sale lines accept whole units only; invoice lines accept anything from
//! 0.01 upwards (bulk purchases by weight or volume).

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use ts_rs::TS;

/// A quantity in hundredths of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[ts(export)]
pub struct Quantity(#[ts(type = "number")] i64);

impl Quantity {
    /// Hundredths per whole unit.
    pub const SCALE: i64 = 100;

    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * Self::SCALE)
    }

    /// Creates a quantity from hundredths of a unit.
    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Quantity(hundredths)
    }

    /// Converts a decimal number, rejecting values with more than two decimals.
    ///
    /// ## Example
    /// ```rust
    /// use cafe_core::quantity::Quantity;
    ///
    /// assert_eq!(Quantity::from_f64(0.25).unwrap().hundredths(), 25);
    /// assert!(Quantity::from_f64(0.125).is_none());
    /// ```
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = value * Self::SCALE as f64;
        let rounded = scaled.round();
        if (scaled - rounded).abs() > 1e-6 || rounded.abs() > i64::MAX as f64 {
            return None;
        }
        Some(Quantity(rounded as i64))
    }

    /// Returns the raw value in hundredths.
    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    /// Returns the value as a float (display and JSON only).
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Checks whether the quantity is a whole number of units.
    #[inline]
    pub const fn is_whole(&self) -> bool {
        self.0 % Self::SCALE == 0
    }

    /// Returns the whole-unit count if the quantity has no fractional part.
    pub const fn whole_units(&self) -> Option<i64> {
        if self.is_whole() {
            Some(self.0 / Self::SCALE)
        } else {
            None
        }
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.whole_units() {
            Some(units) => write!(f, "{}", units),
            None => {
                let sign = if self.0 < 0 { "-" } else { "" };
                let abs = self.0.abs();
                let frac = abs % Self::SCALE;
                if frac % 10 == 0 {
                    write!(f, "{}{}.{}", sign, abs / Self::SCALE, frac / 10)
                } else {
                    write!(f, "{}{}.{:02}", sign, abs / Self::SCALE, frac)
                }
            }
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

// =============================================================================
// Serde: plain JSON numbers
// =============================================================================

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.whole_units() {
            Some(units) => serializer.serialize_i64(units),
            None => serializer.serialize_f64(self.as_f64()),
        }
    }
}

struct QuantityVisitor;

impl<'de> Visitor<'de> for QuantityVisitor {
    type Value = Quantity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number with at most two decimal places")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
        v.checked_mul(Quantity::SCALE)
            .map(Quantity)
            .ok_or_else(|| E::custom("quantity out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
        let v = i64::try_from(v).map_err(|_| E::custom("quantity out of range"))?;
        self.visit_i64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Quantity, E> {
        Quantity::from_f64(v)
            .ok_or_else(|| E::custom("quantity must have at most two decimal places"))
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QuantityVisitor)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_and_fractional() {
        assert!(Quantity::from_units(3).is_whole());
        assert_eq!(Quantity::from_units(3).whole_units(), Some(3));
        assert_eq!(Quantity::from_hundredths(25).whole_units(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_units(2).to_string(), "2");
        assert_eq!(Quantity::from_hundredths(25).to_string(), "0.25");
        assert_eq!(Quantity::from_hundredths(150).to_string(), "1.5");
    }

    #[test]
    fn test_json_numbers() {
        assert_eq!(serde_json::to_string(&Quantity::from_units(2)).unwrap(), "2");
        assert_eq!(serde_json::to_string(&Quantity::from_hundredths(25)).unwrap(), "0.25");

        let q: Quantity = serde_json::from_str("1.5").unwrap();
        assert_eq!(q.hundredths(), 150);
        let q: Quantity = serde_json::from_str("4").unwrap();
        assert_eq!(q.hundredths(), 400);
    }

    #[test]
    fn test_rejects_three_decimals() {
        assert!(serde_json::from_str::<Quantity>("0.005").is_err());
        assert!(serde_json::from_str::<Quantity>("\"2\"").is_err());
    }
}

//! # Money Module
//!
//! Provides the `Money` type for monetary values and the `Percent` type for
//! discounts, both backed by integers.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A sale subtotal must equal the exact sum of its line totals, and      │
//! │  remaining = total - paid must hold to the cent.                       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount is an i64 count of cents. Percentages are basis         │
//! │    points. Rounding happens in exactly one place per operation.         │
//! │    Arithmetic that can leave the i64 range returns `None` instead.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cafe_core::money::{Money, Percent};
//!
//! let price = Money::from_cents(1000); // 10.00
//! let discounted = price.apply_discount(Percent::from_bps(1000)); // 10% off
//! assert_eq!(discounted, Some(Money::from_cents(900)));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use ts_rs::TS;

use crate::quantity::Quantity;

// =============================================================================
// Percent
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1250 bps = 12.5% discount
///
/// The valid range for discounts is 0..=10000 (0% to 100% inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    /// 100% expressed in basis points.
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    /// Checks if the percentage is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks the inclusive 0..=100% bound.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 <= Self::MAX_BPS
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: `remaining = total - paid` is negative on overpayment
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support, serialised as a plain integer
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  Product.price ──► LineItem.unit_price ──► LineItem.line_total          │
/// │                                                 │                       │
/// │                                                 ▼                       │
/// │  Sale/Invoice.subtotal ──► discount ──► + tax ──► total ──► remaining  │
/// │                                                                         │
/// │  Expense.amount ──► CashRegisterEntry.amount ──► running balance       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use cafe_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Sum of two amounts, `None` on i64 overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Difference of two amounts, `None` on i64 overflow.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Exact sum of a sequence of amounts, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use cafe_core::money::Money;
    ///
    /// let lines = [Money::from_cents(150), Money::from_cents(275)];
    /// assert_eq!(Money::checked_sum(lines), Some(Money::from_cents(425)));
    /// assert_eq!(Money::checked_sum([Money::from_cents(i64::MAX), Money::from_cents(1)]), None);
    /// ```
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Returns `rate` of this amount, rounded half away from zero.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps ± 5000) / 10000` in i128.
    /// The ±5000 provides rounding (5000/10000 = 0.5). `None` when the
    /// result does not fit back into i64.
    ///
    /// ## Example
    /// ```rust
    /// use cafe_core::money::{Money, Percent};
    ///
    /// let amount = Money::from_cents(999);
    /// // 9.99 × 12.5% = 1.24875 → 1.25
    /// assert_eq!(amount.percentage_of(Percent::from_bps(1250)), Some(Money::from_cents(125)));
    /// ```
    pub fn percentage_of(&self, rate: Percent) -> Option<Money> {
        let product = self.0 as i128 * rate.bps() as i128;
        let half = if product < 0 { -5000 } else { 5000 };
        i64::try_from((product + half) / 10000)
            .ok()
            .map(Money::from_cents)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use cafe_core::money::{Money, Percent};
    ///
    /// let subtotal = Money::from_cents(10000); // 100.00
    /// let discounted = subtotal.apply_discount(Percent::from_bps(1000)); // 10% off
    /// assert_eq!(discounted, Some(Money::from_cents(9000)));
    /// ```
    pub fn apply_discount(&self, discount: Percent) -> Option<Money> {
        self.checked_sub(self.percentage_of(discount)?)
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// Quantities are hundredths of a unit, so the product is divided by
    /// 100 and rounded half away from zero to the nearest cent. `None`
    /// when the result leaves the i64 range.
    ///
    /// ## Example
    /// ```rust
    /// use cafe_core::money::Money;
    /// use cafe_core::quantity::Quantity;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(Quantity::from_units(3)), Some(Money::from_cents(897)));
    /// // 2.99 × 0.5 = 1.495 → 1.50
    /// assert_eq!(unit_price.multiply_quantity(Quantity::from_hundredths(50)), Some(Money::from_cents(150)));
    /// ```
    pub fn multiply_quantity(&self, qty: Quantity) -> Option<Money> {
        let product = self.0 as i128 * qty.hundredths() as i128;
        let half = if product < 0 { -50 } else { 50 };
        i64::try_from((product + half) / 100).ok().map(Money::from_cents)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money with two decimals.
///
/// ## Note
/// This is for logs and messages. Currency symbols and localisation
/// belong to the front end.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((b - a).cents(), -500);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_checked_sum() {
        let amounts = [Money::from_cents(1), Money::from_cents(2), Money::from_cents(3)];
        assert_eq!(Money::checked_sum(amounts).map(|m| m.cents()), Some(6));
        assert_eq!(Money::checked_sum(std::iter::empty::<Money>()), Some(Money::zero()));
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 10.00 at 8.25% = 0.825 → 0.83
        let amount = Money::from_cents(1000);
        assert_eq!(amount.percentage_of(Percent::from_bps(825)), Some(Money::from_cents(83)));
    }

    #[test]
    fn test_discount_bounds() {
        let subtotal = Money::from_cents(12345);
        assert_eq!(subtotal.apply_discount(Percent::zero()), Some(subtotal));
        assert_eq!(subtotal.apply_discount(Percent::from_bps(10_000)), Some(Money::zero()));
    }

    #[test]
    fn test_multiply_fractional_quantity() {
        let price = Money::from_cents(1000);
        assert_eq!(price.multiply_quantity(Quantity::from_hundredths(1)), Some(Money::from_cents(10)));
        assert_eq!(price.multiply_quantity(Quantity::from_hundredths(250)), Some(Money::from_cents(2500)));
    }

    #[test]
    fn test_overflow_is_reported_not_truncated() {
        // 2^62 cents × 4 units used to wrap to 0
        let huge = Money::from_cents(4_611_686_018_427_387_904);
        assert_eq!(huge.multiply_quantity(Quantity::from_units(4)), None);
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        // A full discount of the largest amount still fits
        assert_eq!(
            Money::from_cents(i64::MAX).apply_discount(Percent::from_bps(10_000)),
            Some(Money::zero())
        );
    }

    #[test]
    fn test_percent_bounds() {
        assert!(Percent::from_bps(10_000).is_valid());
        assert!(!Percent::from_bps(10_001).is_valid());
    }

    #[test]
    fn test_money_serializes_as_integer() {
        let json = serde_json::to_string(&Money::from_cents(250)).unwrap();
        assert_eq!(json, "250");
    }
}

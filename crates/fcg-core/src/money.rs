//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A wallet that drifts by fractions of a cent eventually lets a          │
//! │  purchase through that the balance cannot actually cover.              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Balances, prices and ledger amounts are all i64 cents.              │
//! │    Currency precision (2 decimal places) is structural.                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fcg_core::money::Money;
//!
//! let price = Money::from_cents(5990); // R$ 59.90
//! let total = price + Money::from_cents(1000);
//! assert_eq!(total.cents(), 6990);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::DiscountRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (centavos).
///
/// ## Design Decisions
/// - **i64 (signed)**: Arithmetic stays total; the wallet enforces `>= 0`
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// Game.price ──┬──► Promotion::effective_price ──► Wallet::debit
///              │                                        │
///              └──► Wallet::debit (full price)          ▼
///                                            Movement.amount / before / after
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use fcg_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents R$ 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (reais and centavos).
    ///
    /// ## Example
    /// ```rust
    /// use fcg_core::money::Money;
    ///
    /// let price = Money::from_major_minor(10, 99);
    /// assert_eq!(price.cents(), 1099);
    ///
    /// let negative = Money::from_major_minor(-5, 50);
    /// assert_eq!(negative.cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
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

    /// Subtraction that refuses to go below zero.
    ///
    /// Returns `None` when `other` is larger than `self`.
    #[inline]
    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        if other.0 > self.0 {
            None
        } else {
            Some(Money(self.0 - other.0))
        }
    }

    /// Addition that reports overflow instead of wrapping.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Applies a percentage discount and returns the discounted price.
    ///
    /// ## Rounding
    /// Half-up to the cent on the resulting price:
    /// `price = (cents * (10000 - bps) + 5000) / 10000`.
    /// The same formula is used everywhere a promotional price is shown or
    /// charged, so a quote always matches the debit.
    ///
    /// ## Example
    /// ```rust
    /// use fcg_core::money::Money;
    /// use fcg_core::types::DiscountRate;
    ///
    /// let price = Money::from_cents(999); // R$ 9.99
    /// let rate = DiscountRate::from_percent(50).unwrap();
    ///
    /// // 499.5 cents rounds up to 500
    /// assert_eq!(price.apply_discount(rate).cents(), 500);
    /// ```
    pub fn apply_discount(&self, rate: DiscountRate) -> Money {
        // i128 keeps large prices from overflowing mid-calculation
        let kept_bps = 10_000 - rate.bps() as i128;
        let price = (self.0 as i128 * kept_bps + 5_000) / 10_000;
        Money(price as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount as `R$ 10.99`.
///
/// ## Note
/// This is for logs and error messages. Clients format for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}R$ {}.{:02}", sign, self.major().abs(), self.minor())
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

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Saturates at `i64::MAX` cents; no balance can cover that total.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| Money(acc.0.saturating_add(m.0)))
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
        assert_eq!(format!("{}", Money::from_cents(1099)), "R$ 10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "R$ 5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-R$ 5.50");
        assert_eq!(format!("{}", Money::zero()), "R$ 0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);

        let huge: Money = vec![Money::from_cents(i64::MAX), b].into_iter().sum();
        assert_eq!(huge.cents(), i64::MAX);
    }

    #[test]
    fn test_checked_sub_never_negative() {
        let balance = Money::from_cents(5000);
        assert_eq!(balance.checked_sub(Money::from_cents(5000)), Some(Money::zero()));
        assert_eq!(balance.checked_sub(Money::from_cents(5001)), None);
    }

    #[test]
    fn test_discount_bounds() {
        let price = Money::from_cents(10_000);
        assert_eq!(price.apply_discount(DiscountRate::zero()), price);
        assert_eq!(
            price.apply_discount(DiscountRate::from_percent(100).unwrap()),
            Money::zero()
        );
        assert_eq!(
            price.apply_discount(DiscountRate::from_percent(25).unwrap()).cents(),
            7_500
        );
    }

    #[test]
    fn test_discount_rounds_half_up() {
        // 50% of 9.99 = 4.995 -> 5.00
        let half = DiscountRate::from_percent(50).unwrap();
        assert_eq!(Money::from_cents(999).apply_discount(half).cents(), 500);

        // 50% of 0.01 = 0.005 -> 0.01
        assert_eq!(Money::from_cents(1).apply_discount(half).cents(), 1);

        // 12.5% off 1.00 = 0.875 -> 0.88
        let rate = DiscountRate::from_bps(1250).unwrap();
        assert_eq!(Money::from_cents(100).apply_discount(rate).cents(), 88);

        // 33% off 0.01 = 0.0067 -> 0.01
        let rate = DiscountRate::from_percent(33).unwrap();
        assert_eq!(Money::from_cents(1).apply_discount(rate).cents(), 1);

        // 99% off 0.49 = 0.0049 -> 0.00
        let rate = DiscountRate::from_percent(99).unwrap();
        assert_eq!(Money::from_cents(49).apply_discount(rate).cents(), 0);
    }

    #[test]
    fn test_checked_add_detects_overflow() {
        let a = Money::from_cents(i64::MAX - 1);
        assert_eq!(a.checked_add(Money::from_cents(1)), Some(Money::from_cents(i64::MAX)));
        assert_eq!(a.checked_add(Money::from_cents(2)), None);
    }
}

//! # Money Module
//!
//! Provides the `Money` type for every monetary amount in Keystone.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Summing invoice lines in binary floating point:                       │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Re-aggregating a budget of 10,000 lines drifts by whole cents.        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount is an i64 count of cents. Products with a rate         │
//! │    (tax, discount, markup) are computed in i128 and rounded once,      │
//! │    half away from zero, back to whole cents.                           │
//! │                                                                         │
//! │  Arithmetic saturates at the i64 bounds instead of wrapping; inputs    │
//! │  are held far below them by MAX_MONEY_CENTS in validation.             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use keystone_core::money::Money;
//! use keystone_core::units::Percentage;
//!
//! let subtotal = Money::from_cents(10_000); // $100.00
//! let tax = subtotal.calculate_tax(Percentage::from_bps(850));
//! assert_eq!(tax.cents(), 850); // $8.50
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};

use crate::units::{Hours, Percentage};

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator` by `denominator`, rounding half away from zero.
///
/// `denominator` must be positive.
pub(crate) fn div_round(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

/// Narrows an i128 intermediate back to cents, saturating at the i64 bounds.
fn saturate(cents: i128) -> i64 {
    cents.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values appear in variances and refunds
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as a bare integer**: the JSON API speaks cents
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  InvoiceItem.unit_price ──► line_total ──► Invoice.subtotal            │
/// │                                                │                        │
/// │                                  calculate_tax ▼                        │
/// │                               Invoice.total ──► balance_due            │
/// │                                                                         │
/// │  Payroll components ──► gross_pay − total_deductions ──► net_pay       │
/// │  Budget lines ──► budgeted / actual ──► variance                       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(3000, 0).cents(), 300_000);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    /// `from_major_minor(-5, 50)` = -$5.50, not -$4.50
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
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

    /// Calculates tax at the given rate.
    ///
    /// ## Implementation
    /// Integer math in i128: `amount_cents × bps / 10000`, rounded half away
    /// from zero. The +5000 of the classic formula is applied on the side of
    /// the sign, so negative amounts round symmetrically.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::money::Money;
    /// use keystone_core::units::Percentage;
    ///
    /// let amount = Money::from_cents(1000); // $10.00
    /// let tax = amount.calculate_tax(Percentage::from_bps(825)); // 8.25%
    /// // $0.825 rounds to $0.83
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: Percentage) -> Money {
        let cents = div_round(self.0 as i128 * rate.bps() as i128, 10_000);
        Money(saturate(cents))
    }

    /// Multiplies money by a whole quantity, saturating on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(1000);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 3000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Multiplies money by a whole quantity, or `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Multiplies an hourly rate by a number of hours, rounded to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::money::Money;
    /// use keystone_core::units::Hours;
    ///
    /// let rate = Money::from_cents(5000); // $50.00 / hour
    /// let amount = rate.multiply_hours(Hours::from_hundredths(150)); // 1.5 h
    /// assert_eq!(amount.cents(), 7500);
    /// ```
    pub fn multiply_hours(&self, hours: Hours) -> Money {
        let cents = div_round(self.0 as i128 * hours.hundredths() as i128, 100);
        Money(saturate(cents))
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::money::Money;
    /// use keystone_core::units::Percentage;
    ///
    /// let gross = Money::from_cents(3000); // 3 × $10.00
    /// let net = gross.apply_percentage_discount(Percentage::from_bps(1000));
    /// assert_eq!(net.cents(), 2700); // $27.00
    /// ```
    pub fn apply_percentage_discount(&self, discount: Percentage) -> Money {
        let remaining = 10_000 - discount.bps() as i128;
        let cents = div_round(self.0 as i128 * remaining, 10_000);
        Money(saturate(cents))
    }

    /// Applies a percentage markup and returns the marked-up amount.
    pub fn apply_markup(&self, markup: Percentage) -> Money {
        let factor = 10_000 + markup.bps() as i128;
        let cents = div_round(self.0 as i128 * factor, 10_000);
        Money(saturate(cents))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as `$10.99` (no thousands grouping).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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
        Money(self.0.saturating_add(other.0))
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
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
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(10350).to_string(), "$103.50");
        assert_eq!(Money::from_cents(500).to_string(), "$5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_arithmetic_saturates_instead_of_panicking() {
        let huge = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(huge.multiply_quantity(2).cents(), i64::MAX);
        assert_eq!((huge + huge).cents(), i64::MAX);
        assert_eq!((-huge - huge).cents(), i64::MIN);
        assert_eq!(huge.checked_multiply_quantity(2), None);
        assert_eq!(
            Money::from_cents(i64::MAX).apply_markup(Percentage::from_bps(5000)).cents(),
            i64::MAX
        );
    }

    #[test]
    fn test_sum() {
        let lines = [Money::from_cents(2700), Money::from_cents(7300)];
        let total: Money = lines.iter().sum();
        assert_eq!(total.cents(), 10_000);
    }

    #[test]
    fn test_tax_at_eight_and_a_half_percent() {
        let tax = Money::from_cents(10_000).calculate_tax(Percentage::from_bps(850));
        assert_eq!(tax.cents(), 850);
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        // $10.00 at 8.25% = 82.5 cents
        let rate = Percentage::from_bps(825);
        assert_eq!(Money::from_cents(1000).calculate_tax(rate).cents(), 83);
        assert_eq!(Money::from_cents(-1000).calculate_tax(rate).cents(), -83);
    }

    #[test]
    fn test_percentage_discount() {
        let discounted = Money::from_cents(3000).apply_percentage_discount(Percentage::from_bps(1000));
        assert_eq!(discounted.cents(), 2700);
    }

    #[test]
    fn test_markup() {
        let marked_up = Money::from_cents(10_000).apply_markup(Percentage::from_bps(1500));
        assert_eq!(marked_up.cents(), 11_500);
    }

    #[test]
    fn test_multiply_hours_rounds() {
        // $33.33 × 0.5 h = $16.665 → $16.67
        let amount = Money::from_cents(3333).multiply_hours(Hours::from_hundredths(50));
        assert_eq!(amount.cents(), 1667);
    }

    #[test]
    fn test_serializes_as_plain_cents() {
        let json = serde_json::to_string(&Money::from_cents(103_50)).unwrap();
        assert_eq!(json, "10350");
    }

    #[test]
    fn test_div_round() {
        assert_eq!(div_round(5, 10), 1);
        assert_eq!(div_round(4, 10), 0);
        assert_eq!(div_round(-5, 10), -1);
        assert_eq!(div_round(-4, 10), 0);
    }
}

//! # Fixed-Point Units
//!
//! Integer-backed rates and durations used by the calculators.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Type         Backing i64          Example                              │
//! │  ──────────   ──────────────────   ──────────────────────────────────   │
//! │  Percentage   basis points         850 = 8.5%,  2000 = 20.0%            │
//! │  Hours        hundredths of hour   800 = 8.00h, 150 = 1.50h             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::money::{div_round, Money};

// =============================================================================
// Percentage
// =============================================================================

/// A rate or percentage in basis points (1 bp = 0.01%).
///
/// Signed: variance percentages go negative when actuals come in under
/// budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Percentage(i64);

impl Percentage {
    /// One hundred percent.
    pub const FULL: Percentage = Percentage(10_000);

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: i64) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from a whole-number percent (`10` = 10%).
    #[inline]
    pub const fn from_whole(pct: i64) -> Self {
        Percentage(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> i64 {
        self.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    /// Checks if the percentage is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `part / whole` as a percentage, rounded to the basis point.
    ///
    /// Returns zero when `whole` is zero instead of dividing by it.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::units::Percentage;
    ///
    /// assert_eq!(Percentage::ratio(200, 1000).bps(), 2000); // 20.00%
    /// assert_eq!(Percentage::ratio(200, 0).bps(), 0);
    /// ```
    pub fn ratio(part: i64, whole: i64) -> Percentage {
        if whole == 0 {
            return Percentage::zero();
        }
        let numerator = part as i128 * 10_000;
        let bps = if whole > 0 {
            div_round(numerator, whole as i128)
        } else {
            -div_round(numerator, -(whole as i128))
        };
        Percentage(bps as i64)
    }

    /// `part / whole` for money amounts, see [`Percentage::ratio`].
    pub fn of_money(part: Money, whole: Money) -> Percentage {
        Percentage::ratio(part.cents(), whole.cents())
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

/// Renders `850` as `8.50%`.
impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}%", sign, abs / 100, abs % 100)
    }
}

// =============================================================================
// Hours
// =============================================================================

/// A duration in hundredths of an hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Hours(i64);

impl Hours {
    /// A regular working day (8.00 hours); anything beyond is overtime.
    pub const STANDARD_DAY: Hours = Hours(800);

    /// Creates a duration from hundredths of an hour.
    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Hours(hundredths)
    }

    /// Creates a duration from whole hours.
    #[inline]
    pub const fn from_whole(hours: i64) -> Self {
        Hours(hours * 100)
    }

    /// Converts minutes to hours, rounded to the hundredth.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::units::Hours;
    ///
    /// assert_eq!(Hours::from_minutes(480).hundredths(), 800);
    /// assert_eq!(Hours::from_minutes(20).hundredths(), 33);
    /// ```
    pub fn from_minutes(minutes: i64) -> Self {
        Hours(div_round(minutes as i128 * 100, 60) as i64)
    }

    /// Returns the duration in hundredths of an hour.
    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    /// Zero hours.
    #[inline]
    pub const fn zero() -> Self {
        Hours(0)
    }

    /// Returns `self − other`, floored at zero.
    pub fn saturating_excess_over(&self, other: Hours) -> Hours {
        Hours((self.0 - other.0).max(0))
    }
}

impl Default for Hours {
    fn default() -> Self {
        Hours::zero()
    }
}

impl Add for Hours {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Hours(self.0 + other.0)
    }
}

impl Sub for Hours {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Hours(self.0 - other.0)
    }
}

/// Renders `800` as `8.00`.
impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert_eq!(Percentage::ratio(200, 1000), Percentage::from_bps(2000));
        assert_eq!(Percentage::ratio(-200, 1000), Percentage::from_bps(-2000));
        assert_eq!(Percentage::ratio(1, 3), Percentage::from_bps(3333));
        assert_eq!(Percentage::ratio(2, 3), Percentage::from_bps(6667));
    }

    #[test]
    fn test_ratio_zero_whole_is_zero() {
        assert_eq!(Percentage::ratio(500, 0), Percentage::zero());
    }

    #[test]
    fn test_ratio_negative_whole() {
        assert_eq!(Percentage::ratio(100, -1000), Percentage::from_bps(-1000));
    }

    #[test]
    fn test_percentage_display() {
        assert_eq!(Percentage::from_bps(850).to_string(), "8.50%");
        assert_eq!(Percentage::from_bps(2000).to_string(), "20.00%");
        assert_eq!(Percentage::from_bps(-1250).to_string(), "-12.50%");
    }

    #[test]
    fn test_hours_from_minutes() {
        assert_eq!(Hours::from_minutes(480), Hours::from_whole(8));
        assert_eq!(Hours::from_minutes(90).hundredths(), 150);
        assert_eq!(Hours::from_minutes(1).hundredths(), 2);
    }

    #[test]
    fn test_hours_excess() {
        let worked = Hours::from_hundredths(950);
        assert_eq!(worked.saturating_excess_over(Hours::STANDARD_DAY).hundredths(), 150);
        assert_eq!(
            Hours::from_whole(6).saturating_excess_over(Hours::STANDARD_DAY),
            Hours::zero()
        );
    }

    #[test]
    fn test_hours_display() {
        assert_eq!(Hours::from_whole(8).to_string(), "8.00");
        assert_eq!(Hours::from_hundredths(33).to_string(), "0.33");
    }
}

//! # Attendance Hours
//!
//! Hours worked from clock times, with overnight shifts.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  clock_in 22:00 ──────────── midnight ──────────── clock_out 06:00      │
//! │                                                                         │
//! │  clock_out < clock_in  →  clock_out is on the next calendar day        │
//! │  span  = 06:00 + 24h − 22:00 = 8h                                       │
//! │  break = break_end − break_start (same wraparound rule)                │
//! │  hours_worked   = max(0, span − break)                                  │
//! │  overtime_hours = max(0, hours_worked − 8.00)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::units::Hours;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Hours derived for one attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttendanceHours {
    pub hours_worked: Hours,
    pub overtime_hours: Hours,
}

impl AttendanceHours {
    /// Computes hours from clock times.
    ///
    /// Missing clock-in or clock-out (an open shift) yields zero hours. A
    /// break is only subtracted when both of its ends are present.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveTime;
    /// use keystone_core::attendance::AttendanceHours;
    ///
    /// let t = |h| NaiveTime::from_hms_opt(h, 0, 0);
    /// let hours = AttendanceHours::compute(t(22), t(6), None, None);
    /// assert_eq!(hours.hours_worked.to_string(), "8.00");
    /// assert_eq!(hours.overtime_hours.to_string(), "0.00");
    /// ```
    pub fn compute(
        clock_in: Option<NaiveTime>,
        clock_out: Option<NaiveTime>,
        break_start: Option<NaiveTime>,
        break_end: Option<NaiveTime>,
    ) -> AttendanceHours {
        let (Some(clock_in), Some(clock_out)) = (clock_in, clock_out) else {
            return AttendanceHours::default();
        };

        let mut minutes = span_minutes(clock_in, clock_out);
        if let (Some(start), Some(end)) = (break_start, break_end) {
            minutes -= span_minutes(start, end);
        }

        let hours_worked = Hours::from_minutes(minutes.max(0));
        AttendanceHours {
            hours_worked,
            overtime_hours: hours_worked.saturating_excess_over(Hours::STANDARD_DAY),
        }
    }
}

/// Minutes from `start` to `end`, rolling `end` to the next day if earlier.
fn span_minutes(start: NaiveTime, end: NaiveTime) -> i64 {
    let start = minute_of_day(start);
    let end = minute_of_day(end);
    if end < start {
        end + MINUTES_PER_DAY - start
    } else {
        end - start
    }
}

/// Seconds are truncated; attendance is recorded to the minute.
fn minute_of_day(time: NaiveTime) -> i64 {
    (time.hour() * 60 + time.minute()) as i64
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn test_overnight_shift() {
        let hours = AttendanceHours::compute(hm(22, 0), hm(6, 0), None, None);
        assert_eq!(hours.hours_worked, Hours::from_whole(8));
        assert_eq!(hours.overtime_hours, Hours::zero());
    }

    #[test]
    fn test_day_shift_with_break_and_overtime() {
        let hours = AttendanceHours::compute(hm(8, 0), hm(18, 30), hm(12, 0), hm(12, 30));
        assert_eq!(hours.hours_worked, Hours::from_whole(10));
        assert_eq!(hours.overtime_hours, Hours::from_whole(2));
    }

    #[test]
    fn test_break_across_midnight() {
        let hours = AttendanceHours::compute(hm(20, 0), hm(6, 0), hm(23, 45), hm(0, 15));
        assert_eq!(hours.hours_worked, Hours::from_hundredths(950));
        assert_eq!(hours.overtime_hours, Hours::from_hundredths(150));
    }

    #[test]
    fn test_fractional_hours_round_to_hundredths() {
        // 7h 20m = 7.333.. → 7.33
        let hours = AttendanceHours::compute(hm(9, 0), hm(16, 20), None, None);
        assert_eq!(hours.hours_worked, Hours::from_hundredths(733));
    }

    #[test]
    fn test_open_shift_is_zero() {
        let hours = AttendanceHours::compute(hm(9, 0), None, None, None);
        assert_eq!(hours, AttendanceHours::default());
    }

    #[test]
    fn test_half_break_is_ignored() {
        let hours = AttendanceHours::compute(hm(9, 0), hm(17, 0), hm(12, 0), None);
        assert_eq!(hours.hours_worked, Hours::from_whole(8));
    }

    #[test]
    fn test_break_longer_than_shift_clamps_to_zero() {
        let hours = AttendanceHours::compute(hm(9, 0), hm(10, 0), hm(9, 0), hm(11, 0));
        assert_eq!(hours.hours_worked, Hours::zero());
    }
}

//! The inclusive calendar-day range a dashboard session operates on.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// An inclusive range of calendar days.
///
/// Bounds both the playback controller and manual navigation; the dataset cache
/// is implicitly bounded by it (at most one entry per day in the range).
///
/// # Examples
///
/// ```
/// use geopulse::DateRange;
/// use chrono::NaiveDate;
///
/// let range = DateRange::default();
/// assert!(range.contains(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()));
/// assert!(!range.contains(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range from `start` to `end`, both inclusive.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        assert!(start <= end, "date range start must not be after end");
        Self { start, end }
    }

    /// Whether `date` lies within the range, bounds included.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Clamps `date` into the range.
    pub fn clamp(&self, date: NaiveDate) -> NaiveDate {
        date.max(self.start).min(self.end)
    }

    /// Every day in the range, in order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start
            .iter_days()
            .take_while(move |date| *date <= end)
    }

    /// Number of days in the range.
    pub fn len(&self) -> usize {
        ((self.end - self.start) + Duration::days(1)).num_days() as usize
    }

    pub fn is_empty(&self) -> bool {
        false // at least one day, enforced by the constructor
    }
}

impl Default for DateRange {
    /// The two-year default window of the reference dashboard:
    /// 2024-01-01 through 2025-12-31.
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid default start"),
            end: NaiveDate::from_ymd_opt(2025, 12, 31).expect("valid default end"),
        }
    }
}

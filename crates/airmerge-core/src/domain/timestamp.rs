//! Scanner timestamps and calendar-aware differences.
//!
//! Snapshot exports carry local wall-clock times as `YYYY-MM-DD HH:MM:SS`
//! with no zone. [`Timestamp`] keeps them as naive date-times so that
//! comparisons and round trips through side-files are exact.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// Text layout used by the scanner and by every side-file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Timestamp -- Value Object
// ---------------------------------------------------------------------------

/// A second-resolution local timestamp.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Parse `YYYY-MM-DD HH:MM:SS`, ignoring surrounding whitespace.
    pub fn parse(s: &str) -> Result<Self, MergeError> {
        NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
            .map(Self)
            .map_err(|_| MergeError::InvalidTimestamp {
                value: s.to_owned(),
            })
    }

    /// Wrap a chrono date-time, dropping sub-second precision.
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// The current local wall-clock time.
    pub fn now() -> Self {
        Self::from_naive(chrono::Local::now().naive_local())
    }

    /// The underlying chrono value.
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Signed number of seconds from `earlier` to `self`.
    pub fn seconds_since(&self, earlier: &Timestamp) -> i64 {
        self.0.signed_duration_since(earlier.0).num_seconds()
    }

    /// `self` shifted by `secs` seconds (negative moves backwards).
    pub fn offset_secs(&self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }
}

impl FromStr for Timestamp {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

// ---------------------------------------------------------------------------
// CalendarSpan -- Value Object
// ---------------------------------------------------------------------------

/// A difference between two timestamps expressed in calendar units.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CalendarSpan {
    /// Whole years.
    pub years: i64,
    /// Whole months (0..12).
    pub months: i64,
    /// Whole days (0..31).
    pub days: i64,
    /// Hours (0..24).
    pub hours: i64,
    /// Minutes (0..60).
    pub minutes: i64,
    /// Seconds (0..60).
    pub seconds: i64,
}

impl fmt::Display for CalendarSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.years, self.months, self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Number of days in `month` (1-12) of `year`, leap years included.
pub fn days_in_month(year: i32, month: u32) -> i64 {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(start), Some(end)) => end.signed_duration_since(start).num_days(),
        _ => 31,
    }
}

/// Calendar difference `a - b`.
///
/// Each unit is subtracted from seconds up to years, borrowing from the next
/// larger unit when the minuend is smaller. A day borrow adds the length of
/// the month preceding `a`'s (already borrowed) month. When `a` is earlier than
/// `b` the operands are swapped, so the span is always non-negative.
pub fn calendar_diff(a: &Timestamp, b: &Timestamp) -> CalendarSpan {
    if a < b {
        return calendar_diff(b, a);
    }
    let (x, y) = (a.as_naive(), b.as_naive());

    let mut year = i64::from(x.year());
    let mut month = i64::from(x.month());
    let mut day = i64::from(x.day());
    let mut hour = i64::from(x.hour());
    let mut minute = i64::from(x.minute());
    let mut second = i64::from(x.second());

    let (y_sec, y_min, y_hour) = (
        i64::from(y.second()),
        i64::from(y.minute()),
        i64::from(y.hour()),
    );
    let (y_day, y_month, y_year) = (i64::from(y.day()), i64::from(y.month()), i64::from(y.year()));

    if second < y_sec {
        minute -= 1;
        second += 60;
    }
    second -= y_sec;

    if minute < y_min {
        hour -= 1;
        minute += 60;
    }
    minute -= y_min;

    if hour < y_hour {
        day -= 1;
        hour += 24;
    }
    hour -= y_hour;

    if day < y_day {
        month -= 1;
        let (borrow_year, borrow_month) = if month <= 0 {
            (year - 1, month + 12)
        } else {
            (year, month)
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let borrowed = days_in_month(borrow_year as i32, borrow_month as u32);
        day += borrowed;
    }
    day -= y_day;

    if month < y_month {
        year -= 1;
        month += 12;
    }
    month -= y_month;

    CalendarSpan {
        years: year - y_year,
        months: month,
        days: day,
        hours: hour,
        minutes: minute,
        seconds: second,
    }
}

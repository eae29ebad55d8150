//! Time types for calendar events.
//!
//! [`EventTime`] represents an event start/end that is either a specific
//! datetime or an all-day date. [`DateRange`] is the query window used when
//! fetching events ("last N days").

use std::cmp::Ordering;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The time of a calendar event.
///
/// Calendar events have two kinds of times:
/// - **DateTime**: a specific point in time (stored as UTC)
/// - **AllDay**: a date without a specific time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date.
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates an `EventTime::DateTime` from a datetime in any timezone.
    pub fn from_datetime<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// Creates an `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// All-day events compare at midnight UTC on their date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default()
                .and_utc(),
        }
    }

    /// Returns the date portion of this event time.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.date_naive(),
            Self::AllDay(date) => *date,
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// An inclusive query window for event fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// Lower bound of the window.
    pub start: DateTime<Utc>,
    /// Upper bound of the window.
    pub end: DateTime<Utc>,
    /// The span in days the window was built from.
    pub days: i64,
}

impl DateRange {
    /// Builds the window covering the last `days` days, ending now.
    pub fn last_days(days: i64) -> Self {
        Self::last_days_from(days, Utc::now())
    }

    /// Builds the window covering `days` days ending at `end`.
    pub fn last_days_from(days: i64, end: DateTime<Utc>) -> Self {
        Self {
            start: end - Duration::days(days),
            end,
            days,
        }
    }

    /// Returns `true` if the given time falls inside the window.
    pub fn contains(&self, time: &EventTime) -> bool {
        let dt = time.to_utc_datetime();
        dt >= self.start && dt <= self.end
    }
}

//! Schedule analytics.
//!
//! Pure aggregation over a set of [`CalendarEvent`]s: totals, attendee
//! averages, and counts grouped by month, weekday, and calendar. The
//! grouping keys are full month/weekday names ("March", "Tuesday") so the
//! output is directly presentable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::CalendarEvent;
use crate::time::DateRange;

/// Aggregated statistics over a set of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarAnalytics {
    /// Total number of events.
    pub total_events: usize,
    /// Number of all-day events.
    pub all_day_events: usize,
    /// Number of events with at least one attendee.
    pub events_with_attendees: usize,
    /// Mean attendee count, rounded to the nearest integer (0 when empty).
    pub average_attendees: u64,
    /// Event counts keyed by full month name.
    pub events_by_month: BTreeMap<String, usize>,
    /// Event counts keyed by full weekday name.
    pub events_by_day_of_week: BTreeMap<String, usize>,
    /// Event counts keyed by calendar display name.
    pub events_by_calendar: BTreeMap<String, usize>,
}

/// The full result of a calendar data fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarData {
    /// The fetched events, sorted by start time.
    pub events: Vec<CalendarEvent>,
    /// Aggregated statistics over those events.
    pub analytics: CalendarAnalytics,
    /// The window the events were fetched for.
    pub date_range: DateRange,
    /// The calendar ids that contributed events.
    pub calendars_used: Vec<String>,
}

impl CalendarData {
    /// Builds calendar data from already-fetched events.
    ///
    /// Events are sorted by start time and aggregated.
    pub fn new(mut events: Vec<CalendarEvent>, date_range: DateRange, calendars_used: Vec<String>) -> Self {
        events.sort_by(|a, b| a.start.cmp(&b.start));
        let analytics = aggregate(&events);
        Self {
            events,
            analytics,
            date_range,
            calendars_used,
        }
    }
}

/// Aggregates events into [`CalendarAnalytics`].
pub fn aggregate(events: &[CalendarEvent]) -> CalendarAnalytics {
    let mut analytics = CalendarAnalytics {
        total_events: events.len(),
        ..Default::default()
    };

    let mut attendee_sum: u64 = 0;
    for event in events {
        if event.is_all_day {
            analytics.all_day_events += 1;
        }
        if event.attendees > 0 {
            analytics.events_with_attendees += 1;
        }
        attendee_sum += event.attendees as u64;

        let date = event.start.date();
        let month = date.format("%B").to_string();
        let day_of_week = date.format("%A").to_string();

        *analytics.events_by_month.entry(month).or_default() += 1;
        *analytics.events_by_day_of_week.entry(day_of_week).or_default() += 1;
        *analytics
            .events_by_calendar
            .entry(event.calendar_name.clone())
            .or_default() += 1;
    }

    if !events.is_empty() {
        analytics.average_attendees =
            (attendee_sum as f64 / events.len() as f64).round() as u64;
    }

    analytics
}

//! Processed calendar events.
//!
//! A [`CalendarEvent`] is the normalized form an event takes once it has
//! been fetched from a calendar backend: defaulted title, attendee count
//! instead of the attendee list, and the calendar it came from.

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// Title used when an event has none.
pub const UNTITLED_EVENT: &str = "No Title";

/// A normalized calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Provider event identifier.
    pub id: String,
    /// Event title, defaulted to [`UNTITLED_EVENT`].
    pub summary: String,
    /// Event description (empty when absent).
    #[serde(default)]
    pub description: String,
    /// Start time.
    pub start: EventTime,
    /// End time.
    pub end: EventTime,
    /// Location (empty when absent).
    #[serde(default)]
    pub location: String,
    /// Number of attendees.
    pub attendees: usize,
    /// Whether this is an all-day event.
    pub is_all_day: bool,
    /// The calendar this event was fetched from.
    pub calendar_id: String,
    /// Display name of that calendar.
    pub calendar_name: String,
}

impl CalendarEvent {
    /// Creates a new event with defaulted optional fields.
    pub fn new(
        id: impl Into<String>,
        summary: Option<String>,
        start: EventTime,
        end: EventTime,
        calendar_id: impl Into<String>,
        calendar_name: impl Into<String>,
    ) -> Self {
        let is_all_day = start.is_all_day();
        Self {
            id: id.into(),
            summary: summary
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNTITLED_EVENT.to_string()),
            description: String::new(),
            start,
            end,
            location: String::new(),
            attendees: 0,
            is_all_day,
            calendar_id: calendar_id.into(),
            calendar_name: calendar_name.into(),
        }
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Builder: set the attendee count.
    pub fn with_attendees(mut self, attendees: usize) -> Self {
        self.attendees = attendees;
        self
    }
}

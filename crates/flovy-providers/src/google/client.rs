//! Google API HTTP client.
//!
//! Low-level access to the Calendar API v3 (calendar list, paginated
//! event listing) and the userinfo endpoint used to resolve which Google
//! account a token bundle belongs to.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::DateTime;
use flovy_core::{CalendarEvent, DateRange, EventTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

use super::accounts::AccountIdentity;

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// The userinfo endpoint.
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Page size for event listing.
const MAX_EVENTS_PER_CALENDAR: usize = 2500;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resolves the Google account identity behind an access token.
///
/// Kept behind a trait so account upsert semantics can be exercised
/// without the network.
pub trait IdentityResolver: Send + Sync {
    /// Looks up the account id and email for the given access token.
    fn resolve(&self, access_token: &str) -> BoxFuture<'_, ProviderResult<AccountIdentity>>;
}

/// The real resolver, backed by the userinfo endpoint.
#[derive(Debug)]
pub struct UserinfoResolver {
    http_client: reqwest::Client,
}

impl UserinfoResolver {
    /// Creates a resolver with the given request timeout.
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { http_client })
    }
}

impl IdentityResolver for UserinfoResolver {
    fn resolve(&self, access_token: &str) -> BoxFuture<'_, ProviderResult<AccountIdentity>> {
        let access_token = access_token.to_string();
        Box::pin(async move {
            let response = self
                .http_client
                .get(USERINFO_URL)
                .query(&[("access_token", access_token.as_str())])
                .send()
                .await
                .map_err(|e| ProviderError::network(format!("userinfo request failed: {}", e)))?;

            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(ProviderError::authentication(
                    "access token rejected by userinfo endpoint",
                ));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::server(format!(
                    "userinfo error ({}): {}",
                    status, body
                )));
            }

            let body = response
                .text()
                .await
                .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

            let info: UserinfoResponse = serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("failed to parse userinfo: {}", e))
            })?;

            Ok(AccountIdentity {
                id: info.id,
                email: info.email,
            })
        })
    }
}

/// A calendar from the user's calendar list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    /// The calendar id.
    pub id: String,
    /// The calendar display name.
    pub summary: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether this is the primary calendar.
    #[serde(default)]
    pub primary: bool,
    /// The caller's access role on the calendar.
    #[serde(default = "default_access_role")]
    pub access_role: String,
}

fn default_access_role() -> String {
    "none".to_string()
}

/// The full calendar listing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListing {
    /// All calendars the user has access to.
    pub calendars: Vec<CalendarListEntry>,
    /// Number of calendars.
    pub total_calendars: usize,
    /// The primary calendar id, falling back to `"primary"`.
    pub primary_calendar: String,
}

impl CalendarListing {
    /// Builds a listing from raw entries.
    pub fn from_entries(calendars: Vec<CalendarListEntry>) -> Self {
        let primary_calendar = calendars
            .iter()
            .find(|c| c.primary)
            .map(|c| c.id.clone())
            .unwrap_or_else(|| "primary".to_string());
        Self {
            total_calendars: calendars.len(),
            calendars,
            primary_calendar,
        }
    }

    /// Returns the display name for a calendar id, if listed.
    pub fn name_of(&self, calendar_id: &str) -> Option<&str> {
        self.calendars
            .iter()
            .find(|c| c.id == calendar_id)
            .map(|c| c.summary.as_str())
    }
}

/// Google Calendar API client bound to one access token.
#[derive(Debug)]
pub struct CalendarApiClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl CalendarApiClient {
    /// Creates a client with the given access token.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
        })
    }

    /// Lists the user's calendars.
    pub async fn list_calendars(&self) -> ProviderResult<CalendarListing> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("request failed: {}", e)))?;

        let body = Self::check_response(response).await?;

        let list: CalendarListResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse calendar list: {}", e))
        })?;

        let entries = list
            .items
            .into_iter()
            .map(|item| CalendarListEntry {
                id: item.id,
                summary: item
                    .summary
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "Untitled Calendar".to_string()),
                description: item.description,
                primary: item.primary,
                access_role: item.access_role.unwrap_or_else(default_access_role),
            })
            .collect();

        Ok(CalendarListing::from_entries(entries))
    }

    /// Lists events from one calendar within the given range.
    ///
    /// Recurring events are expanded server-side and results are ordered
    /// by start time; pagination is handled internally. Cancelled events
    /// and events without usable times are skipped.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        calendar_name: &str,
        range: &DateRange,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(calendar_id, range, page_token.as_deref())
                .await?;

            for item in page.items {
                if let Some(event) = convert_event(item, calendar_id, calendar_name) {
                    all_events.push(event);
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            calendar = %calendar_id,
            events = all_events.len(),
            "fetched events"
        );
        Ok(all_events)
    }

    /// Fetches a single page of events.
    async fn list_events_page(
        &self,
        calendar_id: &str,
        range: &DateRange,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", range.start.to_rfc3339()),
                ("timeMax", range.end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", MAX_EVENTS_PER_CALENDAR.to_string()),
            ]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::network("request timeout")
            } else if e.is_connect() {
                ProviderError::network(format!("connection failed: {}", e))
            } else {
                ProviderError::network(format!("request failed: {}", e))
            }
        })?;

        let body = Self::check_response(response).await?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse events: {}", e))
        })
    }

    /// Maps HTTP status codes onto the error taxonomy and returns the body.
    async fn check_response(response: reqwest::Response) -> ProviderResult<String> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            )));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::authentication(
                "access token expired or invalid",
            ));
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::authorization("access denied to calendar"));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::not_found("calendar not found"));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::server(format!(
                "API error ({}): {}",
                status, body
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))
    }
}

/// Converts an API event into a processed [`CalendarEvent`].
fn convert_event(event: ApiEvent, calendar_id: &str, calendar_name: &str) -> Option<CalendarEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let id = event.id?;
    let start = parse_event_time(&event.start, &id, "start")?;
    let end = parse_event_time(&event.end, &id, "end")?;
    let attendees = event.attendees.map(|a| a.len()).unwrap_or(0);

    let mut processed = CalendarEvent::new(id, event.summary, start, end, calendar_id, calendar_name)
        .with_attendees(attendees);
    if let Some(description) = event.description {
        processed = processed.with_description(description);
    }
    if let Some(location) = event.location {
        processed = processed.with_location(location);
    }

    Some(processed)
}

fn parse_event_time(time: &ApiEventTime, event_id: &str, which: &str) -> Option<EventTime> {
    match (&time.date_time, &time.date) {
        (Some(dt), _) => {
            let parsed = DateTime::parse_from_rfc3339(dt)
                .map_err(|e| warn!("event {} has unparseable {} time: {}", event_id, which, e))
                .ok()?;
            Some(EventTime::from_datetime(parsed))
        }
        (None, Some(date)) => {
            let parsed = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| warn!("event {} has unparseable {} date: {}", event_id, which, e))
                .ok()?;
            Some(EventTime::from_date(parsed))
        }
        (None, None) => {
            warn!("event {} has no {} time", event_id, which);
            None
        }
    }
}

/// Response from the userinfo endpoint.
#[derive(Debug, Deserialize)]
struct UserinfoResponse {
    id: String,
    email: String,
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
    status: Option<String>,
    attendees: Option<Vec<ApiAttendee>>,
}

/// Event time from the API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

/// Attendee from the API. Only the count is used.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    #[serde(default)]
    #[allow(dead_code)]
    email: Option<String>,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<ApiCalendarEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCalendarEntry {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    #[serde(default)]
    primary: bool,
    access_role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parse_event_list_response() {
        let json = r#"{
            "items": [
                {
                    "id": "event1",
                    "summary": "Planning",
                    "start": { "dateTime": "2025-03-15T10:00:00Z" },
                    "end": { "dateTime": "2025-03-15T11:00:00Z" },
                    "status": "confirmed",
                    "attendees": [ { "email": "a@x.com" }, { "email": "b@x.com" } ]
                }
            ]
        }"#;

        let response: EventListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 1);

        let event = convert_event(
            response.items.into_iter().next().unwrap(),
            "primary",
            "Primary",
        )
        .unwrap();
        assert_eq!(event.summary, "Planning");
        assert_eq!(event.attendees, 2);
        assert!(!event.is_all_day);
        assert_eq!(event.calendar_name, "Primary");
    }

    #[test]
    fn cancelled_events_are_skipped() {
        let json = r#"{
            "id": "event1",
            "status": "cancelled",
            "start": { "dateTime": "2025-03-15T10:00:00Z" },
            "end": { "dateTime": "2025-03-15T11:00:00Z" }
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(convert_event(event, "primary", "Primary").is_none());
    }

    #[test]
    fn all_day_events_convert() {
        let json = r#"{
            "id": "event1",
            "summary": "Offsite",
            "start": { "date": "2025-03-15" },
            "end": { "date": "2025-03-16" }
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let converted = convert_event(event, "primary", "Primary").unwrap();
        assert!(converted.is_all_day);
    }

    #[test]
    fn events_without_times_are_skipped() {
        let json = r#"{ "id": "event1", "summary": "Broken" }"#;
        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(convert_event(event, "primary", "Primary").is_none());
    }

    #[test]
    fn untitled_event_gets_placeholder() {
        let json = r#"{
            "id": "event1",
            "start": { "dateTime": "2025-03-15T10:00:00Z" },
            "end": { "dateTime": "2025-03-15T11:00:00Z" }
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let converted = convert_event(event, "primary", "Primary").unwrap();
        assert_eq!(converted.summary, "No Title");
        assert_eq!(
            converted.start,
            EventTime::from_datetime(Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn listing_resolves_primary() {
        let entries = vec![
            CalendarListEntry {
                id: "me@x.com".into(),
                summary: "My Calendar".into(),
                description: None,
                primary: true,
                access_role: "owner".into(),
            },
            CalendarListEntry {
                id: "work@x.com".into(),
                summary: "Work".into(),
                description: None,
                primary: false,
                access_role: "reader".into(),
            },
        ];

        let listing = CalendarListing::from_entries(entries);
        assert_eq!(listing.total_calendars, 2);
        assert_eq!(listing.primary_calendar, "me@x.com");
        assert_eq!(listing.name_of("work@x.com"), Some("Work"));
    }

    #[test]
    fn listing_falls_back_to_primary_keyword() {
        let listing = CalendarListing::from_entries(vec![]);
        assert_eq!(listing.primary_calendar, "primary");
    }

    #[test]
    fn parse_calendar_list() {
        let json = r#"{
            "items": [
                { "id": "primary", "summary": "My Calendar", "primary": true, "accessRole": "owner" },
                { "id": "work@example.com" }
            ]
        }"#;

        let response: CalendarListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 2);
        assert!(response.items[0].primary);
        assert_eq!(response.items[0].access_role.as_deref(), Some("owner"));
        assert!(response.items[1].summary.is_none());
    }

    #[test]
    fn parse_userinfo() {
        let json = r#"{ "id": "106111", "email": "a@x.com", "verified_email": true }"#;
        let info: UserinfoResponse = serde_json::from_str(json).unwrap();
        assert_eq!(info.id, "106111");
        assert_eq!(info.email, "a@x.com");
    }
}

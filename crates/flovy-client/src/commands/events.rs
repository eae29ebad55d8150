//! Calendar events and analytics command.

use crate::commands::google_service;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Fetches events for the selected calendars and prints the analytics.
pub async fn run(days: i64, json: bool, config: &ClientConfig) -> ClientResult<()> {
    if days <= 0 {
        return Err(ClientError::Usage("--days must be positive".to_string()));
    }

    let service = google_service(config)?;
    let data = service.fetch_data(days).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&data)
            .map_err(|e| ClientError::Config(format!("failed to render JSON: {}", e)))?;
        println!("{}", rendered);
        return Ok(());
    }

    let analytics = &data.analytics;
    println!(
        "{} events over the last {} days ({} calendar(s))",
        analytics.total_events,
        data.date_range.days,
        data.calendars_used.len()
    );
    println!(
        "  all-day: {}   with attendees: {}   avg attendees: {}",
        analytics.all_day_events, analytics.events_with_attendees, analytics.average_attendees
    );

    if !analytics.events_by_calendar.is_empty() {
        println!();
        println!("Events by calendar:");
        for (calendar, count) in &analytics.events_by_calendar {
            println!("  {:30} {}", calendar, count);
        }
    }

    if !analytics.events_by_day_of_week.is_empty() {
        println!();
        println!("Events by day of week:");
        for (day, count) in &analytics.events_by_day_of_week {
            println!("  {:30} {}", day, count);
        }
    }

    Ok(())
}

//! Calendar listing and selection commands.

use crate::cli::CalendarsAction;
use crate::commands::google_service;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Dispatches a calendars subcommand.
pub async fn run(action: CalendarsAction, config: &ClientConfig) -> ClientResult<()> {
    let service = google_service(config)?;

    match action {
        CalendarsAction::List => {
            let listing = service.list_calendars().await?;
            let selected = service.store().selected_calendars();

            println!(
                "{} calendar(s), primary: {}",
                listing.total_calendars, listing.primary_calendar
            );
            for calendar in &listing.calendars {
                let marker = if selected.iter().any(|id| id == &calendar.id) {
                    "[x]"
                } else {
                    "[ ]"
                };
                let primary = if calendar.primary { " (primary)" } else { "" };
                println!(
                    "  {} {}{}  ({}, {})",
                    marker, calendar.summary, primary, calendar.id, calendar.access_role
                );
            }
            println!();
            println!("Selected: {}", selected.join(", "));
        }
        CalendarsAction::Select { calendar_ids } => {
            service.store().set_selected_calendars(calendar_ids.clone())?;
            println!("Selected {} calendar(s).", calendar_ids.len());
        }
    }

    Ok(())
}

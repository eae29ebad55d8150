//! AI suggestion command.

use chrono::Utc;
use tracing::warn;

use flovy_core::NoteKind;
use flovy_providers::ai::{
    AiConfig, CalendarSlot, SuggestionClient, SuggestionModel, UserPreferences, UserProfile,
};

use crate::commands::{data_dir, google_service};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::notes::NotesStore;

/// Number of goals/tasks/events included in the prompt.
const PROMPT_ITEM_LIMIT: usize = 3;
const PROMPT_EVENT_LIMIT: usize = 5;

/// Generates a productivity suggestion from notes and today's calendar.
pub async fn run(
    model: Option<String>,
    name: Option<String>,
    config: &ClientConfig,
) -> ClientResult<()> {
    let model = match model.or_else(|| config.ai.model.clone()) {
        Some(value) => value
            .parse::<SuggestionModel>()
            .map_err(ClientError::Usage)?,
        None => SuggestionModel::default(),
    };

    let profile = build_profile(name, config).await?;

    let ai_config = AiConfig {
        openai_api_key: config.openai_api_key().map_err(ClientError::Config)?,
        gemini_api_key: config.gemini_api_key().map_err(ClientError::Config)?,
        timeout: None,
    };

    let client = SuggestionClient::new(ai_config)?;
    let response = client.generate(&profile, model).await?;

    println!("{}", response.suggestion);
    if let Some(ref reasoning) = response.reasoning {
        println!();
        println!("({})", reasoning);
    }
    if response.is_mock {
        println!();
        println!("note: generated without an AI backend; add an API key to [ai] in config.toml");
    }

    Ok(())
}

/// Assembles the user profile from notes and, when available, today's
/// calendar events. Missing pieces degrade to sensible defaults rather
/// than blocking the suggestion.
async fn build_profile(name: Option<String>, config: &ClientConfig) -> ClientResult<UserProfile> {
    let user = config.user_id();
    let notes = NotesStore::open(&data_dir(config), &user)?;

    let mut goals: Vec<String> = notes
        .notes()
        .iter()
        .filter(|n| n.kind == NoteKind::Goal && !n.completed)
        .take(PROMPT_ITEM_LIMIT)
        .map(|n| n.title.clone())
        .collect();
    if goals.is_empty() {
        goals = vec![
            "Improve productivity".to_string(),
            "Complete daily tasks".to_string(),
            "Maintain work-life balance".to_string(),
        ];
    }

    let mut recent_tasks: Vec<String> = notes
        .stats()
        .recent_notes
        .iter()
        .take(PROMPT_ITEM_LIMIT)
        .map(|n| n.title.clone())
        .collect();
    if recent_tasks.is_empty() {
        recent_tasks = vec![
            "Set up flovy".to_string(),
            "Connected calendar".to_string(),
        ];
    }

    let calendar_events = todays_events(config).await;

    Ok(UserProfile {
        name: name.unwrap_or_else(|| user.to_string()),
        goals,
        recent_tasks,
        calendar_events,
        preferences: UserPreferences {
            preferred_work_hours: Some("9-5".to_string()),
            ideal_energy_levels: Some("High energy in morning".to_string()),
            focus_time: Some("Morning hours".to_string()),
        },
    })
}

/// Today's events from the active calendar account, or empty when no
/// account is linked or the fetch fails.
async fn todays_events(config: &ClientConfig) -> Vec<CalendarSlot> {
    let service = match google_service(config) {
        Ok(service) if service.is_authenticated() => service,
        _ => return Vec::new(),
    };

    let data = match service.fetch_data(1).await {
        Ok(data) => data,
        Err(e) => {
            warn!("could not fetch calendar data for suggestion: {}", e);
            return Vec::new();
        }
    };

    let today = Utc::now().date_naive();
    data.events
        .iter()
        .filter(|e| e.start.date() == today)
        .take(PROMPT_EVENT_LIMIT)
        .map(|e| CalendarSlot {
            title: e.summary.clone(),
            start_time: e.start.to_utc_datetime().to_rfc3339(),
            end_time: e.end.to_utc_datetime().to_rfc3339(),
        })
        .collect()
}

//! Prompt construction for suggestion generation.

use super::UserProfile;

/// System prompt shared by both backends.
pub const SYSTEM_PROMPT: &str = "You're a personal productivity assistant. Based on the user's \
goals, calendar, and recent progress, suggest what they should focus on today. Format your \
response using markdown for better readability - use **bold** for emphasis, bullet points for \
lists, and proper headings if needed. Use relevant emojis throughout your response to make it \
more engaging and visually appealing. Provide detailed, actionable advice.";

/// Renders the user-profile prompt.
pub fn build_user_prompt(profile: &UserProfile) -> String {
    let events = profile
        .calendar_events
        .iter()
        .map(|e| format!("- {} ({} - {})", e.title, e.start_time, e.end_time))
        .collect::<Vec<_>>()
        .join("\n");

    let preferences = serde_json::to_string_pretty(&profile.preferences)
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        "User Profile:\nName: {}\n\nGoals: {}\n\nRecent Tasks: {}\n\n\
        Calendar Events Today:\n{}\n\nPreferences: {}\n\n\
        Based on this information, what should {} focus on today?",
        profile.name,
        profile.goals.join(", "),
        profile.recent_tasks.join(", "),
        events,
        preferences,
        profile.name,
    )
}

//! Notes and goals.
//!
//! Notes are lightweight per-user items (goals, reminders, plain notes)
//! with a priority and completion flag. This module holds the types plus
//! the pure stats/context computations; persistence lives with the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// What kind of item a note is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    /// A goal the user is working toward.
    Goal,
    /// A plain note.
    Note,
    /// A reminder.
    Reminder,
}

/// Note priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A single note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique note id.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Kind of item.
    #[serde(rename = "type")]
    pub kind: NoteKind,
    /// Priority.
    pub priority: Priority,
    /// Whether the item is done.
    pub completed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Summary statistics over a set of notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesStats {
    /// Total number of notes.
    pub total_notes: usize,
    /// Goals not yet completed.
    pub active_goals: usize,
    /// Completed goals.
    pub completed_goals: usize,
    /// Open high-priority items.
    pub high_priority_items: usize,
    /// The five most recently updated notes.
    pub recent_notes: Vec<Note>,
}

impl NotesStats {
    /// Number of recent notes kept in the summary.
    pub const RECENT_LIMIT: usize = 5;

    /// Computes stats over the given notes.
    pub fn compute(notes: &[Note]) -> Self {
        let mut recent: Vec<Note> = notes.to_vec();
        recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        recent.truncate(Self::RECENT_LIMIT);

        Self {
            total_notes: notes.len(),
            active_goals: notes
                .iter()
                .filter(|n| n.kind == NoteKind::Goal && !n.completed)
                .count(),
            completed_goals: notes
                .iter()
                .filter(|n| n.kind == NoteKind::Goal && n.completed)
                .count(),
            high_priority_items: notes
                .iter()
                .filter(|n| n.priority == Priority::High && !n.completed)
                .count(),
            recent_notes: recent,
        }
    }
}

/// Coarse time-of-day flags used when building suggestion context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeContext {
    pub current_hour: u32,
    pub is_work_hours: bool,
    pub is_morning: bool,
    pub is_afternoon: bool,
    pub is_evening: bool,
}

impl TimeContext {
    /// Builds the time context for a local hour of day (0-23).
    pub fn for_hour(hour: u32) -> Self {
        Self {
            current_hour: hour,
            is_work_hours: (9..=17).contains(&hour),
            is_morning: (6..12).contains(&hour),
            is_afternoon: (12..18).contains(&hour),
            is_evening: (18..22).contains(&hour),
        }
    }
}

/// Notes context handed to the suggestion generator.
///
/// High-priority goals are always relevant; medium-priority goals only
/// during work hours. Recent activity covers the last 24 hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiContext {
    pub time_context: TimeContext,
    pub relevant_goals: Vec<Note>,
    pub high_priority_items: Vec<Note>,
    pub recent_activity: Vec<Note>,
}

impl AiContext {
    /// Builds the context for the given notes at the given local time.
    pub fn build(notes: &[Note], now: DateTime<Utc>, local_hour: u32) -> Self {
        let time_context = TimeContext::for_hour(local_hour);

        let relevant_goals = notes
            .iter()
            .filter(|n| n.kind == NoteKind::Goal && !n.completed)
            .filter(|n| match n.priority {
                Priority::High => true,
                Priority::Medium => time_context.is_work_hours,
                Priority::Low => false,
            })
            .cloned()
            .collect();

        let high_priority_items = notes
            .iter()
            .filter(|n| n.priority == Priority::High && !n.completed)
            .cloned()
            .collect();

        let mut recent_activity: Vec<Note> = notes
            .iter()
            .filter(|n| now - n.updated_at <= Duration::hours(24))
            .cloned()
            .collect();
        recent_activity.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Self {
            time_context,
            relevant_goals,
            high_priority_items,
            recent_activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn note(id: &str, kind: NoteKind, priority: Priority, completed: bool, day: u32) -> Note {
        let at = Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap();
        Note {
            id: id.to_string(),
            title: format!("Note {id}"),
            content: String::new(),
            kind,
            priority,
            completed,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn stats_count_goals_and_priorities() {
        let notes = vec![
            note("1", NoteKind::Goal, Priority::High, false, 10),
            note("2", NoteKind::Goal, Priority::Medium, true, 11),
            note("3", NoteKind::Reminder, Priority::High, false, 12),
            note("4", NoteKind::Note, Priority::Low, false, 13),
        ];

        let stats = NotesStats::compute(&notes);
        assert_eq!(stats.total_notes, 4);
        assert_eq!(stats.active_goals, 1);
        assert_eq!(stats.completed_goals, 1);
        assert_eq!(stats.high_priority_items, 2);
        // Most recently updated first.
        assert_eq!(stats.recent_notes[0].id, "4");
    }

    #[test]
    fn recent_notes_capped_at_five() {
        let notes: Vec<Note> = (1..=8)
            .map(|d| note(&d.to_string(), NoteKind::Note, Priority::Low, false, d))
            .collect();

        let stats = NotesStats::compute(&notes);
        assert_eq!(stats.recent_notes.len(), NotesStats::RECENT_LIMIT);
        assert_eq!(stats.recent_notes[0].id, "8");
    }

    #[test]
    fn medium_goals_relevant_only_in_work_hours() {
        let notes = vec![
            note("high", NoteKind::Goal, Priority::High, false, 10),
            note("medium", NoteKind::Goal, Priority::Medium, false, 10),
            note("low", NoteKind::Goal, Priority::Low, false, 10),
        ];
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 13, 0, 0).unwrap();

        let at_work = AiContext::build(&notes, now, 14);
        let ids: Vec<&str> = at_work.relevant_goals.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "medium"]);

        let at_night = AiContext::build(&notes, now, 22);
        let ids: Vec<&str> = at_night.relevant_goals.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["high"]);
    }

    #[test]
    fn recent_activity_is_last_24_hours() {
        let fresh = note("fresh", NoteKind::Note, Priority::Low, false, 10);
        let stale = note("stale", NoteKind::Note, Priority::Low, false, 1);
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap();

        let context = AiContext::build(&[fresh, stale], now, 18);
        assert_eq!(context.recent_activity.len(), 1);
        assert_eq!(context.recent_activity[0].id, "fresh");
    }

    #[test]
    fn time_context_boundaries() {
        assert!(TimeContext::for_hour(9).is_work_hours);
        assert!(TimeContext::for_hour(17).is_work_hours);
        assert!(!TimeContext::for_hour(18).is_work_hours);
        assert!(TimeContext::for_hour(6).is_morning);
        assert!(TimeContext::for_hour(21).is_evening);
        assert!(!TimeContext::for_hour(23).is_evening);
    }
}

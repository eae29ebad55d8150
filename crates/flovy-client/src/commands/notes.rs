//! Notes commands.

use flovy_core::{NoteKind, Priority};

use crate::cli::NotesAction;
use crate::commands::data_dir;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::notes::NotesStore;

/// Dispatches a notes subcommand.
pub fn run(action: NotesAction, config: &ClientConfig) -> ClientResult<()> {
    let store = NotesStore::open(&data_dir(config), &config.user_id())?;

    match action {
        NotesAction::Add {
            title,
            content,
            kind,
            priority,
        } => {
            let kind = parse_kind(&kind)?;
            let priority = parse_priority(&priority)?;
            let note = store.add(title, content, kind, priority)?;
            println!("Added note {} ({}).", note.title, note.id);
        }
        NotesAction::List => {
            let notes = store.notes();
            if notes.is_empty() {
                println!("No notes yet. Add one with 'flovy notes add <title>'.");
                return Ok(());
            }

            for note in &notes {
                let check = if note.completed { "x" } else { " " };
                println!(
                    "[{}] {}  ({:?}, {:?})  {}",
                    check, note.title, note.kind, note.priority, note.id
                );
            }

            let stats = store.stats();
            println!();
            println!(
                "{} note(s), {} active goal(s), {} high-priority item(s)",
                stats.total_notes, stats.active_goals, stats.high_priority_items
            );
        }
        NotesAction::Done { id } => {
            if store.complete(&id)? {
                println!("Done.");
            } else {
                return Err(ClientError::Usage(format!("no note with id {}", id)));
            }
        }
        NotesAction::Remove { id } => {
            if store.remove(&id)? {
                println!("Removed.");
            } else {
                return Err(ClientError::Usage(format!("no note with id {}", id)));
            }
        }
    }

    Ok(())
}

fn parse_kind(value: &str) -> ClientResult<NoteKind> {
    match value.to_ascii_lowercase().as_str() {
        "goal" => Ok(NoteKind::Goal),
        "note" => Ok(NoteKind::Note),
        "reminder" => Ok(NoteKind::Reminder),
        other => Err(ClientError::Usage(format!(
            "unknown kind '{}' (expected goal, note, or reminder)",
            other
        ))),
    }
}

fn parse_priority(value: &str) -> ClientResult<Priority> {
    match value.to_ascii_lowercase().as_str() {
        "high" => Ok(Priority::High),
        "medium" => Ok(Priority::Medium),
        "low" => Ok(Priority::Low),
        other => Err(ClientError::Usage(format!(
            "unknown priority '{}' (expected high, medium, or low)",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_priority_parsing() {
        assert_eq!(parse_kind("Goal").unwrap(), NoteKind::Goal);
        assert_eq!(parse_priority("HIGH").unwrap(), Priority::High);
        assert!(parse_kind("task").is_err());
        assert!(parse_priority("urgent").is_err());
    }
}

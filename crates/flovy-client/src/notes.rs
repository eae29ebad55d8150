//! Per-user notes persistence.
//!
//! Notes are stored in a per-user JSON file next to the calendar account
//! files. The note types and stats computations live in `flovy-core`;
//! this module only adds the file-backed CRUD.

use std::path::{Path, PathBuf};

use chrono::Utc;
use flovy_core::{AiContext, Note, NoteKind, NotesStats, Priority, UserId};
use flovy_providers::ProviderResult;
use flovy_providers::storage::JsonStore;

/// File-backed notes for one user.
#[derive(Debug)]
pub struct NotesStore {
    store: JsonStore<Vec<Note>>,
}

impl NotesStore {
    /// Opens (and loads) the notes file for the given user.
    pub fn open(data_dir: &Path, user: &UserId) -> ProviderResult<Self> {
        let store = JsonStore::new(Self::path(data_dir, user));
        store.load()?;
        Ok(Self { store })
    }

    /// The notes file path for a user.
    pub fn path(data_dir: &Path, user: &UserId) -> PathBuf {
        data_dir.join(format!("notes-{}.json", user.file_key()))
    }

    /// All notes.
    pub fn notes(&self) -> Vec<Note> {
        self.store.get().unwrap_or_default()
    }

    /// Adds a note and returns it.
    pub fn add(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
        kind: NoteKind,
        priority: Priority,
    ) -> ProviderResult<Note> {
        let now = Utc::now();
        let note = Note {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            kind,
            priority,
            completed: false,
            created_at: now,
            updated_at: now,
        };

        let added = note.clone();
        self.store.update(|notes| notes.push(note))?;
        Ok(added)
    }

    /// Marks a note as completed. Returns false when the id is unknown.
    pub fn complete(&self, id: &str) -> ProviderResult<bool> {
        let mut found = false;
        self.store.update(|notes| {
            if let Some(note) = notes.iter_mut().find(|n| n.id == id) {
                note.completed = true;
                note.updated_at = Utc::now();
                found = true;
            }
        })?;
        Ok(found)
    }

    /// Removes a note. Returns false when the id is unknown.
    pub fn remove(&self, id: &str) -> ProviderResult<bool> {
        let mut found = false;
        self.store.update(|notes| {
            let before = notes.len();
            notes.retain(|n| n.id != id);
            found = notes.len() != before;
        })?;
        Ok(found)
    }

    /// Stats over the stored notes.
    pub fn stats(&self) -> NotesStats {
        NotesStats::compute(&self.notes())
    }

    /// Suggestion context for the stored notes at the given local hour.
    pub fn ai_context(&self, local_hour: u32) -> AiContext {
        AiContext::build(&self.notes(), Utc::now(), local_hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> NotesStore {
        NotesStore::open(dir.path(), &UserId::new("u1")).unwrap()
    }

    #[test]
    fn add_list_complete_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let note = store
            .add("Ship v1", "Finish the release", NoteKind::Goal, Priority::High)
            .unwrap();
        store
            .add("Water plants", "", NoteKind::Reminder, Priority::Low)
            .unwrap();

        assert_eq!(store.notes().len(), 2);
        assert_eq!(store.stats().active_goals, 1);

        assert!(store.complete(&note.id).unwrap());
        assert_eq!(store.stats().active_goals, 0);
        assert_eq!(store.stats().completed_goals, 1);

        assert!(store.remove(&note.id).unwrap());
        assert_eq!(store.notes().len(), 1);

        assert!(!store.complete("unknown-id").unwrap());
        assert!(!store.remove("unknown-id").unwrap());
    }

    #[test]
    fn notes_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = store_in(&dir);
            store
                .add("Remember", "", NoteKind::Note, Priority::Medium)
                .unwrap();
        }

        let reopened = store_in(&dir);
        assert_eq!(reopened.notes().len(), 1);
        assert_eq!(reopened.notes()[0].title, "Remember");
    }

    #[test]
    fn notes_are_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let ada = NotesStore::open(dir.path(), &UserId::new("ada")).unwrap();
        let bob = NotesStore::open(dir.path(), &UserId::new("bob")).unwrap();

        ada.add("Ada's note", "", NoteKind::Note, Priority::Low).unwrap();
        assert_eq!(ada.notes().len(), 1);
        assert!(bob.notes().is_empty());
    }

    #[test]
    fn corrupt_notes_file_recovers_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = NotesStore::path(dir.path(), &UserId::new("u1"));
        std::fs::write(&path, "[{ broken").unwrap();

        let store = store_in(&dir);
        assert!(store.notes().is_empty());
        assert!(!path.exists());
    }
}

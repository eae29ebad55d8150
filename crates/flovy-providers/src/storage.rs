//! Atomic JSON file persistence.
//!
//! [`JsonStore`] is the file-backed store behind calendar accounts,
//! selected-calendar sets, and notes: one JSON document per file, written
//! atomically (temp file + rename) with restrictive permissions.
//!
//! A corrupt file is not fatal: it is removed and the store reinitializes
//! to empty, so a bad write never wedges the feature.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

/// A file-backed JSON store for a single value.
#[derive(Debug)]
pub struct JsonStore<T> {
    path: PathBuf,
    value: RwLock<Option<T>>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Creates a store at the given path. Nothing is read until [`load`].
    ///
    /// [`load`]: JsonStore::load
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            value: RwLock::new(None),
        }
    }

    /// Loads the value from disk into memory.
    ///
    /// Returns `Ok(true)` if a value was loaded, `Ok(false)` if no file
    /// exists. A file that fails to parse is removed and treated as
    /// absent.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!("no store file at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::storage(format!("failed to read {:?}: {}", self.path, e))
        })?;

        match serde_json::from_str::<T>(&content) {
            Ok(value) => {
                debug!("loaded store from {:?}", self.path);
                *self.value.write().unwrap() = Some(value);
                Ok(true)
            }
            Err(e) => {
                warn!("corrupt store file {:?} ({}), removing", self.path, e);
                let _ = fs::remove_file(&self.path);
                *self.value.write().unwrap() = None;
                Ok(false)
            }
        }
    }

    /// Returns a clone of the current value, if any.
    pub fn get(&self) -> Option<T> {
        self.value.read().unwrap().clone()
    }

    /// Sets a new value and saves it to disk.
    pub fn set(&self, value: T) -> ProviderResult<()> {
        *self.value.write().unwrap() = Some(value);
        self.save()
    }

    /// Mutates the current value (or a default) and saves the result.
    pub fn update<F>(&self, f: F) -> ProviderResult<()>
    where
        T: Default,
        F: FnOnce(&mut T),
    {
        let mut guard = self.value.write().unwrap();
        let value = guard.get_or_insert_with(T::default);
        f(value);
        drop(guard);
        self.save()
    }

    /// Saves the current value to disk.
    fn save(&self) -> ProviderResult<()> {
        let value = self.value.read().unwrap();
        let value = value
            .as_ref()
            .ok_or_else(|| ProviderError::internal("no value to save"))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::storage(format!("failed to create {:?}: {}", parent, e))
            })?;
        }

        // Write to a temp file first, then rename for atomicity.
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| ProviderError::internal(format!("failed to serialize store: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::storage(format!("failed to write {:?}: {}", temp_path, e))
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::storage(format!("failed to rename into {:?}: {}", self.path, e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        debug!("saved store to {:?}", self.path);
        Ok(())
    }

    /// Clears the value, both in memory and on disk.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.value.write().unwrap() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::storage(format!("failed to remove {:?}: {}", self.path, e))
            })?;
            info!("cleared store at {:?}", self.path);
        }
        Ok(())
    }

    /// Returns the store path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    fn store_in(dir: &tempfile::TempDir) -> JsonStore<Sample> {
        JsonStore::new(dir.path().join("sample.json"))
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store
            .set(Sample {
                name: "a".into(),
                count: 3,
            })
            .unwrap();

        let reloaded = store_in(&dir);
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.get().unwrap().count, 3);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(!store.load().unwrap());
        assert!(store.get().is_none());
    }

    #[test]
    fn corrupt_file_is_removed_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        fs::write(&path, "{ not json").unwrap();

        let store: JsonStore<Sample> = JsonStore::new(&path);
        assert!(!store.load().unwrap());
        assert!(!path.exists());
        assert!(store.get().is_none());
    }

    #[test]
    fn update_starts_from_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.update(|s| s.count += 1).unwrap();
        store.update(|s| s.count += 1).unwrap();
        assert_eq!(store.get().unwrap().count, 2);
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.set(Sample::default()).unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.get().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set(Sample::default()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

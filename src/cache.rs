use std::sync::Arc;

use crate::error::StorageError;
use crate::model::AnonymousFavoriteEntry;
use crate::storage::{ClientStorage, FAVORITES_KEY};

/// Ordered favorite set mirrored into durable storage under `favorites`.
#[derive(Debug, Clone)]
pub struct LocalFavoriteCache {
    storage: Arc<ClientStorage>,
}

impl LocalFavoriteCache {
    pub fn new(storage: Arc<ClientStorage>) -> Self {
        LocalFavoriteCache { storage }
    }

    pub fn entries(&self) -> Vec<AnonymousFavoriteEntry> {
        let Some(raw) = self.storage.durable.get(FAVORITES_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Option<Vec<AnonymousFavoriteEntry>>>(&raw) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable favorites blob, treating as empty");
                Vec::new()
            }
        }
    }

    pub fn contains(&self, name: &str, state: &str) -> bool {
        self.entries()
            .iter()
            .any(|entry| entry.name == name && entry.state == state)
    }

    /// Inserts the entry if absent, removes it if present. Returns the new membership.
    pub fn toggle(&self, name: &str, state: &str) -> Result<bool, StorageError> {
        let mut entries = self.entries();
        let present = match entries
            .iter()
            .position(|entry| entry.name == name && entry.state == state)
        {
            Some(index) => {
                entries.remove(index);
                false
            }
            None => {
                entries.push(AnonymousFavoriteEntry {
                    name: name.to_string(),
                    state: state.to_string(),
                });
                true
            }
        };
        self.write(&entries)?;
        tracing::debug!(name, state, present, "toggled local favorite");
        Ok(present)
    }

    /// Adds the entry unless it is already there. Returns whether storage changed.
    pub fn insert(&self, name: &str, state: &str) -> Result<bool, StorageError> {
        let mut entries = self.entries();
        if entries.iter().any(|entry| entry.name == name && entry.state == state) {
            return Ok(false);
        }
        entries.push(AnonymousFavoriteEntry {
            name: name.to_string(),
            state: state.to_string(),
        });
        self.write(&entries)?;
        Ok(true)
    }

    pub fn remove(&self, name: &str, state: &str) -> Result<bool, StorageError> {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|entry| !(entry.name == name && entry.state == state));
        if entries.len() == before {
            return Ok(false);
        }
        self.write(&entries)?;
        Ok(true)
    }

    pub fn replace_all(&self, entries: Vec<AnonymousFavoriteEntry>) -> Result<(), StorageError> {
        let mut deduped: Vec<AnonymousFavoriteEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if !deduped.contains(&entry) {
                deduped.push(entry);
            }
        }
        self.write(&deduped)
    }

    fn write(&self, entries: &[AnonymousFavoriteEntry]) -> Result<(), StorageError> {
        let blob = serde_json::to_string(entries)?;
        self.storage.durable.set(FAVORITES_KEY, blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache(dir: &TempDir) -> LocalFavoriteCache {
        LocalFavoriteCache::new(Arc::new(ClientStorage::open(dir.path()).unwrap()))
    }

    #[test]
    fn double_toggle_restores_membership_through_storage() {
        let dir = TempDir::new().unwrap();
        let first = cache(&dir);
        first.toggle("Zion", "UT").unwrap();
        let before = first.entries();

        assert!(first.toggle("Arches", "UT").unwrap());
        drop(first);

        // Reopen between toggles so the round trip goes through the file.
        let second = cache(&dir);
        assert!(second.contains("Arches", "UT"));
        assert!(!second.toggle("Arches", "UT").unwrap());
        drop(second);

        let third = cache(&dir);
        assert_eq!(third.entries(), before);
        assert!(!third.contains("Arches", "UT"));
    }

    #[test]
    fn membership_is_by_name_and_state() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.toggle("Springfield", "IL").unwrap();
        assert!(cache.contains("Springfield", "IL"));
        assert!(!cache.contains("Springfield", "MO"));
    }

    #[test]
    fn insert_and_remove_are_idempotent() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        assert!(cache.insert("Zion", "UT").unwrap());
        assert!(!cache.insert("Zion", "UT").unwrap());
        assert_eq!(cache.entries().len(), 1);

        assert!(cache.remove("Zion", "UT").unwrap());
        assert!(!cache.remove("Zion", "UT").unwrap());
        assert!(cache.entries().is_empty());
    }

    #[test]
    fn replace_all_drops_duplicates() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let entry = AnonymousFavoriteEntry {
            name: "Alcatraz".into(),
            state: "CA".into(),
        };
        cache.replace_all(vec![entry.clone(), entry.clone()]).unwrap();
        assert_eq!(cache.entries(), vec![entry]);
    }

    #[test]
    fn null_blob_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(ClientStorage::open(dir.path()).unwrap());
        storage.durable.set(FAVORITES_KEY, "null".into()).unwrap();
        let cache = LocalFavoriteCache::new(storage);
        assert!(cache.entries().is_empty());
    }
}

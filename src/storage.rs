//! Client-side storage.
//!
//! `DurableStore` plays the part of the browser's `localStorage`: string values
//! under string keys, written through to a JSON file on every change.
//! `SessionStore` is the `sessionStorage` counterpart and only lives as long as
//! the process.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::StorageError;

pub const FAVORITES_KEY: &str = "favorites";
pub const DARK_MODE_KEY: &str = "darkMode";
pub const LOGGED_IN_KEY: &str = "loggedIn";

const STORAGE_FILE: &str = "storage.json";

#[derive(Debug)]
pub struct DurableStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl DurableStore {
    /// Opens (or starts) the store at `<dir>/storage.json`.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        let path = dir.join(STORAGE_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = ?path, keys = entries.len(), "opened durable storage");
        Ok(DurableStore {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().ok()?.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    // Whole-file rewrite through a temp file so readers never see half a blob.
    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStore {
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value);
        }
    }

    pub fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

#[derive(Debug)]
pub struct ClientStorage {
    pub durable: DurableStore,
    pub session: SessionStore,
}

impl ClientStorage {
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        Ok(ClientStorage {
            durable: DurableStore::open(dir)?,
            session: SessionStore::default(),
        })
    }

    pub fn dark_mode(&self) -> bool {
        self.durable.get(DARK_MODE_KEY).as_deref() == Some("true")
    }

    pub fn set_dark_mode(&self, enabled: bool) -> Result<(), StorageError> {
        self.durable.set(DARK_MODE_KEY, enabled.to_string())
    }
}

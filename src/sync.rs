//! Favorite sync controller.
//!
//! Every favorite change on the page goes through `FavoriteSync`. It owns the
//! authoritative `(name, state) -> favorited` map, talks to the remote store,
//! and projects confirmed results onto the document. Favorited status only
//! changes after the store has answered, never before.
//!
//! Adds are serialized by a single page-wide in-flight flag: a second add that
//! arrives while one is outstanding is rejected with
//! `GuardReason::AddInFlight` rather than queued. Removes skip the flag.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::cache::LocalFavoriteCache;
use crate::error::{ClientError, GuardReason, Result};
use crate::model::{FavoriteRecord, PlaceKey};
use crate::remote::FavoriteStore;
use crate::ui::card::FavoriteCard;
use crate::ui::{Document, Page};
use crate::unpack_error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteCommand {
    Add { name: String, state: String, category: String },
    Remove { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// `id` is `None` when the store reported the place as already saved.
    Added { key: PlaceKey, id: Option<String> },
    /// `key` is `None` when nothing on record matched the id.
    Removed { id: String, key: Option<PlaceKey> },
}

#[derive(Debug, Default)]
struct SyncState {
    favorited: HashMap<PlaceKey, bool>,
    ids: HashMap<String, PlaceKey>,
}

/// Releases one loading indicator hold when dropped.
struct Shown<'a>(&'a Mutex<Document>);

impl Drop for Shown<'_> {
    fn drop(&mut self) {
        lock(self.0).indicator.release();
    }
}

/// Owns the in-flight state of one add. Dropping it before the store has
/// answered restores the place's controls; dropping it at all clears the flag.
struct PendingAdd<'a> {
    adding: &'a AtomicBool,
    document: &'a Mutex<Document>,
    key: PlaceKey,
    settled: bool,
}

impl Drop for PendingAdd<'_> {
    fn drop(&mut self) {
        if !self.settled {
            lock(self.document).set_pending(&self.key, false);
        }
        self.adding.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct FavoriteSync<S> {
    store: Arc<S>,
    document: Arc<Mutex<Document>>,
    cache: LocalFavoriteCache,
    state: Mutex<SyncState>,
    adding: AtomicBool,
    indicator_min: Duration,
}

impl<S: FavoriteStore> FavoriteSync<S> {
    pub fn new(
        store: Arc<S>,
        document: Arc<Mutex<Document>>,
        cache: LocalFavoriteCache,
        indicator_min: Duration,
    ) -> Self {
        FavoriteSync {
            store,
            document,
            cache,
            state: Mutex::new(SyncState::default()),
            adding: AtomicBool::new(false),
            indicator_min,
        }
    }

    pub fn is_adding(&self) -> bool {
        self.adding.load(Ordering::Acquire)
    }

    pub fn is_favorited(&self, key: &PlaceKey) -> bool {
        self.state().favorited.get(key).copied().unwrap_or(false)
    }

    pub fn snapshot(&self) -> HashMap<PlaceKey, bool> {
        self.state().favorited.clone()
    }

    /// Forgets everything learned from the store. Used on logout.
    pub fn reset(&self) {
        let mut state = self.state();
        state.favorited.clear();
        state.ids.clear();
    }

    /// Records a favorite that lives only in local storage and shows it on the page.
    pub fn apply_local(&self, key: &PlaceKey, favorited: bool) {
        self.state().favorited.insert(key.clone(), favorited);
        self.document().update_buttons(key, favorited);
    }

    fn state(&self) -> MutexGuard<'_, SyncState> {
        lock(&self.state)
    }

    fn document(&self) -> MutexGuard<'_, Document> {
        lock(&*self.document)
    }

    fn show_indicator(&self) -> Shown<'_> {
        self.document().indicator.show();
        Shown(&*self.document)
    }

    pub async fn dispatch(&self, command: FavoriteCommand) -> Result<SyncOutcome> {
        match command {
            FavoriteCommand::Add { name, state, category } => self.add(&name, &state, &category).await,
            FavoriteCommand::Remove { id } => self.remove(&id).await,
        }
    }

    /// Replaces the favorited map with the remote list and re-projects every control.
    pub async fn refresh(&self) -> Result<Vec<FavoriteRecord>> {
        let records = match self.store.list().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %unpack_error(&e), "failed to fetch favorites");
                return Err(e);
            }
        };

        let favorited = {
            let mut state = self.state();
            state.favorited.clear();
            state.ids.clear();
            for record in &records {
                let key = record.key();
                if let Some(id) = &record.id {
                    state.ids.insert(id.clone(), key.clone());
                }
                state.favorited.insert(key, true);
            }
            state.favorited.clone()
        };
        self.document().project(&favorited);

        tracing::debug!(count = records.len(), "favorite buttons initialised");
        Ok(records)
    }

    pub async fn initialize(&self) -> Result<usize> {
        Ok(self.refresh().await?.len())
    }

    pub async fn add(&self, name: &str, state: &str, category: &str) -> Result<SyncOutcome> {
        let (name, state, category) = (name.trim(), state.trim(), category.trim());
        if name.is_empty() || state.is_empty() || category.is_empty() {
            tracing::debug!(name, state, category, "missing required fields, skipping add");
            return Err(ClientError::Validation(
                "name, state and category are required".to_string(),
            ));
        }

        let key = PlaceKey::new(name, state);
        if self.is_favorited(&key) {
            tracing::info!(%key, "place already favorited, skipping");
            return Err(ClientError::Guard(GuardReason::AlreadyFavorited));
        }
        if self
            .adding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!(%key, "already adding a favorite, dropping request");
            return Err(ClientError::Guard(GuardReason::AddInFlight));
        }
        let mut pending = PendingAdd {
            adding: &self.adding,
            document: &*self.document,
            key: key.clone(),
            settled: false,
        };
        self.document().set_pending(&key, true);
        let _shown = self.show_indicator();

        let outcome = match self.store.add(state, name, category).await {
            Ok(id) => {
                self.confirm_added(&key, category, Some(&id));
                Ok(SyncOutcome::Added { key, id: Some(id) })
            }
            Err(ClientError::Duplicate(_)) => {
                tracing::info!(%key, "store already had this favorite");
                self.confirm_added(&key, category, None);
                Ok(SyncOutcome::Added { key, id: None })
            }
            Err(e) => {
                tracing::error!(%key, error = %unpack_error(&e), "failed to add favorite");
                self.document().set_pending(&key, false);
                Err(e)
            }
        };
        pending.settled = true;

        // The flag stays up until the indicator has had its minimum time.
        self.hold_indicator().await;
        outcome
    }

    fn confirm_added(&self, key: &PlaceKey, category: &str, id: Option<&str>) {
        {
            let mut state = self.state();
            state.favorited.insert(key.clone(), true);
            if let Some(id) = id {
                state.ids.insert(id.to_string(), key.clone());
            }
        }
        self.write_cache(key, true);

        let mut doc = self.document();
        doc.update_buttons(key, true);
        if let Some(id) = id {
            if *doc.page() == Page::Favorites {
                doc.prepend_favorite(FavoriteCard::new(id, &key.name, &key.state, category));
            }
        }
    }

    pub async fn remove(&self, id: &str) -> Result<SyncOutcome> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ClientError::Validation("favorite id is required".to_string()));
        }

        let _shown = self.show_indicator();

        let outcome = match self.store.remove(id).await {
            Ok(()) => {
                let known = self.state().ids.remove(id);
                let mut doc = self.document();
                let key = doc.remove_favorite(id).map(|card| card.key()).or(known);
                if let Some(key) = &key {
                    self.state().favorited.remove(key);
                    self.write_cache(key, false);
                    doc.update_buttons(key, false);
                }
                doc.show_placeholder_if_empty();
                tracing::info!(id, "favorite removed or already gone");
                Ok(SyncOutcome::Removed {
                    id: id.to_string(),
                    key,
                })
            }
            Err(e) => {
                tracing::error!(id, error = %unpack_error(&e), "failed to delete favorite");
                Err(e)
            }
        };

        self.hold_indicator().await;
        outcome
    }

    /// Mirrors a confirmed change into the local cache so it survives logout.
    fn write_cache(&self, key: &PlaceKey, favorited: bool) {
        let result = if favorited {
            self.cache.insert(&key.name, &key.state)
        } else {
            self.cache.remove(&key.name, &key.state)
        };
        if let Err(e) = result {
            tracing::warn!(%key, favorited, error = %unpack_error(&e), "failed to update local favorites");
        }
    }

    async fn hold_indicator(&self) {
        let wait = self.document().indicator.remaining(self.indicator_min);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

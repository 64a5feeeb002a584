//! Application context.
//!
//! `App` holds everything a page session needs: the backend, client storage,
//! the local favorite cache, session state, the document and the sync
//! controller. `open` is page load and `logout` is teardown.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::cache::LocalFavoriteCache;
use crate::config;
use crate::error::{ClientError, Result};
use crate::model::{AnonymousFavoriteEntry, PlaceKey, SessionState};
use crate::remote::{FavoriteStore, SiteApi};
use crate::storage::{ClientStorage, LOGGED_IN_KEY};
use crate::sync::{FavoriteCommand, FavoriteSync, SyncOutcome};
use crate::ui::card::{CardAction, FavoriteCard};
use crate::ui::{Document, Page};
use crate::unpack_error;

const PLACES_ERROR: &str = "Failed to load places. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Synced(SyncOutcome),
    /// Anonymous-mode toggle, kept only in local storage.
    Local { key: PlaceKey, favorited: bool },
    Details {
        name: String,
        category: String,
        state: String,
        favorited: bool,
    },
    ViewOnMaps { name: String, state: String },
}

pub struct App<B> {
    backend: Arc<B>,
    storage: Arc<ClientStorage>,
    cache: LocalFavoriteCache,
    session: Mutex<SessionState>,
    document: Arc<Mutex<Document>>,
    sync: FavoriteSync<B>,
    states: Mutex<Vec<String>>,
    indicator_min: Duration,
}

impl<B: FavoriteStore + SiteApi> App<B> {
    pub fn open(backend: Arc<B>, storage: Arc<ClientStorage>, cfg: &config::App) -> Self {
        let logged_in = storage.session.get(LOGGED_IN_KEY).as_deref() == Some("true");
        let document = Arc::new(Mutex::new(Document::new(Page::Home)));
        let cache = LocalFavoriteCache::new(storage.clone());
        let sync = FavoriteSync::new(backend.clone(), document.clone(), cache.clone(), cfg.indicator_min());

        tracing::info!(logged_in, dark_mode = storage.dark_mode(), "session opened");
        App {
            cache,
            backend,
            storage,
            session: Mutex::new(SessionState { logged_in }),
            document,
            sync,
            states: Mutex::new(Vec::new()),
            indicator_min: cfg.indicator_min(),
        }
    }

    pub fn session(&self) -> SessionState {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn document(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sync(&self) -> &FavoriteSync<B> {
        &self.sync
    }

    pub fn cache(&self) -> &LocalFavoriteCache {
        &self.cache
    }

    pub fn states(&self) -> Vec<String> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn dark_mode(&self) -> bool {
        self.storage.dark_mode()
    }

    pub fn toggle_dark_mode(&self) -> Result<bool> {
        let enabled = !self.storage.dark_mode();
        self.storage.set_dark_mode(enabled)?;
        Ok(enabled)
    }

    fn set_logged_in(&self, logged_in: bool) {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .logged_in = logged_in;
        if logged_in {
            self.storage.session.set(LOGGED_IN_KEY, "true".to_string());
        } else {
            self.storage.session.remove(LOGGED_IN_KEY);
        }
    }

    /// Replaces the page and runs whatever that page loads on arrival.
    pub async fn navigate(&self, page: Page) -> Result<()> {
        tracing::debug!(page = %page, "navigating");
        self.document().navigate(page.clone());

        match page {
            Page::Home => self.load_states().await.map(|_| ()),
            Page::Favorites => self.load_favorites().await.map(|_| ()),
            page if page.shows_favorite_buttons() => self.initialize_favorites().await.map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Derives favorited status from the remote list, or from local storage before login.
    pub async fn initialize_favorites(&self) -> Result<usize> {
        if self.session().logged_in {
            return self.sync.initialize().await;
        }
        self.sync.reset();
        let entries = self.cache.entries();
        for entry in &entries {
            self.sync.apply_local(&entry.key(), true);
        }
        Ok(entries.len())
    }

    pub async fn load_states(&self) -> Result<usize> {
        self.document().indicator.show();
        let result = self.backend.states().await;
        self.release_indicator().await;

        let states = match result {
            Ok(states) => states,
            Err(e) => {
                tracing::error!(error = %unpack_error(&e), "failed to fetch states");
                return Err(e);
            }
        };
        let count = states.len();
        *self.states.lock().unwrap_or_else(PoisonError::into_inner) = states;
        Ok(count)
    }

    /// Renders the favorites list, newest first as the store returns it.
    pub async fn load_favorites(&self) -> Result<usize> {
        if !self.session().logged_in {
            self.document().show_favorites(Vec::new());
            return Ok(0);
        }

        let records = self.sync.refresh().await?;
        let cards: Vec<FavoriteCard> = records.iter().filter_map(FavoriteCard::from_record).collect();
        let count = cards.len();
        self.document().show_favorites(cards);
        Ok(count)
    }

    /// Searches places for a state and renders a card per result.
    pub async fn search(&self, state: &str, category: &str) -> Result<usize> {
        let state = state.trim();
        if state.is_empty() {
            tracing::debug!("no state entered, skipping search");
            return Err(ClientError::Validation("state is required".to_string()));
        }
        let category = match category.trim() {
            "" => "all",
            category => category,
        };

        self.document().indicator.show();
        let result = match self.initialize_favorites().await {
            Ok(_) => self.backend.search(state, category).await,
            Err(e) => Err(e),
        };
        self.release_indicator().await;

        match result {
            Ok(places) => {
                let favorited = self.sync.snapshot();
                let count = self.document().show_places(state, places, &favorited);
                tracing::info!(state, category, count, "places loaded");
                Ok(count)
            }
            Err(e) => {
                tracing::error!(state, category, error = %unpack_error(&e), "failed to load places");
                self.document().show_places_error(PLACES_ERROR);
                Err(e)
            }
        }
    }

    /// Logs in, pushes the anonymous set to the store and lands on the home page.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let remote = self.backend.login(username, password).await?;
        self.set_logged_in(true);

        let anonymous = self.cache.entries();
        if !anonymous.is_empty() {
            self.backend.sync_batch(anonymous.clone());
        }

        let mut merged: Vec<AnonymousFavoriteEntry> = remote.iter().map(AnonymousFavoriteEntry::from).collect();
        merged.extend(anonymous);
        self.cache.replace_all(merged)?;
        self.sync.reset();

        if let Err(e) = self.navigate(Page::Home).await {
            tracing::warn!(error = %unpack_error(&e), "home page failed to load after login");
        }
        Ok(())
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<()> {
        self.backend.register(username, password).await?;
        self.login(username, password).await
    }

    pub fn logout(&self) {
        self.set_logged_in(false);
        self.sync.reset();
        self.document().navigate(Page::Login);
        tracing::info!("logged out");
    }

    /// Favorites a place: through the store when logged in, locally otherwise.
    pub async fn toggle_favorite(&self, name: &str, state: &str, category: &str) -> Result<ActionOutcome> {
        if self.session().logged_in {
            return self.sync.add(name, state, category).await.map(ActionOutcome::Synced);
        }

        let (name, state) = (name.trim(), state.trim());
        if name.is_empty() || state.is_empty() {
            return Err(ClientError::Validation("name and state are required".to_string()));
        }
        let favorited = self.cache.toggle(name, state)?;
        let key = PlaceKey::new(name, state);
        self.sync.apply_local(&key, favorited);
        Ok(ActionOutcome::Local { key, favorited })
    }

    pub async fn delete_favorite(&self, id: &str) -> Result<ActionOutcome> {
        self.sync
            .dispatch(FavoriteCommand::Remove { id: id.to_string() })
            .await
            .map(ActionOutcome::Synced)
    }

    /// Routes a card action to the controller or back to the host.
    pub async fn handle(&self, action: CardAction) -> Result<ActionOutcome> {
        match action {
            CardAction::ShowDetails { name, category, state } => {
                let favorited = self.sync.is_favorited(&PlaceKey::new(&name, &state));
                Ok(ActionOutcome::Details {
                    name,
                    category,
                    state,
                    favorited,
                })
            }
            CardAction::Favorite(FavoriteCommand::Add { name, state, category })
            | CardAction::Delete(FavoriteCommand::Add { name, state, category }) => {
                self.toggle_favorite(&name, &state, &category).await
            }
            CardAction::Favorite(FavoriteCommand::Remove { id })
            | CardAction::Delete(FavoriteCommand::Remove { id }) => self.delete_favorite(&id).await,
            CardAction::ViewOnMaps { name, state } => Ok(ActionOutcome::ViewOnMaps { name, state }),
        }
    }

    async fn release_indicator(&self) {
        let wait = self.document().indicator.remaining(self.indicator_min);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        self.document().indicator.release();
    }
}

//! In-memory page model.
//!
//! `Document` stands in for the rendered page: which page is showing, the
//! loading indicator, the favorite button registry and the two card
//! containers. Every mutation bumps `revision`, which lets callers tell a
//! no-op apart from a change.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut doc = Document::new(Page::Places { state: "CA".into() });
//! doc.show_places("CA", places, &favorited);
//! println!("{}", doc.render_places_html());
//! ```

pub mod card;
pub mod indicator;
pub mod registry;

use std::collections::HashMap;
use std::fmt;

use crate::model::{Place, PlaceKey};
use card::{FavoriteCard, NO_FAVORITES_HTML, NO_PLACES_HTML, PlaceCard};
use indicator::LoadingIndicator;
use registry::{ButtonRegistry, ControlId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Home,
    States,
    Places { state: String },
    Categories,
    Favorites,
    About,
    Login,
}

impl Page {
    pub fn from_path(path: &str) -> Option<Page> {
        let path = path.trim_end_matches('/');
        match path {
            "" | "/index.html" => Some(Page::Home),
            "/states" => Some(Page::States),
            "/categories" => Some(Page::Categories),
            "/favorites" => Some(Page::Favorites),
            "/about" => Some(Page::About),
            "/login" => Some(Page::Login),
            _ => path
                .strip_prefix("/places/")
                .filter(|state| !state.is_empty())
                .map(|state| Page::Places {
                    state: urlencoding::decode(state)
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| state.to_string()),
                }),
        }
    }

    /// Pages whose favorite buttons are initialised from the remote list.
    pub fn shows_favorite_buttons(&self) -> bool {
        matches!(self, Page::Places { .. } | Page::Categories | Page::Favorites)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Page::Home => write!(f, "/"),
            Page::States => write!(f, "/states"),
            Page::Places { state } => write!(f, "/places/{}", urlencoding::encode(state)),
            Page::Categories => write!(f, "/categories"),
            Page::Favorites => write!(f, "/favorites"),
            Page::About => write!(f, "/about"),
            Page::Login => write!(f, "/login"),
        }
    }
}

#[derive(Debug)]
pub struct Document {
    page: Page,
    pub indicator: LoadingIndicator,
    buttons: ButtonRegistry,
    places: Vec<PlaceCard>,
    places_message: Option<String>,
    favorites: Vec<FavoriteCard>,
    favorites_placeholder: bool,
    revision: u64,
}

impl Document {
    pub fn new(page: Page) -> Self {
        Document {
            page,
            indicator: LoadingIndicator::default(),
            buttons: ButtonRegistry::default(),
            places: Vec::new(),
            places_message: None,
            favorites: Vec::new(),
            favorites_placeholder: false,
            revision: 0,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn buttons(&self) -> &ButtonRegistry {
        &self.buttons
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Navigating replaces the page, so every card and control goes away.
    pub fn navigate(&mut self, page: Page) {
        self.page = page;
        self.clear();
    }

    pub fn clear(&mut self) {
        self.buttons.clear();
        self.places.clear();
        self.places_message = None;
        self.favorites.clear();
        self.favorites_placeholder = false;
        self.touch();
    }

    pub fn register_control(&mut self, key: PlaceKey, category: &str, favorited: bool) -> ControlId {
        let id = self.buttons.register(key, category, favorited);
        self.touch();
        id
    }

    pub fn update_buttons(&mut self, key: &PlaceKey, favorited: bool) -> usize {
        let touched = self.buttons.update_all(key, favorited);
        if touched > 0 {
            self.touch();
        }
        touched
    }

    pub fn set_pending(&mut self, key: &PlaceKey, pending: bool) -> usize {
        let touched = self.buttons.set_pending(key, pending);
        if touched > 0 {
            self.touch();
        }
        touched
    }

    pub fn project(&mut self, favorited: &HashMap<PlaceKey, bool>) {
        if self.buttons.project(favorited) > 0 {
            self.touch();
        }
    }

    /// Replaces the places container with one card per place.
    pub fn show_places(&mut self, state: &str, places: Vec<Place>, favorited: &HashMap<PlaceKey, bool>) -> usize {
        for card in self.places.drain(..) {
            self.buttons.unregister(card.control);
        }

        self.places_message = if places.is_empty() {
            Some(NO_PLACES_HTML.to_string())
        } else {
            None
        };

        for place in places {
            let key = PlaceKey::new(&place.name, state);
            let is_favorite = favorited.get(&key).copied().unwrap_or(false);
            let control = self.buttons.register(key, &place.category, is_favorite);
            self.places.push(PlaceCard {
                place,
                state: state.to_string(),
                control,
            });
        }
        self.touch();
        self.places.len()
    }

    pub fn show_places_error(&mut self, message: &str) {
        for card in self.places.drain(..) {
            self.buttons.unregister(card.control);
        }
        self.places_message = Some(format!(
            r#"<p class="error-message">{}</p>"#,
            card::escape_html(message)
        ));
        self.touch();
    }

    pub fn place_cards(&self) -> &[PlaceCard] {
        &self.places
    }

    pub fn show_favorites(&mut self, cards: Vec<FavoriteCard>) {
        self.favorites_placeholder = cards.is_empty();
        self.favorites = cards;
        self.touch();
    }

    pub fn prepend_favorite(&mut self, card: FavoriteCard) {
        self.favorites_placeholder = false;
        self.favorites.insert(0, card);
        self.touch();
    }

    pub fn remove_favorite(&mut self, id: &str) -> Option<FavoriteCard> {
        let index = self.favorites.iter().position(|card| card.id == id)?;
        let card = self.favorites.remove(index);
        self.touch();
        Some(card)
    }

    /// Shows the empty-state message once the favorites page runs out of cards.
    pub fn show_placeholder_if_empty(&mut self) -> bool {
        if self.page != Page::Favorites || !self.favorites.is_empty() || self.favorites_placeholder {
            return false;
        }
        self.favorites_placeholder = true;
        self.touch();
        true
    }

    pub fn favorite_cards(&self) -> &[FavoriteCard] {
        &self.favorites
    }

    pub fn shows_favorites_placeholder(&self) -> bool {
        self.favorites_placeholder
    }

    pub fn render_places_html(&self) -> String {
        if let Some(message) = &self.places_message {
            return message.clone();
        }
        self.places
            .iter()
            .map(|card| card.render(self.buttons.get(card.control)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_favorites_html(&self) -> String {
        if self.favorites_placeholder {
            return NO_FAVORITES_HTML.to_string();
        }
        self.favorites
            .iter()
            .map(FavoriteCard::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

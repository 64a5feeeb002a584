use chrono::{NaiveDate, Utc};

use crate::model::{FavoriteRecord, Place, PlaceKey};
use crate::sync::FavoriteCommand;
use crate::ui::registry::{ControlId, FavoriteControl, LABEL_FAVORITE};

pub const NO_PLACES_HTML: &str = "<p>No places found.</p>";
pub const NO_FAVORITES_HTML: &str = r#"<p class="no-favorites">No favorites saved yet. Start adding some from the <a href="/states">States</a> or <a href="/categories">Categories</a> pages!</p>"#;

/// What a card control asks the host to do when activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardAction {
    ShowDetails { name: String, category: String, state: String },
    Favorite(FavoriteCommand),
    Delete(FavoriteCommand),
    ViewOnMaps { name: String, state: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceCard {
    pub place: Place,
    pub state: String,
    pub control: ControlId,
}

impl PlaceCard {
    pub fn key(&self) -> PlaceKey {
        PlaceKey::new(&self.place.name, &self.state)
    }

    pub fn actions(&self) -> Vec<CardAction> {
        vec![
            CardAction::ShowDetails {
                name: self.place.name.clone(),
                category: self.place.category.clone(),
                state: self.state.clone(),
            },
            CardAction::Favorite(FavoriteCommand::Add {
                name: self.place.name.clone(),
                state: self.state.clone(),
                category: self.place.category.clone(),
            }),
        ]
    }

    /// Renders the card; `control` is the registry entry for its favorite button.
    pub fn render(&self, control: Option<&FavoriteControl>) -> String {
        let name = escape_html(&self.place.name);
        let category = escape_html(&self.place.category);
        let state = escape_html(&self.state);
        let (label, disabled, class) = match control {
            Some(c) => (
                c.label,
                if c.disabled { " disabled" } else { "" },
                if c.favorited { "favorite-btn favorited" } else { "favorite-btn" },
            ),
            None => (LABEL_FAVORITE, "", "favorite-btn"),
        };

        format!(
            r#"<div class="card" data-category="{category}">
  <h3>{name}</h3>
  <p class="category-tag">{category}</p>
  <button class="details-btn" data-name="{name}" data-category="{category}" data-state="{state}">Details</button>
  <button id="{control_id}" class="{class}" data-name="{name}" data-state="{state}" data-category="{category}"{disabled}>{label}</button>
</div>"#,
            control_id = self.control,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteCard {
    pub id: String,
    pub name: String,
    pub state: String,
    pub category: String,
    pub added_on: NaiveDate,
}

impl FavoriteCard {
    pub fn new(id: &str, name: &str, state: &str, category: &str) -> Self {
        FavoriteCard {
            id: id.to_string(),
            name: name.to_string(),
            state: state.to_string(),
            category: category.to_string(),
            added_on: Utc::now().date_naive(),
        }
    }

    /// Records without an id cannot be deleted and get no card.
    pub fn from_record(record: &FavoriteRecord) -> Option<Self> {
        let id = record.id.as_deref()?;
        let mut card = FavoriteCard::new(id, &record.place_name, &record.state, &record.category);
        if let Some(added_at) = record.added_at {
            card.added_on = added_at.date_naive();
        }
        Some(card)
    }

    pub fn key(&self) -> PlaceKey {
        PlaceKey::new(&self.name, &self.state)
    }

    pub fn actions(&self) -> Vec<CardAction> {
        vec![
            CardAction::Delete(FavoriteCommand::Remove { id: self.id.clone() }),
            CardAction::ShowDetails {
                name: self.name.clone(),
                category: self.category.clone(),
                state: self.state.clone(),
            },
            CardAction::ViewOnMaps {
                name: self.name.clone(),
                state: self.state.clone(),
            },
        ]
    }

    pub fn render(&self) -> String {
        let id = escape_html(&self.id);
        let name = escape_html(&self.name);
        let state = escape_html(&self.state);
        let category = escape_html(&self.category);
        let added = self.added_on.format("%Y-%m-%d");

        format!(
            r#"<div class="card" data-id="{id}" data-name="{name}" data-state="{state}" data-category="{category}">
  <div class="card-header">
    <h3>{name}</h3>
    <button class="delete-btn">Delete</button>
  </div>
  <div class="card-body">
    <p><strong>State:</strong> {state}</p>
    <p><strong>Category:</strong> {category}</p>
    <p><strong>Added:</strong> {added}</p>
  </div>
  <div class="card-footer">
    <button class="details-btn">Details</button>
    <button class="maps-btn">View on Maps</button>
  </div>
</div>"#
        )
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::registry::ButtonRegistry;

    #[test]
    fn place_card_reflects_favorited_control() {
        let mut registry = ButtonRegistry::default();
        let control = registry.register(PlaceKey::new("Alcatraz", "CA"), "Historical", true);
        let card = PlaceCard {
            place: Place {
                name: "Alcatraz".into(),
                category: "Historical".into(),
            },
            state: "CA".into(),
            control,
        };

        let html = card.render(registry.get(control));
        assert!(html.contains("favorite-btn favorited"));
        assert!(html.contains(" disabled>Favorited</button>"));
    }

    #[test]
    fn favorite_card_carries_its_id_and_escapes_text() {
        let card = FavoriteCard::new("42", "Tom & Jerry's <Diner>", "CA", "Food");
        let html = card.render();
        assert!(html.contains(r#"data-id="42""#));
        assert!(html.contains("Tom &amp; Jerry&#39;s &lt;Diner&gt;"));
        assert!(!html.contains("<Diner>"));
    }

    #[test]
    fn favorite_card_actions_route_delete_by_id() {
        let card = FavoriteCard::new("7", "Zion", "UT", "Parks");
        assert_eq!(
            card.actions()[0],
            CardAction::Delete(FavoriteCommand::Remove { id: "7".into() })
        );
    }

    #[test]
    fn records_without_id_get_no_card() {
        let record = FavoriteRecord {
            id: None,
            place_name: "Zion".into(),
            state: "UT".into(),
            category: "Parks".into(),
            added_at: None,
        };
        assert!(FavoriteCard::from_record(&record).is_none());
    }
}

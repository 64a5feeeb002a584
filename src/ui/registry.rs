use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::model::PlaceKey;

pub const LABEL_FAVORITE: &str = "Favorite";
pub const LABEL_FAVORITED: &str = "Favorited";
pub const LABEL_ADDING: &str = "Adding";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(u64);

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fav-{}", self.0)
    }
}

/// One rendered favorite button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteControl {
    pub id: ControlId,
    pub key: PlaceKey,
    pub category: String,
    pub label: &'static str,
    pub disabled: bool,
    pub favorited: bool,
    pub pending: bool,
}

impl FavoriteControl {
    fn apply(&mut self, favorited: bool) {
        self.label = if favorited { LABEL_FAVORITED } else { LABEL_FAVORITE };
        self.disabled = favorited;
        self.favorited = favorited;
        self.pending = false;
    }
}

/// Maps a `(name, state)` pair to every control currently showing it.
///
/// The same place can be on screen more than once (search results and the
/// details modal), so updates always fan out to all of them.
#[derive(Debug, Default)]
pub struct ButtonRegistry {
    next_id: u64,
    controls: BTreeMap<ControlId, FavoriteControl>,
    by_key: HashMap<PlaceKey, Vec<ControlId>>,
}

impl ButtonRegistry {
    pub fn register(&mut self, key: PlaceKey, category: &str, favorited: bool) -> ControlId {
        self.next_id += 1;
        let id = ControlId(self.next_id);
        let mut control = FavoriteControl {
            id,
            key: key.clone(),
            category: category.to_string(),
            label: LABEL_FAVORITE,
            disabled: false,
            favorited: false,
            pending: false,
        };
        control.apply(favorited);
        self.controls.insert(id, control);
        self.by_key.entry(key).or_default().push(id);
        id
    }

    pub fn unregister(&mut self, id: ControlId) -> Option<FavoriteControl> {
        let control = self.controls.remove(&id)?;
        if let Some(ids) = self.by_key.get_mut(&control.key) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_key.remove(&control.key);
            }
        }
        Some(control)
    }

    pub fn get(&self, id: ControlId) -> Option<&FavoriteControl> {
        self.controls.get(&id)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn controls_for<'a>(&'a self, key: &PlaceKey) -> impl Iterator<Item = &'a FavoriteControl> + use<'a> {
        self.by_key
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(|id| self.controls.get(id))
    }

    /// Sets label, disabled flag and `favorited` class on every control for `key`.
    pub fn update_all(&mut self, key: &PlaceKey, favorited: bool) -> usize {
        let Some(ids) = self.by_key.get(key) else {
            return 0;
        };
        let mut touched = 0;
        for id in ids {
            if let Some(control) = self.controls.get_mut(id) {
                control.apply(favorited);
                touched += 1;
            }
        }
        touched
    }

    /// Disables the controls for `key` while an add is outstanding, or restores them.
    pub fn set_pending(&mut self, key: &PlaceKey, pending: bool) -> usize {
        let Some(ids) = self.by_key.get(key) else {
            return 0;
        };
        let mut touched = 0;
        for id in ids {
            if let Some(control) = self.controls.get_mut(id) {
                if pending {
                    control.pending = true;
                    control.disabled = true;
                    control.label = LABEL_ADDING;
                } else {
                    let favorited = control.favorited;
                    control.apply(favorited);
                }
                touched += 1;
            }
        }
        touched
    }

    /// Re-derives every control from the authoritative favorited map.
    pub fn project(&mut self, favorited: &HashMap<PlaceKey, bool>) -> usize {
        for control in self.controls.values_mut() {
            if control.pending {
                continue;
            }
            let is_favorite = favorited.get(&control.key).copied().unwrap_or(false);
            control.apply(is_favorite);
        }
        self.controls.len()
    }

    pub fn clear(&mut self) {
        self.controls.clear();
        self.by_key.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_all_touches_only_the_matching_pair() {
        let mut registry = ButtonRegistry::default();
        let gate = PlaceKey::new("Golden Gate Bridge", "CA");
        let other_state = PlaceKey::new("Golden Gate Bridge", "NV");
        let first = registry.register(gate.clone(), "Landmark", false);
        let second = registry.register(gate.clone(), "Landmark", false);
        let bystander = registry.register(other_state.clone(), "Landmark", false);

        assert_eq!(registry.update_all(&gate, true), 2);

        for id in [first, second] {
            let control = registry.get(id).unwrap();
            assert!(control.disabled);
            assert!(control.favorited);
            assert_eq!(control.label, LABEL_FAVORITED);
        }
        let untouched = registry.get(bystander).unwrap();
        assert!(!untouched.disabled);
        assert!(!untouched.favorited);
        assert_eq!(untouched.label, LABEL_FAVORITE);
    }

    #[test]
    fn pending_disables_then_restores_previous_state() {
        let mut registry = ButtonRegistry::default();
        let key = PlaceKey::new("Zion", "UT");
        let id = registry.register(key.clone(), "Parks", false);

        registry.set_pending(&key, true);
        let control = registry.get(id).unwrap();
        assert!(control.disabled && control.pending);
        assert_eq!(control.label, LABEL_ADDING);

        registry.set_pending(&key, false);
        let control = registry.get(id).unwrap();
        assert!(!control.disabled && !control.pending && !control.favorited);
    }

    #[test]
    fn project_resets_controls_missing_from_the_map() {
        let mut registry = ButtonRegistry::default();
        let kept = PlaceKey::new("Arches", "UT");
        let dropped = PlaceKey::new("Zion", "UT");
        let kept_id = registry.register(kept.clone(), "Parks", false);
        let dropped_id = registry.register(dropped.clone(), "Parks", true);

        let map = HashMap::from([(kept, true)]);
        registry.project(&map);

        assert!(registry.get(kept_id).unwrap().favorited);
        assert!(!registry.get(dropped_id).unwrap().favorited);
    }

    #[test]
    fn unregister_forgets_the_key_when_last_control_goes() {
        let mut registry = ButtonRegistry::default();
        let key = PlaceKey::new("Alcatraz", "CA");
        let id = registry.register(key.clone(), "Historical", false);
        assert!(registry.unregister(id).is_some());
        assert_eq!(registry.controls_for(&key).count(), 0);
        assert_eq!(registry.update_all(&key, true), 0);
        assert!(registry.is_empty());
    }
}

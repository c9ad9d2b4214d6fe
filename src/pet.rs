//! Pet instances on the playground and their persisted roster.
//!
//! One main instance always exists; buddies come and go. Only identity and position are stored
//! here. Motion and animation bookkeeping live in the simulation, keyed by instance id.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::{
    BASE_NODE_SIZE, BUDDY_EMOJI_POOL, FALLBACK_EMOJI, MAIN_PET_ID, MAIN_SPRITE_PROFILE, MAX_BUDDIES, MAX_SCALE,
    MIN_NODE_SIZE, SIZE_LEVEL_MAX, SIZE_LEVEL_MIN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetKind {
    Main,
    Buddy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetInstance {
    pub id: String,
    pub kind: PetKind,
    pub emoji: String,
    pub x: f32,
    pub y: f32,
    /// Sprite profile key; `None` draws the emoji placeholder.
    pub sprite_profile: Option<String>,
}

impl PetInstance {
    pub fn main(emoji: &str, position: Vec2) -> Self {
        Self {
            id: MAIN_PET_ID.to_string(),
            kind: PetKind::Main,
            emoji: emoji.to_string(),
            x: position.x,
            y: position.y,
            sprite_profile: Some(MAIN_SPRITE_PROFILE.to_string()),
        }
    }

    pub fn is_main(&self) -> bool {
        self.kind == PetKind::Main
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.x = position.x;
        self.y = position.y;
    }

    /// Reads one persisted entry. Entries without a usable id are rejected; an entry without a
    /// recognizable kind takes `default_kind`, and everything else falls back to a default.
    fn sanitize(raw: &Value, default_kind: PetKind) -> Option<Self> {
        let id = raw.get("id")?.as_str().filter(|id| !id.is_empty())?.to_string();
        let kind = match raw.get("kind").and_then(Value::as_str) {
            Some("main") => PetKind::Main,
            Some("buddy") => PetKind::Buddy,
            _ => default_kind,
        };
        let emoji = raw
            .get("emoji")
            .and_then(Value::as_str)
            .filter(|emoji| !emoji.is_empty())
            .unwrap_or(FALLBACK_EMOJI)
            .to_string();
        let coordinate = |key: &str| {
            raw.get(key)
                .and_then(Value::as_f64)
                .filter(|value| value.is_finite())
                .unwrap_or(0.0) as f32
        };
        let sprite_profile = match raw.get("spriteProfile").and_then(Value::as_str) {
            Some(profile) => Some(profile.to_string()),
            None if kind == PetKind::Main => Some(MAIN_SPRITE_PROFILE.to_string()),
            None => None,
        };

        Some(Self {
            id,
            kind,
            emoji,
            x: coordinate("x"),
            y: coordinate("y"),
            sprite_profile,
        })
    }
}

/// Returned when a buddy cannot be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyLimitReached;

/// Every pet instance plus the current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct PetRoster {
    pets: Vec<PetInstance>,
    selected: String,
}

impl PetRoster {
    pub fn new(main: PetInstance) -> Self {
        Self {
            pets: vec![main],
            selected: MAIN_PET_ID.to_string(),
        }
    }

    /// Restores the roster from its persisted list.
    ///
    /// Invalid entries and duplicate ids are dropped, only the first main instance is kept, and
    /// at most [`MAX_BUDDIES`] buddies survive. `default_main` supplies the main instance when the
    /// list has none.
    pub fn load(raw: Option<&Value>, default_main: impl FnOnce() -> PetInstance) -> Self {
        let entries = match raw {
            Some(Value::Array(entries)) => entries.as_slice(),
            Some(_) => {
                warn!("Stored pet list is not an array, starting with the main pet only");
                &[]
            }
            None => &[],
        };

        // Only a lone entry may be taken for the main pet without saying so.
        let default_kind = if entries.len() == 1 { PetKind::Main } else { PetKind::Buddy };
        let mut pets: Vec<PetInstance> = Vec::with_capacity(entries.len().min(MAX_BUDDIES + 1));
        let mut dropped = 0usize;
        for pet in entries.iter().filter_map(|raw| PetInstance::sanitize(raw, default_kind)) {
            let duplicate = pets.iter().any(|other| other.id == pet.id);
            let extra_main = pet.is_main() && pets.iter().any(PetInstance::is_main);
            let buddies = pets.iter().filter(|other| !other.is_main()).count();
            if duplicate || extra_main || (!pet.is_main() && buddies >= MAX_BUDDIES) {
                dropped += 1;
                continue;
            }
            pets.push(pet);
        }
        if dropped > 0 {
            warn!(dropped, "Discarded invalid pet entries");
        }

        if !pets.iter().any(PetInstance::is_main) {
            pets.insert(0, default_main());
        }
        let selected = pets
            .iter()
            .find(|pet| pet.is_main())
            .map_or_else(|| MAIN_PET_ID.to_string(), |pet| pet.id.clone());
        debug!(count = pets.len(), "Pet roster loaded");
        Self { pets, selected }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.pets)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PetInstance> {
        self.pets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PetInstance> {
        self.pets.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.pets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pets.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.pets.iter().map(|pet| pet.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&PetInstance> {
        self.pets.iter().find(|pet| pet.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut PetInstance> {
        self.pets.iter_mut().find(|pet| pet.id == id)
    }

    pub fn main(&self) -> Option<&PetInstance> {
        self.pets.iter().find(|pet| pet.is_main())
    }

    pub fn main_mut(&mut self) -> Option<&mut PetInstance> {
        self.pets.iter_mut().find(|pet| pet.is_main())
    }

    pub fn buddy_count(&self) -> usize {
        self.pets.iter().filter(|pet| !pet.is_main()).count()
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// Selects `id` if such an instance exists.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.selected = id.to_string();
        true
    }

    /// Adds a buddy, staggered from the top-left corner by how many already exist, and selects it.
    ///
    /// `stamp` makes the id unique; it is bumped if that id is already taken.
    pub fn add_buddy(&mut self, stamp: i64) -> Result<&mut PetInstance, BuddyLimitReached> {
        let count = self.buddy_count();
        if count >= MAX_BUDDIES {
            return Err(BuddyLimitReached);
        }

        let mut stamp = stamp;
        while self.get(&format!("buddy-{stamp}")).is_some() {
            stamp += 1;
        }
        let buddy = PetInstance {
            id: format!("buddy-{stamp}"),
            kind: PetKind::Buddy,
            emoji: BUDDY_EMOJI_POOL[count % BUDDY_EMOJI_POOL.len()].to_string(),
            x: 8.0 + ((count * 20) % 220) as f32,
            y: 8.0 + ((count * 18) % 72) as f32,
            sprite_profile: None,
        };
        self.selected = buddy.id.clone();
        self.pets.push(buddy);
        let index = self.pets.len() - 1;
        Ok(&mut self.pets[index])
    }

    /// Removes the selected buddy, or the most recently added one when the main pet is
    /// selected, then selects the main pet.
    pub fn remove_buddy(&mut self) -> Option<PetInstance> {
        let index = self
            .pets
            .iter()
            .position(|pet| pet.id == self.selected && !pet.is_main())
            .or_else(|| self.pets.iter().rposition(|pet| !pet.is_main()))?;
        let removed = self.pets.remove(index);
        if let Some(main) = self.main() {
            self.selected = main.id.clone();
        }
        Some(removed)
    }
}

/// Reads a persisted size level, defaulting to the smallest.
pub fn size_level_from_value(raw: Option<&Value>) -> u8 {
    raw.and_then(|value| match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
    .filter(|level| level.is_finite())
    .map_or(SIZE_LEVEL_MIN, clamp_size_level)
}

pub fn clamp_size_level(level: f64) -> u8 {
    level.round().clamp(f64::from(SIZE_LEVEL_MIN), f64::from(SIZE_LEVEL_MAX)) as u8
}

/// Linear scale from 1.0 at the smallest level up to [`MAX_SCALE`] at the largest.
pub fn scale_for_level(level: u8) -> f32 {
    let level = level.clamp(SIZE_LEVEL_MIN, SIZE_LEVEL_MAX);
    let span = f32::from((SIZE_LEVEL_MAX - SIZE_LEVEL_MIN).max(1));
    1.0 + f32::from(level - SIZE_LEVEL_MIN) / span * (MAX_SCALE - 1.0)
}

/// Rendered edge length in pixels of every instance at `level`.
pub fn size_for_level(level: u8) -> f32 {
    (BASE_NODE_SIZE * scale_for_level(level)).round().max(MIN_NODE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_size_levels() {
        assert_eq!(size_for_level(1), 88.0);
        assert_eq!(size_for_level(10), 528.0);
        assert_eq!(size_for_level(0), 88.0);
        assert_eq!(size_level_from_value(Some(&json!("4"))), 4);
        assert_eq!(size_level_from_value(Some(&json!(42))), 10);
        assert_eq!(size_level_from_value(Some(&json!(null))), 1);
    }

    #[test]
    fn test_sanitize_rejects_missing_id() {
        assert!(PetInstance::sanitize(&json!({"kind": "buddy"}), PetKind::Buddy).is_none());
        assert!(PetInstance::sanitize(&json!({"id": ""}), PetKind::Buddy).is_none());
    }

    #[test]
    fn test_entry_without_kind_cannot_displace_main() {
        let stored = json!([
            { "id": "stray", "x": 10, "y": 10 },
            { "id": "main", "kind": "main", "emoji": "🐥", "x": 300, "y": 200 },
        ]);
        let roster = PetRoster::load(Some(&stored), || panic!("a main entry is stored"));

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.main().map(|pet| pet.id.as_str()), Some("main"));
        assert_eq!(roster.get("stray").map(|pet| pet.kind), Some(PetKind::Buddy));
        assert_eq!(roster.get("stray").and_then(|pet| pet.sprite_profile.clone()), None);
    }

    #[test]
    fn test_lone_entry_without_kind_is_main() {
        let stored = json!([{ "id": "main", "x": 1, "y": 2 }]);
        let roster = PetRoster::load(Some(&stored), || panic!("the lone entry is the main pet"));

        assert_eq!(roster.main().map(|pet| pet.position()), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(roster.buddy_count(), 0);
    }
}

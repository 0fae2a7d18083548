// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for the map repository.
//!
//! Entities live in `slotmap::SlotMap` arenas. Keys are generational, so a key
//! kept after its entity was removed resolves to `None` instead of aliasing a
//! newer entity stored in the same slot.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a road (reference line with its sections).
    pub struct RoadKey;

    /// Key for a junction (lane links plus derived surface).
    pub struct JunctionKey;

    /// Key for a pole.
    pub struct PoleKey;

    /// Key for a pole-mounted object.
    pub struct ObjectKey;
}

/// Discriminant for the entities a load can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Road,
    Section,
    Lane,
    Boundary,
    Junction,
    LaneLink,
    Pole,
    Object,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Road => "road",
            EntityKind::Section => "section",
            EntityKind::Lane => "lane",
            EntityKind::Boundary => "boundary",
            EntityKind::Junction => "junction",
            EntityKind::LaneLink => "lane link",
            EntityKind::Pole => "pole",
            EntityKind::Object => "object",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn entity_kind_names() {
        assert_eq!(EntityKind::LaneLink.to_string(), "lane link");
        assert_eq!(EntityKind::Pole.as_str(), "pole");
        assert!(EntityKind::Road < EntityKind::Object);
    }

    #[test]
    fn stale_key_does_not_alias() {
        let mut roads: SlotMap<RoadKey, &str> = SlotMap::with_key();
        let first = roads.insert("1");
        roads.remove(first);
        let second = roads.insert("2");
        assert_ne!(first, second);
        assert!(roads.get(first).is_none());
        assert_eq!(roads.get(second), Some(&"2"));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for a loaded road network.
//!
//! [`MapRepository`] owns every road, junction, pole and mounted object of a
//! map. Entities live in slot maps keyed by generational keys; a string index
//! maps file ids to keys. Inserting an entity whose id is already present
//! replaces the previous one and invalidates its key.

use rustc_hash::FxHashMap;
use slotmap::{Key, SlotMap};

use crate::keys::{JunctionKey, ObjectKey, PoleKey, RoadKey};
use crate::model::{Junction, LaneLink, MountedObject, Pole, Road};

/// Entities addressable by their file id.
trait Identified {
    fn id(&self) -> &str;
}

impl Identified for Road {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Junction {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Pole {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for MountedObject {
    fn id(&self) -> &str {
        &self.id
    }
}

/// One arena plus its id index.
#[derive(Debug)]
struct Table<K: Key, V> {
    items: SlotMap<K, V>,
    ids: FxHashMap<String, K>,
}

impl<K: Key, V: Identified> Table<K, V> {
    fn new() -> Self {
        Self {
            items: SlotMap::with_key(),
            ids: FxHashMap::default(),
        }
    }

    /// Insert `value`, returning its key and the entity it replaced.
    fn insert(&mut self, value: V) -> (K, Option<V>) {
        let replaced = self.ids.remove(value.id()).and_then(|old| self.items.remove(old));
        let id = value.id().to_string();
        let key = self.items.insert(value);
        self.ids.insert(id, key);
        (key, replaced)
    }

    fn get(&self, key: K) -> Option<&V> {
        self.items.get(key)
    }

    fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.items.get_mut(key)
    }

    fn key(&self, id: &str) -> Option<K> {
        self.ids.get(id).copied()
    }

    fn by_id(&self, id: &str) -> Option<&V> {
        self.key(id).and_then(|k| self.items.get(k))
    }

    fn remove(&mut self, key: K) -> Option<V> {
        let value = self.items.remove(key)?;
        self.ids.remove(value.id());
        Some(value)
    }

    fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.items.iter()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
    }
}

/// Owner of every entity of one loaded map.
///
/// # Example
///
/// ```ignore
/// let report = MapLoader::new(EngineConfig::default())?.load(records, &catalog);
/// let repo = report.repository;
/// if let Some(road) = repo.road_by_id("1") {
///     println!("road 1 is {} m long", road.length);
/// }
/// ```
#[derive(Debug)]
pub struct MapRepository {
    roads: Table<RoadKey, Road>,
    junctions: Table<JunctionKey, Junction>,
    poles: Table<PoleKey, Pole>,
    objects: Table<ObjectKey, MountedObject>,
    // lane link id -> owning junction
    lane_links: FxHashMap<String, JunctionKey>,
}

impl Default for MapRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MapRepository {
    pub fn new() -> Self {
        Self {
            roads: Table::new(),
            junctions: Table::new(),
            poles: Table::new(),
            objects: Table::new(),
            lane_links: FxHashMap::default(),
        }
    }

    // ---- roads ----

    pub fn insert_road(&mut self, road: Road) -> RoadKey {
        self.roads.insert(road).0
    }

    pub fn get_road(&self, key: RoadKey) -> Option<&Road> {
        self.roads.get(key)
    }

    pub fn get_road_mut(&mut self, key: RoadKey) -> Option<&mut Road> {
        self.roads.get_mut(key)
    }

    pub fn road_key(&self, id: &str) -> Option<RoadKey> {
        self.roads.key(id)
    }

    pub fn road_by_id(&self, id: &str) -> Option<&Road> {
        self.roads.by_id(id)
    }

    pub fn road_by_id_mut(&mut self, id: &str) -> Option<&mut Road> {
        let key = self.roads.key(id)?;
        self.roads.get_mut(key)
    }

    pub fn remove_road(&mut self, key: RoadKey) -> Option<Road> {
        self.roads.remove(key)
    }

    pub fn roads(&self) -> impl Iterator<Item = (RoadKey, &Road)> {
        self.roads.iter()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    // ---- junctions ----

    pub fn insert_junction(&mut self, junction: Junction) -> JunctionKey {
        let link_ids: Vec<String> = junction.lane_links.iter().map(|l| l.id.clone()).collect();
        let (key, replaced) = self.junctions.insert(junction);
        if let Some(old) = replaced {
            for link in &old.lane_links {
                self.lane_links.remove(&link.id);
            }
        }
        for id in link_ids {
            self.lane_links.insert(id, key);
        }
        key
    }

    pub fn get_junction(&self, key: JunctionKey) -> Option<&Junction> {
        self.junctions.get(key)
    }

    pub fn get_junction_mut(&mut self, key: JunctionKey) -> Option<&mut Junction> {
        self.junctions.get_mut(key)
    }

    pub fn junction_key(&self, id: &str) -> Option<JunctionKey> {
        self.junctions.key(id)
    }

    pub fn junction_by_id(&self, id: &str) -> Option<&Junction> {
        self.junctions.by_id(id)
    }

    pub fn remove_junction(&mut self, key: JunctionKey) -> Option<Junction> {
        let junction = self.junctions.remove(key)?;
        for link in &junction.lane_links {
            self.lane_links.remove(&link.id);
        }
        Some(junction)
    }

    pub fn junctions(&self) -> impl Iterator<Item = (JunctionKey, &Junction)> {
        self.junctions.iter()
    }

    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    /// A lane link together with the junction that owns it.
    pub fn lane_link_by_id(&self, id: &str) -> Option<(&Junction, &LaneLink)> {
        let key = self.lane_links.get(id)?;
        let junction = self.junctions.get(*key)?;
        Some((junction, junction.lane_link(id)?))
    }

    // ---- poles ----

    pub fn insert_pole(&mut self, pole: Pole) -> PoleKey {
        self.poles.insert(pole).0
    }

    pub fn get_pole(&self, key: PoleKey) -> Option<&Pole> {
        self.poles.get(key)
    }

    pub fn get_pole_mut(&mut self, key: PoleKey) -> Option<&mut Pole> {
        self.poles.get_mut(key)
    }

    pub fn pole_key(&self, id: &str) -> Option<PoleKey> {
        self.poles.key(id)
    }

    pub fn pole_by_id(&self, id: &str) -> Option<&Pole> {
        self.poles.by_id(id)
    }

    pub fn remove_pole(&mut self, key: PoleKey) -> Option<Pole> {
        self.poles.remove(key)
    }

    pub fn poles(&self) -> impl Iterator<Item = (PoleKey, &Pole)> {
        self.poles.iter()
    }

    pub fn pole_count(&self) -> usize {
        self.poles.len()
    }

    // ---- mounted objects ----

    pub fn insert_object(&mut self, object: MountedObject) -> ObjectKey {
        self.objects.insert(object).0
    }

    pub fn get_object(&self, key: ObjectKey) -> Option<&MountedObject> {
        self.objects.get(key)
    }

    pub fn get_object_mut(&mut self, key: ObjectKey) -> Option<&mut MountedObject> {
        self.objects.get_mut(key)
    }

    pub fn object_key(&self, id: &str) -> Option<ObjectKey> {
        self.objects.key(id)
    }

    pub fn object_by_id(&self, id: &str) -> Option<&MountedObject> {
        self.objects.by_id(id)
    }

    pub fn remove_object(&mut self, key: ObjectKey) -> Option<MountedObject> {
        self.objects.remove(key)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectKey, &MountedObject)> {
        self.objects.iter()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Objects mounted on the pole with id `pole_id`.
    pub fn objects_on_pole<'a>(&'a self, pole_id: &'a str) -> impl Iterator<Item = &'a MountedObject> + 'a {
        self.objects
            .iter()
            .map(|(_, o)| o)
            .filter(move |o| o.pole_id() == Some(pole_id))
    }

    /// Drop every entity. Keys handed out before stay invalid afterwards.
    pub fn clear(&mut self) {
        self.roads.clear();
        self.junctions.clear();
        self.poles.clear();
        self.objects.clear();
        self.lane_links.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.roads.len() == 0 && self.junctions.len() == 0 && self.poles.len() == 0 && self.objects.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Anchor, PoleStructure};
    use nalgebra::Point3;

    fn pole(id: &str, x: f64) -> Pole {
        Pole {
            id: id.to_string(),
            name: "Vertical_Pole".to_string(),
            anchor: Anchor::Road("1".to_string()),
            s: 0.0,
            t: 0.0,
            yaw: 0.0,
            position: Point3::new(x, 0.0, 0.0),
            look_at: Point3::new(x, 0.0, 1.0),
            structure: PoleStructure::vertical(0.1, 6.0),
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut repo = MapRepository::new();
        let a = repo.insert_pole(pole("a", 1.0));
        let b = repo.insert_pole(pole("b", 2.0));
        assert_eq!(repo.pole_count(), 2);
        assert_eq!(repo.pole_key("b"), Some(b));
        assert_eq!(repo.get_pole(a).unwrap().position.x, 1.0);
        assert!(repo.pole_by_id("missing").is_none());
    }

    #[test]
    fn test_stale_key_after_remove() {
        let mut repo = MapRepository::new();
        let a = repo.insert_pole(pole("a", 1.0));
        assert!(repo.remove_pole(a).is_some());
        assert!(repo.get_pole(a).is_none());
        assert!(repo.remove_pole(a).is_none());
        assert!(repo.pole_by_id("a").is_none());
        let again = repo.insert_pole(pole("a", 3.0));
        assert_ne!(a, again);
        assert!(repo.get_pole(a).is_none());
    }

    #[test]
    fn test_reinsert_replaces() {
        let mut repo = MapRepository::new();
        let first = repo.insert_pole(pole("a", 1.0));
        let second = repo.insert_pole(pole("a", 5.0));
        assert_eq!(repo.pole_count(), 1);
        assert!(repo.get_pole(first).is_none());
        assert_eq!(repo.pole_by_id("a").unwrap().position.x, 5.0);
        assert_eq!(repo.pole_key("a"), Some(second));
    }

    #[test]
    fn test_clear() {
        let mut repo = MapRepository::new();
        let a = repo.insert_pole(pole("a", 1.0));
        repo.insert_junction(Junction::new("j"));
        repo.clear();
        assert!(repo.is_empty());
        assert!(repo.get_pole(a).is_none());
        assert!(repo.junction_by_id("j").is_none());
    }
}

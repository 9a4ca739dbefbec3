/// Spatial acceleration structures for scene queries.
///
/// A SceneIndex indexes scene entities by their world-space AABB for
/// frustum culling and light-volume queries. The index holds keys only:
/// it never owns or frees entities.
///
/// Ownership: the caller creates and owns the SceneIndex and passes it to
/// `Scene::sync_index` and `RenderPipeline::execute`.

use rustc_hash::FxHashMap;
use super::aabb::AABB;
use super::query_volume::QueryVolume;
use super::scene::EntityKey;

/// Trait for spatial indexing of scene entities.
///
/// Not safe for mutation during a query: queries borrow the index.
pub trait SceneIndex: Send + Sync {
    /// Insert an entity with its world-space AABB.
    ///
    /// Returns `false` when the entity was not stored (invalid bounds, or
    /// bounds outside the indexed region). Re-inserting a key replaces it.
    fn insert(&mut self, key: EntityKey, world_aabb: &AABB) -> bool;

    /// Remove an entity. Returns `false` if it was not indexed.
    fn remove(&mut self, key: EntityKey) -> bool;

    /// Update an entity's world-space AABB (remove, then reinsert).
    fn update(&mut self, key: EntityKey, world_aabb: &AABB) -> bool {
        self.remove(key);
        self.insert(key, world_aabb)
    }

    /// Lazily yield every entity whose AABB intersects `volume`.
    ///
    /// Each entity is yielded at most once. An invalid volume yields nothing.
    fn query<'a>(&'a self, volume: &'a dyn QueryVolume) -> Box<dyn Iterator<Item = EntityKey> + 'a>;

    /// Append query results to `results`.
    fn query_into(&self, volume: &dyn QueryVolume, results: &mut Vec<EntityKey>) {
        results.extend(self.query(volume));
    }

    /// Stored bounds of an entity
    fn bounds(&self, key: EntityKey) -> Option<AABB>;

    fn contains(&self, key: EntityKey) -> bool {
        self.bounds(key).is_some()
    }

    /// Remove all entities from the index.
    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Brute-force index: a flat map tested entry by entry.
///
/// Suitable for small scenes or as a baseline for comparison.
#[derive(Default)]
pub struct LinearSceneIndex {
    entries: FxHashMap<EntityKey, AABB>,
}

impl LinearSceneIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SceneIndex for LinearSceneIndex {
    fn insert(&mut self, key: EntityKey, world_aabb: &AABB) -> bool {
        if !world_aabb.is_valid() {
            self.entries.remove(&key);
            return false;
        }
        self.entries.insert(key, *world_aabb);
        true
    }

    fn remove(&mut self, key: EntityKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    fn query<'a>(&'a self, volume: &'a dyn QueryVolume) -> Box<dyn Iterator<Item = EntityKey> + 'a> {
        if !volume.is_valid() {
            return Box::new(std::iter::empty());
        }
        Box::new(
            self.entries
                .iter()
                .filter(move |(_, aabb)| volume.intersects_aabb(aabb))
                .map(|(key, _)| *key),
        )
    }

    fn bounds(&self, key: EntityKey) -> Option<AABB> {
        self.entries.get(&key).copied()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

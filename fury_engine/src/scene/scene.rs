/// Scene - a tree of entities with transforms, bounds and attachments.
///
/// Uses a SlotMap for O(1) insert/remove with stable keys. Each entity is
/// owned by its parent; the root is created with the scene and cannot be
/// despawned. Spatial indices only hold keys, synchronized explicitly via
/// `sync_index`.

use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};
use glam::{Mat4, Vec3};
use crate::error::{Error, Result};
use crate::engine_debug;
use super::aabb::AABB;
use super::attachment::{Attachment, Capabilities, CapabilityTable, LightDesc, MeshAttachment};
use super::scene_index::SceneIndex;

new_key_type! {
    /// Stable key of a scene entity
    pub struct EntityKey;
}

// ===== SCENE ENTITY =====

/// A node of the scene tree
#[derive(Debug, Clone)]
pub struct SceneEntity {
    name: String,
    local: Mat4,
    world: Mat4,
    attachments: Vec<Attachment>,
    world_bounds: Option<AABB>,
    capabilities: Capabilities,
    parent: Option<EntityKey>,
    children: Vec<EntityKey>,
}

impl SceneEntity {
    fn new(name: &str, local: Mat4, world: Mat4, parent: Option<EntityKey>) -> Self {
        Self {
            name: name.to_string(),
            local,
            world,
            attachments: Vec::new(),
            world_bounds: None,
            capabilities: Capabilities::empty(),
            parent,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_transform(&self) -> &Mat4 {
        &self.local
    }

    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    pub fn world_position(&self) -> Vec3 {
        self.world.col(3).truncate()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Union of the world bounds of every bounded attachment
    pub fn world_bounds(&self) -> Option<&AABB> {
        self.world_bounds.as_ref()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn has(&self, capabilities: Capabilities) -> bool {
        self.capabilities.contains(capabilities)
    }

    pub fn parent(&self) -> Option<EntityKey> {
        self.parent
    }

    pub fn children(&self) -> &[EntityKey] {
        &self.children
    }

    /// Mesh attachments with their skinned flag
    pub fn meshes(&self) -> impl Iterator<Item = (&MeshAttachment, bool)> {
        self.attachments.iter().filter_map(|a| match a {
            Attachment::Mesh(mesh) => Some((mesh, false)),
            Attachment::SkinnedMesh { mesh, .. } => Some((mesh, true)),
            Attachment::Light(_) => None,
        })
    }

    pub fn lights(&self) -> impl Iterator<Item = &LightDesc> {
        self.attachments.iter().filter_map(Attachment::light)
    }

    fn refresh(&mut self, table: &CapabilityTable) {
        let mut capabilities = Capabilities::empty();
        let mut bounds: Option<AABB> = None;
        for attachment in &self.attachments {
            let caps = table.resolve(attachment);
            capabilities |= caps;
            if !caps.contains(Capabilities::HAS_BOUNDS) {
                continue;
            }
            if let Some(b) = attachment.world_bounds(&self.world) {
                bounds = Some(match bounds {
                    Some(acc) => acc.union(&b),
                    None => b,
                });
            }
        }
        self.capabilities = capabilities;
        self.world_bounds = bounds;
    }
}

// ===== SYNC STATS =====

/// Outcome of pushing scene changes into a spatial index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    /// Entities the index refused (outside its root, invalid bounds)
    pub rejected: usize,
}

// ===== SCENE =====

pub struct Scene {
    entities: SlotMap<EntityKey, SceneEntity>,
    root: EntityKey,
    capability_table: CapabilityTable,
    /// Entities whose bounds changed since the last sync
    dirty: FxHashSet<EntityKey>,
    /// Despawned entities not yet removed from the index
    removed: Vec<EntityKey>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_capability_table(CapabilityTable::default())
    }

    pub fn with_capability_table(capability_table: CapabilityTable) -> Self {
        let mut entities = SlotMap::with_key();
        let root = entities.insert(SceneEntity::new("root", Mat4::IDENTITY, Mat4::IDENTITY, None));
        Self {
            entities,
            root,
            capability_table,
            dirty: FxHashSet::default(),
            removed: Vec::new(),
        }
    }

    pub fn root(&self) -> EntityKey {
        self.root
    }

    pub fn capability_table(&self) -> &CapabilityTable {
        &self.capability_table
    }

    fn not_found(key: EntityKey) -> Error {
        Error::InvalidResource(format!("entity {:?} not found", key))
    }

    /// Create a child of `parent`
    pub fn spawn(&mut self, parent: EntityKey, name: &str, local: Mat4) -> Result<EntityKey> {
        let parent_world = *self
            .entities
            .get(parent)
            .ok_or_else(|| Self::not_found(parent))?
            .world_matrix();

        let key = self.entities.insert(SceneEntity::new(name, local, parent_world * local, Some(parent)));
        if let Some(p) = self.entities.get_mut(parent) {
            p.children.push(key);
        }
        Ok(key)
    }

    /// Add an attachment and recompute capabilities and world bounds
    pub fn attach(&mut self, key: EntityKey, attachment: Attachment) -> Result<()> {
        let entity = self.entities.get_mut(key).ok_or_else(|| Self::not_found(key))?;
        entity.attachments.push(attachment);
        entity.refresh(&self.capability_table);
        self.dirty.insert(key);
        Ok(())
    }

    /// Set the local transform and propagate world matrices down the subtree
    pub fn set_local_transform(&mut self, key: EntityKey, local: Mat4) -> Result<()> {
        let entity = self.entities.get_mut(key).ok_or_else(|| Self::not_found(key))?;
        entity.local = local;

        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let parent_world = self
                .entities
                .get(current)
                .and_then(|e| e.parent)
                .and_then(|p| self.entities.get(p))
                .map(|p| p.world)
                .unwrap_or(Mat4::IDENTITY);

            if let Some(entity) = self.entities.get_mut(current) {
                entity.world = parent_world * entity.local;
                entity.refresh(&self.capability_table);
                stack.extend_from_slice(&entity.children);
            }
            self.dirty.insert(current);
        }
        Ok(())
    }

    /// Remove an entity and its whole subtree. Returns the number removed.
    pub fn despawn(&mut self, key: EntityKey) -> Result<usize> {
        if key == self.root {
            return Err(Error::InvalidResource("the scene root cannot be despawned".to_string()));
        }
        let parent = self.entities.get(key).ok_or_else(|| Self::not_found(key))?.parent;
        if let Some(p) = parent.and_then(|p| self.entities.get_mut(p)) {
            p.children.retain(|&c| c != key);
        }

        let mut count = 0;
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(entity) = self.entities.remove(current) {
                stack.extend(entity.children);
                self.dirty.remove(&current);
                self.removed.push(current);
                count += 1;
            }
        }
        engine_debug!("fury::Scene", "Despawned {} entities under {:?}", count, key);
        Ok(count)
    }

    pub fn entity(&self, key: EntityKey) -> Option<&SceneEntity> {
        self.entities.get(key)
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityKey, &SceneEntity)> {
        self.entities.iter()
    }

    /// Every light attachment in the scene
    pub fn lights(&self) -> impl Iterator<Item = (EntityKey, &SceneEntity, &LightDesc)> {
        self.entities
            .iter()
            .filter(|(_, e)| e.has(Capabilities::EMITS_LIGHT))
            .flat_map(|(key, e)| e.lights().map(move |light| (key, e, light)))
    }

    /// Number of entities, root included
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of entities waiting for `sync_index`
    pub fn pending_sync(&self) -> usize {
        self.dirty.len() + self.removed.len()
    }

    /// Push pending removals and bound changes into `index`.
    pub fn sync_index(&mut self, index: &mut dyn SceneIndex) -> SyncStats {
        let mut stats = SyncStats::default();

        for key in self.removed.drain(..) {
            if index.remove(key) {
                stats.removed += 1;
            }
        }

        for key in self.dirty.drain() {
            let Some(entity) = self.entities.get(key) else {
                continue;
            };
            match entity.world_bounds {
                Some(bounds) if entity.has(Capabilities::HAS_BOUNDS) => {
                    let existed = index.contains(key);
                    if index.update(key, &bounds) {
                        if existed {
                            stats.updated += 1;
                        } else {
                            stats.inserted += 1;
                        }
                    } else {
                        stats.rejected += 1;
                    }
                }
                _ => {
                    if index.remove(key) {
                        stats.removed += 1;
                    }
                }
            }
        }

        if stats.rejected > 0 {
            engine_debug!("fury::Scene", "{} entities were not accepted by the index", stats.rejected);
        }
        stats
    }

    /// Clear `index` and insert every bounded entity.
    pub fn rebuild_index(&mut self, index: &mut dyn SceneIndex) -> SyncStats {
        self.dirty.clear();
        self.removed.clear();
        index.clear();

        let mut stats = SyncStats::default();
        for (key, entity) in self.entities.iter() {
            if let (Some(bounds), true) = (entity.world_bounds, entity.has(Capabilities::HAS_BOUNDS)) {
                if index.insert(key, &bounds) {
                    stats.inserted += 1;
                } else {
                    stats.rejected += 1;
                }
            }
        }
        stats
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;

/// OctreeSceneIndex - dynamic octree spatial index.
///
/// Single-node placement: each entity is stored in exactly one node, the
/// deepest node whose AABB fully contains it. An entity that straddles a
/// child boundary stays in the parent, so it is never split or duplicated
/// and queries need no de-duplication.
///
/// Nodes live in a flat arena and children are created on the first
/// insertion that needs them. Emptied subtrees are kept until `clear`.

use rustc_hash::FxHashMap;
use glam::Vec3;
use crate::config::OctreeConfig;
use crate::{engine_debug, engine_info, engine_trace, engine_warn};
use super::aabb::AABB;
use super::query_volume::{Containment, QueryVolume};
use super::scene::EntityKey;
use super::scene_index::SceneIndex;

/// Marks an absent child slot.
const NO_CHILD: u32 = u32::MAX;

/// Upper bound on root doublings performed by a single `grow_to_fit`.
const MAX_GROW_STEPS: u32 = 16;

/// A single node in the octree.
struct OctreeNode {
    /// World-space AABB of this node
    aabb: AABB,
    /// Distance from the root (root = 0)
    depth: u32,
    /// Arena indices of the 8 children, `NO_CHILD` when not yet created
    children: [u32; 8],
    /// Entities stored at this node with their world AABB
    entities: Vec<(EntityKey, AABB)>,
}

impl OctreeNode {
    fn new(aabb: AABB, depth: u32) -> Self {
        Self { aabb, depth, children: [NO_CHILD; 8], entities: Vec::new() }
    }
}

/// Dynamic octree spatial index.
pub struct OctreeSceneIndex {
    nodes: Vec<OctreeNode>,
    root: u32,
    /// Maximum depth of the tree (root = depth 0)
    max_depth: u32,
    /// Reverse lookup: entity key → node index
    locations: FxHashMap<EntityKey, u32>,
}

impl OctreeSceneIndex {
    /// Create a new octree over `world_aabb`.
    ///
    /// # Arguments
    ///
    /// * `world_aabb` - The world-space AABB encompassing the entire scene
    /// * `max_depth` - Maximum tree depth (root = 0). Typical values: 4–6.
    pub fn new(world_aabb: AABB, max_depth: u32) -> Self {
        Self {
            nodes: vec![OctreeNode::new(world_aabb, 0)],
            root: 0,
            max_depth,
            locations: FxHashMap::default(),
        }
    }

    pub fn from_config(config: &OctreeConfig) -> Self {
        Self::new(config.bounds, config.max_depth)
    }

    // ===== INTROSPECTION =====

    /// Bounds of the root region
    pub fn root_bounds(&self) -> AABB {
        self.nodes[self.root as usize].aabb
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Number of nodes created so far (root included)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the node an entity is stored at
    pub fn stored_depth(&self, key: EntityKey) -> Option<u32> {
        self.locations.get(&key).map(|&idx| self.nodes[idx as usize].depth)
    }

    /// Lazy query over entities intersecting `volume`.
    pub fn query_iter<'a>(&'a self, volume: &'a dyn QueryVolume) -> OctreeQuery<'a> {
        OctreeQuery::new(self, volume)
    }

    // ===== OCTANTS =====

    /// Compute the AABB of a specific octant (0–7).
    ///
    /// Octant bit layout: bit0 = X, bit1 = Y, bit2 = Z.
    /// - 0 = low, 1 = high for each axis.
    fn octant_aabb(parent: &AABB, center: &Vec3, octant: usize) -> AABB {
        AABB {
            min: Vec3::new(
                if octant & 1 == 0 { parent.min.x } else { center.x },
                if octant & 2 == 0 { parent.min.y } else { center.y },
                if octant & 4 == 0 { parent.min.z } else { center.z },
            ),
            max: Vec3::new(
                if octant & 1 == 0 { center.x } else { parent.max.x },
                if octant & 2 == 0 { center.y } else { parent.max.y },
                if octant & 4 == 0 { center.z } else { parent.max.z },
            ),
        }
    }

    /// Determine which octant a point falls into relative to a center.
    fn point_octant(center: &Vec3, point: &Vec3) -> usize {
        ((point.x >= center.x) as usize)
            | (((point.y >= center.y) as usize) << 1)
            | (((point.z >= center.z) as usize) << 2)
    }

    /// Descend to the deepest node fully containing `world_aabb`, creating
    /// children on the way.
    ///
    /// The only candidate child is the octant holding the min corner. Child
    /// bounds are closed, so a box whose max face lies on the split plane
    /// still fits the low octant; anything else straddles and stays here.
    fn descend_and_create(&mut self, world_aabb: &AABB) -> u32 {
        let mut node_idx = self.root;

        loop {
            let node = &self.nodes[node_idx as usize];
            if node.depth >= self.max_depth {
                return node_idx;
            }

            let center = node.aabb.center();
            let octant = Self::point_octant(&center, &world_aabb.min);
            let child_aabb = Self::octant_aabb(&node.aabb, &center, octant);
            if !child_aabb.contains(world_aabb) {
                return node_idx;
            }

            let child = node.children[octant];
            node_idx = if child != NO_CHILD {
                child
            } else {
                let depth = node.depth + 1;
                let new_idx = self.nodes.len() as u32;
                self.nodes.push(OctreeNode::new(child_aabb, depth));
                self.nodes[node_idx as usize].children[octant] = new_idx;
                new_idx
            };
        }
    }

    // ===== ROOT GROWTH =====

    /// Grow the root until it contains `world_aabb`.
    ///
    /// Each step doubles the root toward the target: the old root becomes
    /// one octant of the new root and the depth limit increases by one, so
    /// leaf resolution is preserved. Returns `false` for invalid bounds or
    /// when the target is still outside after the step limit.
    pub fn grow_to_fit(&mut self, world_aabb: &AABB) -> bool {
        if !world_aabb.is_valid() {
            return false;
        }

        let mut steps = 0;
        while !self.root_bounds().contains(world_aabb) {
            if steps == MAX_GROW_STEPS {
                engine_warn!("fury::OctreeSceneIndex",
                    "Root still too small after {} doublings", MAX_GROW_STEPS);
                return false;
            }
            self.grow_once(world_aabb);
            steps += 1;
        }

        if steps > 0 {
            engine_info!("fury::OctreeSceneIndex",
                "Root grown {} time(s) to {:?} (max depth {})",
                steps, self.root_bounds(), self.max_depth);
        }
        true
    }

    fn grow_once(&mut self, target: &AABB) {
        let old = self.root_bounds();
        let size = old.max - old.min;
        let mut min = old.min;
        let mut max = old.max;
        let mut old_octant = 0usize;

        for axis in 0..3 {
            if target.min[axis] < old.min[axis] {
                // Grow toward negative: the old root becomes the high half
                min[axis] -= size[axis];
                old_octant |= 1 << axis;
            } else {
                max[axis] += size[axis];
            }
        }

        for node in &mut self.nodes {
            node.depth += 1;
        }
        self.max_depth += 1;

        let mut new_root = OctreeNode::new(AABB::new(min, max), 0);
        new_root.children[old_octant] = self.root;
        self.root = self.nodes.len() as u32;
        self.nodes.push(new_root);
    }
}

// ===== SCENE INDEX TRAIT =====

impl SceneIndex for OctreeSceneIndex {
    fn insert(&mut self, key: EntityKey, world_aabb: &AABB) -> bool {
        self.remove(key);

        if !world_aabb.is_valid() {
            engine_debug!("fury::OctreeSceneIndex", "Ignoring invalid bounds for {:?}", key);
            return false;
        }

        let root_aabb = self.root_bounds();
        if !root_aabb.intersects(world_aabb) {
            engine_trace!("fury::OctreeSceneIndex", "{:?} lies outside the root, not indexed", key);
            return false;
        }
        if !root_aabb.contains(world_aabb) {
            engine_warn!("fury::OctreeSceneIndex",
                "{:?} bounds {:?} exceed the root {:?}, insertion rejected",
                key, world_aabb, root_aabb);
            return false;
        }

        let node_idx = self.descend_and_create(world_aabb);
        self.nodes[node_idx as usize].entities.push((key, *world_aabb));
        self.locations.insert(key, node_idx);
        true
    }

    fn remove(&mut self, key: EntityKey) -> bool {
        let Some(node_idx) = self.locations.remove(&key) else {
            return false;
        };
        let entities = &mut self.nodes[node_idx as usize].entities;
        if let Some(pos) = entities.iter().position(|(k, _)| *k == key) {
            entities.swap_remove(pos);
        }
        true
    }

    fn query<'a>(&'a self, volume: &'a dyn QueryVolume) -> Box<dyn Iterator<Item = EntityKey> + 'a> {
        Box::new(self.query_iter(volume))
    }

    fn bounds(&self, key: EntityKey) -> Option<AABB> {
        let node_idx = *self.locations.get(&key)?;
        self.nodes[node_idx as usize]
            .entities
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, aabb)| *aabb)
    }

    fn contains(&self, key: EntityKey) -> bool {
        self.locations.contains_key(&key)
    }

    /// Drops every entity and every node below the root. A grown root
    /// keeps its grown bounds and depth limit.
    fn clear(&mut self) {
        let root = self.root_bounds();
        self.nodes.clear();
        self.nodes.push(OctreeNode::new(root, 0));
        self.root = 0;
        self.locations.clear();
    }

    fn len(&self) -> usize {
        self.locations.len()
    }
}

// ===== LAZY QUERY =====

/// Lazy octree traversal.
///
/// 3-way classification at each node:
/// - `Outside` → skip the entire subtree
/// - `Inside` → yield every entity of the subtree without further testing
/// - `Partial` → test entities individually and classify children
pub struct OctreeQuery<'a> {
    octree: &'a OctreeSceneIndex,
    volume: &'a dyn QueryVolume,
    /// Pending nodes with their "fully inside" flag
    stack: Vec<(u32, bool)>,
    current: Option<(u32, bool)>,
    cursor: usize,
}

impl<'a> OctreeQuery<'a> {
    fn new(octree: &'a OctreeSceneIndex, volume: &'a dyn QueryVolume) -> Self {
        let mut stack = Vec::new();
        if volume.is_valid() {
            match volume.classify_aabb(&octree.root_bounds()) {
                Containment::Outside => {}
                Containment::Inside => stack.push((octree.root, true)),
                Containment::Partial => stack.push((octree.root, false)),
            }
        }
        Self { octree, volume, stack, current: None, cursor: 0 }
    }

    fn open(&mut self, node_idx: u32, inside: bool) {
        let node = &self.octree.nodes[node_idx as usize];
        for &child in node.children.iter().filter(|&&c| c != NO_CHILD) {
            if inside {
                self.stack.push((child, true));
                continue;
            }
            match self.volume.classify_aabb(&self.octree.nodes[child as usize].aabb) {
                Containment::Outside => {}
                Containment::Inside => self.stack.push((child, true)),
                Containment::Partial => self.stack.push((child, false)),
            }
        }
        self.current = Some((node_idx, inside));
        self.cursor = 0;
    }
}

impl Iterator for OctreeQuery<'_> {
    type Item = EntityKey;

    fn next(&mut self) -> Option<EntityKey> {
        loop {
            if let Some((node_idx, inside)) = self.current {
                let entities = &self.octree.nodes[node_idx as usize].entities;
                while self.cursor < entities.len() {
                    let (key, aabb) = &entities[self.cursor];
                    self.cursor += 1;
                    if inside || self.volume.intersects_aabb(aabb) {
                        return Some(*key);
                    }
                }
                self.current = None;
            }

            let (node_idx, inside) = self.stack.pop()?;
            self.open(node_idx, inside);
        }
    }
}

#[cfg(test)]
#[path = "octree_scene_index_tests.rs"]
mod tests;

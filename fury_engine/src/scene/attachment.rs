//! Renderable attachments and their capability sets.
//!
//! Attachments are a closed set of tagged variants. What an entity can do
//! (be indexed, be drawn, cast shadows, emit light) is resolved through an
//! explicit `CapabilityTable` keyed by attachment kind, so passes filter on
//! capabilities and never match on concrete attachment types.

use std::hash::{Hash, Hasher};
use bitflags::bitflags;
use glam::{Mat4, Vec3};
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use super::aabb::AABB;
use super::query_volume::Sphere;

// ===== ASSET ID =====

/// Stable handle to an asset owned by an external registry.
///
/// The registry is queried by name; the id is the hash of that name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

impl AssetId {
    pub fn named(name: &str) -> Self {
        let mut hasher = FxHasher::default();
        name.hash(&mut hasher);
        AssetId(hasher.finish())
    }
}

// ===== CAPABILITIES =====

bitflags! {
    /// What an entity's attachments allow the pipeline to do with it
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Has a world-space bounding volume (can be spatially indexed)
        const HAS_BOUNDS = 1 << 0;
        /// Can be drawn by geometry passes
        const IS_DRAWABLE = 1 << 1;
        /// Rendered into shadow maps
        const PRODUCES_SHADOW = 1 << 2;
        /// Contributes to lighting passes
        const EMITS_LIGHT = 1 << 3;
    }
}

// ===== LIGHTS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightType {
    Directional,
    Point,
    Spot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDesc {
    pub light_type: LightType,
    pub color: Vec3,
    pub intensity: f32,
    /// Influence radius (ignored for directional lights)
    pub range: f32,
    pub cast_shadows: bool,
}

impl LightDesc {
    pub fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self { light_type: LightType::Point, color, intensity, range, cast_shadows: false }
    }

    pub fn spot(color: Vec3, intensity: f32, range: f32) -> Self {
        Self { light_type: LightType::Spot, color, intensity, range, cast_shadows: false }
    }

    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self { light_type: LightType::Directional, color, intensity, range: 0.0, cast_shadows: false }
    }

    pub fn with_shadows(mut self) -> Self {
        self.cast_shadows = true;
        self
    }

    /// Sphere of influence at `position`. Directional lights are unbounded.
    pub fn influence_volume(&self, position: Vec3) -> Option<Sphere> {
        match self.light_type {
            LightType::Directional => None,
            // Conservative for spots: the cone is inside its range sphere
            LightType::Point | LightType::Spot => Some(Sphere::new(position, self.range)),
        }
    }
}

// ===== MESHES =====

/// Material sorting layer, also used as a draw filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaterialLayer {
    Opaque,
    AlphaTest,
    Transparent,
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshAttachment {
    pub mesh: AssetId,
    pub material: AssetId,
    /// Bounds in the entity's local space
    pub local_bounds: AABB,
    pub layer: MaterialLayer,
    pub cast_shadows: bool,
}

impl MeshAttachment {
    pub fn new(mesh: AssetId, material: AssetId, local_bounds: AABB) -> Self {
        Self { mesh, material, local_bounds, layer: MaterialLayer::Opaque, cast_shadows: true }
    }

    pub fn with_layer(mut self, layer: MaterialLayer) -> Self {
        self.layer = layer;
        self
    }

    pub fn without_shadows(mut self) -> Self {
        self.cast_shadows = false;
        self
    }
}

// ===== ATTACHMENT =====

#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    Mesh(MeshAttachment),
    /// Skinned meshes keep bind-pose bounds; the skeleton is resolved externally
    SkinnedMesh { mesh: MeshAttachment, skeleton: AssetId },
    Light(LightDesc),
}

/// Registration key of the capability table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Mesh,
    SkinnedMesh,
    DirectionalLight,
    PointLight,
    SpotLight,
}

impl Attachment {
    pub fn kind(&self) -> AttachmentKind {
        match self {
            Attachment::Mesh(_) => AttachmentKind::Mesh,
            Attachment::SkinnedMesh { .. } => AttachmentKind::SkinnedMesh,
            Attachment::Light(light) => match light.light_type {
                LightType::Directional => AttachmentKind::DirectionalLight,
                LightType::Point => AttachmentKind::PointLight,
                LightType::Spot => AttachmentKind::SpotLight,
            },
        }
    }

    pub fn mesh(&self) -> Option<&MeshAttachment> {
        match self {
            Attachment::Mesh(mesh) | Attachment::SkinnedMesh { mesh, .. } => Some(mesh),
            Attachment::Light(_) => None,
        }
    }

    pub fn light(&self) -> Option<&LightDesc> {
        match self {
            Attachment::Light(light) => Some(light),
            _ => None,
        }
    }

    /// World-space bounds under `world`, if this attachment is bounded
    pub fn world_bounds(&self, world: &Mat4) -> Option<AABB> {
        match self {
            Attachment::Mesh(mesh) | Attachment::SkinnedMesh { mesh, .. } => {
                Some(mesh.local_bounds.transformed(world))
            }
            Attachment::Light(light) => light
                .influence_volume(world.col(3).truncate())
                .map(|sphere| sphere.bounds()),
        }
    }
}

// ===== CAPABILITY TABLE =====

/// Explicit registration table: attachment kind -> capabilities
#[derive(Debug, Clone)]
pub struct CapabilityTable {
    entries: FxHashMap<AttachmentKind, Capabilities>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        let mut table = Self { entries: FxHashMap::default() };
        table.register(AttachmentKind::Mesh, Capabilities::HAS_BOUNDS | Capabilities::IS_DRAWABLE);
        table.register(AttachmentKind::SkinnedMesh, Capabilities::HAS_BOUNDS | Capabilities::IS_DRAWABLE);
        table.register(AttachmentKind::DirectionalLight, Capabilities::EMITS_LIGHT);
        table.register(AttachmentKind::PointLight, Capabilities::HAS_BOUNDS | Capabilities::EMITS_LIGHT);
        table.register(AttachmentKind::SpotLight, Capabilities::HAS_BOUNDS | Capabilities::EMITS_LIGHT);
        table
    }
}

impl CapabilityTable {
    /// Register (or override) the capabilities of an attachment kind
    pub fn register(&mut self, kind: AttachmentKind, capabilities: Capabilities) {
        self.entries.insert(kind, capabilities);
    }

    pub fn capabilities_of(&self, kind: AttachmentKind) -> Capabilities {
        self.entries.get(&kind).copied().unwrap_or_else(Capabilities::empty)
    }

    /// Capabilities of a single attachment instance
    ///
    /// Drawable meshes flagged `cast_shadows` also produce shadows.
    pub fn resolve(&self, attachment: &Attachment) -> Capabilities {
        let mut caps = self.capabilities_of(attachment.kind());
        if let Some(mesh) = attachment.mesh() {
            if mesh.cast_shadows && caps.contains(Capabilities::IS_DRAWABLE) {
                caps |= Capabilities::PRODUCES_SHADOW;
            }
        }
        caps
    }
}

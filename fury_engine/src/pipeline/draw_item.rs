/// Draw items produced by pass actions.
///
/// A draw item is the unit handed across the draw callback boundary: one
/// entity, one mesh or light, with a 64-bit sort key. Items are sorted with
/// an LSB radix sort on that key.

use glam::{Mat4, Vec3};
use rdst::{RadixKey, RadixSort};
use crate::scene::{AssetId, EntityKey, LightDesc, MaterialLayer, MeshAttachment};

/// What a draw item renders
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawKind {
    Mesh { mesh: AssetId, material: AssetId, skinned: bool },
    Light { light: LightDesc, position: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub entity: EntityKey,
    pub world: Mat4,
    pub kind: DrawKind,
    pub layer: MaterialLayer,
    /// View the item is rendered into (shadow layer index, 0 otherwise)
    pub view: u32,
    pub sort_key: u64,
}

impl DrawItem {
    pub fn mesh(entity: EntityKey, world: Mat4, mesh: &MeshAttachment, skinned: bool, view: u32) -> Self {
        Self {
            entity,
            world,
            kind: DrawKind::Mesh { mesh: mesh.mesh, material: mesh.material, skinned },
            layer: mesh.layer,
            view,
            sort_key: mesh_sort_key(view, mesh.layer, mesh.material, mesh.mesh),
        }
    }

    pub fn light(entity: EntityKey, world: Mat4, light: LightDesc, order: u32) -> Self {
        Self {
            entity,
            world,
            kind: DrawKind::Light { light, position: world.w_axis.truncate() },
            layer: MaterialLayer::Opaque,
            view: 0,
            sort_key: ((light.light_type as u64) << 56) | order as u64,
        }
    }
}

/// Sort key layout, most significant first:
/// view (8 bits) | layer (4 bits) | material (28 bits) | mesh (24 bits)
pub fn mesh_sort_key(view: u32, layer: MaterialLayer, material: AssetId, mesh: AssetId) -> u64 {
    ((view as u64 & 0xFF) << 56)
        | ((layer as u64 & 0xF) << 52)
        | ((material.0 & 0xFFF_FFFF) << 24)
        | (mesh.0 & 0xFF_FFFF)
}

impl RadixKey for DrawItem {
    const LEVELS: usize = 8;

    #[inline]
    fn get_level(&self, level: usize) -> u8 {
        (self.sort_key >> (level * 8)) as u8
    }
}

/// Sort draw items by their sort key
pub fn sort_draw_items(items: &mut Vec<DrawItem>) {
    items.radix_sort_unstable();
}

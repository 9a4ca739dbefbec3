/// Pass action trait and implementations.
///
/// A pass action decides what a pass draws: it collects a draw set from the
/// scene and the spatial index, then records it between `begin_pass()` and
/// `end_pass()`. Actions are selected per pass kind through an explicit
/// `PassActionTable`.

use std::sync::Arc;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::camera::Camera;
use crate::error::Result;
use crate::graphics_device::{CommandList, GpuResource};
use crate::scene::{Capabilities, EntityKey, LightType, QueryVolume, Scene, SceneIndex};
use super::descriptor::{PassDesc, PassKind};
use super::draw_item::{sort_draw_items, DrawItem, DrawKind};

/// Push constant offset of the lighting pass "shadowed" flag
pub const LIGHTING_FLAGS_OFFSET: u32 = 0;
/// Push constant offset of per-light data
pub const LIGHT_DATA_OFFSET: u32 = 16;
/// Push constant offset of the shadow layer index
pub const SHADOW_LAYER_OFFSET: u32 = 64;

/// Everything a pass action can see while it runs
pub struct PassContext<'a> {
    pub desc: &'a PassDesc,
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub index: &'a dyn SceneIndex,
    /// Bound inputs in declaration order, `None` when unavailable
    pub inputs: &'a [Option<GpuResource>],
    /// Layer count of the first output (1 when there is none)
    pub layer_capacity: u32,
}

impl PassContext<'_> {
    /// At least one input is unavailable
    pub fn is_degraded(&self) -> bool {
        self.inputs.iter().any(Option::is_none)
    }
}

/// Action executed by a render pass
pub trait PassAction: Send + Sync {
    /// Build the draw set of the pass
    fn collect(&self, ctx: &PassContext) -> Vec<DrawItem>;

    /// Record draw commands into the command list, returns the draw count
    fn record(&self, _ctx: &PassContext, items: &[DrawItem], cmd: &mut dyn CommandList) -> Result<usize> {
        for item in items {
            cmd.draw(item)?;
        }
        Ok(items.len())
    }
}

// ===== GEOMETRY =====

/// Camera-visible meshes filtered by material layer, sorted by material
pub struct GeometryAction;

impl PassAction for GeometryAction {
    fn collect(&self, ctx: &PassContext) -> Vec<DrawItem> {
        let mut items = Vec::new();
        for key in ctx.index.query(ctx.camera.frustum()) {
            let Some(entity) = ctx.scene.entity(key) else {
                continue; // despawned since the last sync
            };
            if !entity.has(Capabilities::IS_DRAWABLE) {
                continue;
            }
            for (mesh, skinned) in entity.meshes() {
                if ctx.desc.filter.accepts_layer(mesh.layer) {
                    items.push(DrawItem::mesh(key, *entity.world_matrix(), mesh, skinned, 0));
                }
            }
        }
        sort_draw_items(&mut items);
        items
    }

    fn record(&self, ctx: &PassContext, items: &[DrawItem], cmd: &mut dyn CommandList) -> Result<usize> {
        let view_proj = ctx.camera.view_projection_matrix();
        for item in items {
            let mvp = view_proj * item.world;
            cmd.push_constants(0, bytemuck::bytes_of(&mvp))?;
            cmd.draw(item)?;
        }
        Ok(items.len())
    }
}

// ===== SHADOW =====

/// Shadow casters, one layer per shadow-casting light.
///
/// Point and spot lights query their influence sphere, directional lights
/// the camera frustum. Lights beyond the target's layer count are dropped.
pub struct ShadowAction;

impl PassAction for ShadowAction {
    fn collect(&self, ctx: &PassContext) -> Vec<DrawItem> {
        let mut items = Vec::new();
        let mut layer = 0u32;

        for (light_key, light_entity, light) in ctx.scene.lights() {
            if !light.cast_shadows || !ctx.desc.filter.accepts_light(light.light_type) {
                continue;
            }
            if layer >= ctx.layer_capacity {
                crate::engine_debug!("fury::ShadowAction",
                    "Pass '{}': no shadow layer left for {:?}", ctx.desc.name, light_key);
                break;
            }

            let sphere = light.influence_volume(light_entity.world_position());
            let volume: &dyn QueryVolume = match &sphere {
                Some(sphere) => sphere,
                None => ctx.camera.frustum(),
            };

            for key in ctx.index.query(volume) {
                let Some(entity) = ctx.scene.entity(key) else {
                    continue;
                };
                if !entity.has(Capabilities::PRODUCES_SHADOW) {
                    continue;
                }
                for (mesh, skinned) in entity.meshes().filter(|(m, _)| m.cast_shadows) {
                    items.push(DrawItem::mesh(key, *entity.world_matrix(), mesh, skinned, layer));
                }
            }
            layer += 1;
        }

        sort_draw_items(&mut items);
        items
    }

    fn record(&self, _ctx: &PassContext, items: &[DrawItem], cmd: &mut dyn CommandList) -> Result<usize> {
        let mut current_layer = None;
        for item in items {
            if current_layer != Some(item.view) {
                cmd.push_constants(SHADOW_LAYER_OFFSET, &item.view.to_le_bytes())?;
                current_layer = Some(item.view);
            }
            cmd.push_constants(0, bytemuck::bytes_of(&item.world))?;
            cmd.draw(item)?;
        }
        Ok(items.len())
    }
}

// ===== LIGHTING =====

/// One draw per light in view.
///
/// Directional lights are unbounded and always drawn. When an input (the
/// shadow map) is unavailable the "shadowed" flag is cleared and the pass
/// renders unshadowed.
pub struct LightingAction;

impl PassAction for LightingAction {
    fn collect(&self, ctx: &PassContext) -> Vec<DrawItem> {
        let visible: FxHashSet<EntityKey> = ctx.index.query(ctx.camera.frustum()).collect();

        let mut items = Vec::new();
        for (key, entity, light) in ctx.scene.lights() {
            if !ctx.desc.filter.accepts_light(light.light_type) {
                continue;
            }
            if light.light_type != LightType::Directional && !visible.contains(&key) {
                continue;
            }
            items.push(DrawItem::light(key, *entity.world_matrix(), *light, items.len() as u32));
        }
        sort_draw_items(&mut items);
        items
    }

    fn record(&self, ctx: &PassContext, items: &[DrawItem], cmd: &mut dyn CommandList) -> Result<usize> {
        let shadowed: u32 = if ctx.is_degraded() { 0 } else { 1 };
        cmd.push_constants(LIGHTING_FLAGS_OFFSET, &shadowed.to_le_bytes())?;

        for item in items {
            if let DrawKind::Light { light, position } = item.kind {
                let data = [
                    position.x, position.y, position.z, light.range,
                    light.color.x, light.color.y, light.color.z, light.intensity,
                ];
                cmd.push_constants(LIGHT_DATA_OFFSET, bytemuck::cast_slice(&data))?;
            }
            cmd.draw(item)?;
        }
        Ok(items.len())
    }
}

// ===== FULLSCREEN =====

/// Fullscreen pass action (post-processing)
///
/// Pushes the pass parameters (in name order) and draws a fullscreen
/// triangle.
pub struct FullscreenAction;

impl PassAction for FullscreenAction {
    fn collect(&self, _ctx: &PassContext) -> Vec<DrawItem> {
        Vec::new()
    }

    fn record(&self, ctx: &PassContext, _items: &[DrawItem], cmd: &mut dyn CommandList) -> Result<usize> {
        if !ctx.desc.params.is_empty() {
            let values: Vec<f32> = ctx.desc.params.values().copied().collect();
            cmd.push_constants(0, bytemuck::cast_slice(&values))?;
        }
        cmd.draw_fullscreen()?;
        Ok(1)
    }
}

// ===== CUSTOM =====

/// Custom pass action (closure-based)
///
/// Executes a user-provided closure for full control over command
/// recording. Draws nothing by itself.
pub struct CustomAction {
    callback: Box<dyn Fn(&PassContext, &mut dyn CommandList) -> Result<usize> + Send + Sync>,
}

impl CustomAction {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&PassContext, &mut dyn CommandList) -> Result<usize> + Send + Sync + 'static,
    {
        Self { callback: Box::new(callback) }
    }
}

impl PassAction for CustomAction {
    fn collect(&self, _ctx: &PassContext) -> Vec<DrawItem> {
        Vec::new()
    }

    fn record(&self, ctx: &PassContext, _items: &[DrawItem], cmd: &mut dyn CommandList) -> Result<usize> {
        (self.callback)(ctx, cmd)
    }
}

// ===== REGISTRATION TABLE =====

/// Pass kind → action registration table
#[derive(Clone)]
pub struct PassActionTable {
    actions: FxHashMap<PassKind, Arc<dyn PassAction>>,
}

impl PassActionTable {
    /// Table without any registration
    pub fn empty() -> Self {
        Self { actions: FxHashMap::default() }
    }

    /// Register `action` for `kind`, returning the action it replaces
    pub fn register(&mut self, kind: PassKind, action: Arc<dyn PassAction>) -> Option<Arc<dyn PassAction>> {
        self.actions.insert(kind, action)
    }

    pub fn get(&self, kind: PassKind) -> Option<&Arc<dyn PassAction>> {
        self.actions.get(&kind)
    }
}

impl Default for PassActionTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(PassKind::Geometry, Arc::new(GeometryAction));
        table.register(PassKind::Shadow, Arc::new(ShadowAction));
        table.register(PassKind::Lighting, Arc::new(LightingAction));
        table.register(PassKind::PostProcess, Arc::new(FullscreenAction));
        table
    }
}

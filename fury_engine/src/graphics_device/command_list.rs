/// CommandList trait - for recording rendering commands
///
/// The draw callback boundary: passes issue "draw entity E with program P
/// against the bound resources" through this trait and never see the
/// underlying graphics API.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::pipeline::DrawItem;
use super::buffer::Buffer;
use super::program::Program;
use super::texture::Texture;

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-target viewport with a [0, 1] depth range
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// What happens to a pass's targets when the pass begins
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClearPolicy {
    /// Keep previous contents
    Load,
    /// Clear color targets to `color`, depth targets to `depth`
    Clear { color: [f32; 4], depth: f32 },
    /// Contents are undefined
    DontCare,
}

impl Default for ClearPolicy {
    fn default() -> Self {
        ClearPolicy::Clear { color: [0.0, 0.0, 0.0, 1.0], depth: 1.0 }
    }
}

/// Color blend state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Opaque,
    AlphaBlend,
    Additive,
    Multiply,
}

/// A GPU resource handed to a command list
#[derive(Clone)]
pub enum GpuResource {
    Texture(Arc<dyn Texture>),
    Buffer(Arc<dyn Buffer>),
}

impl GpuResource {
    pub fn id(&self) -> u64 {
        match self {
            GpuResource::Texture(texture) => texture.id(),
            GpuResource::Buffer(buffer) => buffer.id(),
        }
    }

    pub fn as_texture(&self) -> Option<&Arc<dyn Texture>> {
        match self {
            GpuResource::Texture(texture) => Some(texture),
            GpuResource::Buffer(_) => None,
        }
    }
}

impl std::fmt::Debug for GpuResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuResource::Texture(texture) => write!(f, "Texture(#{})", texture.id()),
            GpuResource::Buffer(buffer) => write!(f, "Buffer(#{})", buffer.id()),
        }
    }
}

/// Parameters for beginning a pass
pub struct PassBeginDesc<'a> {
    pub name: &'a str,
    /// Render targets in output declaration order
    pub targets: &'a [GpuResource],
    pub clear: ClearPolicy,
    pub viewport: Viewport,
}

/// Command list for recording rendering commands
pub trait CommandList: Send + Sync {
    /// Begin a pass writing to `desc.targets`
    fn begin_pass(&mut self, desc: &PassBeginDesc) -> Result<()>;

    /// End the current pass
    fn end_pass(&mut self) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Bind a shader program with its blend state
    fn bind_program(&mut self, program: &Arc<dyn Program>, blend: BlendMode) -> Result<()>;

    /// Bind a pass input to a slot
    ///
    /// `None` binds the backend's "unavailable" placeholder.
    fn bind_input(&mut self, slot: u32, resource: Option<&GpuResource>) -> Result<()>;

    /// Push constants to the bound program
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset in bytes into push constant range
    /// * `data` - Data to push
    fn push_constants(&mut self, offset: u32, data: &[u8]) -> Result<()>;

    /// Issue work for one draw item with the bound program and inputs
    fn draw(&mut self, item: &DrawItem) -> Result<()>;

    /// Draw a fullscreen triangle
    fn draw_fullscreen(&mut self) -> Result<()>;
}

/// GraphicsDevice trait - resource creation boundary
///
/// The engine never talks to a graphics API directly. Allocation goes
/// through this trait, command recording through `CommandList`.

use std::sync::Arc;
use crate::error::Result;
use super::buffer::{Buffer, BufferDesc};
use super::texture::{Texture, TextureDesc};

/// Device able to create GPU resources
///
/// Shared between owners as `Arc<Mutex<dyn GraphicsDevice>>`.
pub trait GraphicsDevice: Send + Sync {
    /// Create a texture
    ///
    /// # Errors
    ///
    /// `OutOfMemory` when the device cannot satisfy the allocation,
    /// `InvalidShape` when the descriptor is unsupported.
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a buffer
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;
}

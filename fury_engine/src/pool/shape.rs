/// Resource shape keys.
///
/// A shape key is the plain value tuple (width, height, depth, format,
/// kind) exchanged between the pipeline and the pool. All resources with
/// the same key are interchangeable.

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::graphics_device::{
    full_mip_chain, BufferDesc, BufferUsage, SamplerDesc, TextureDesc, TextureDimension,
    TextureFormat, TextureUsage,
};

/// Largest width or height accepted by `ShapeKey::validate`
pub const MAX_EXTENT: u32 = 16384;

/// Largest depth or layer count accepted by `ShapeKey::validate`
pub const MAX_LAYERS: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Texture2D,
    /// `depth` is the layer count (one shadow layer per light, ...)
    Texture2DArray,
    Texture3D,
    /// Six faces; `depth` must be 1
    TextureCube,
    /// Generic buffer of width × height elements of `format`
    Buffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeKey {
    pub width: u32,
    pub height: u32,
    /// Depth (3D) or layer count (arrays); 1 otherwise, where 0 reads as 1
    pub depth: u32,
    pub format: TextureFormat,
    pub kind: ResourceKind,
}

impl ShapeKey {
    pub fn texture_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self { width, height, depth: 1, format, kind: ResourceKind::Texture2D }
    }

    pub fn texture_2d_array(width: u32, height: u32, layers: u32, format: TextureFormat) -> Self {
        Self { width, height, depth: layers, format, kind: ResourceKind::Texture2DArray }
    }

    pub fn buffer(elements: u32, format: TextureFormat) -> Self {
        Self { width: elements, height: 1, depth: 1, format, kind: ResourceKind::Buffer }
    }

    /// Whether `depth` counts layers (arrays) or slices (3D)
    pub fn is_layered(&self) -> bool {
        matches!(self.kind, ResourceKind::Texture2DArray | ResourceKind::Texture3D)
    }

    /// Same shape with an unset depth (0) spelled as 1 on single-layer kinds.
    ///
    /// Both spellings describe the same resource, so the pool keys on the
    /// normalized form.
    pub fn normalized(&self) -> Self {
        if self.depth == 0 && !self.is_layered() {
            Self { depth: 1, ..*self }
        } else {
            *self
        }
    }

    /// Check that the shape can be allocated
    ///
    /// # Errors
    ///
    /// `InvalidShape` for zero extents, oversized extents or layer counts, a
    /// layer count the kind does not allow, or a depth format on a kind that
    /// cannot hold one.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || (self.depth == 0 && self.is_layered()) {
            return Err(Error::InvalidShape(format!("{} has a zero extent", self)));
        }
        if self.width > MAX_EXTENT || self.height > MAX_EXTENT {
            return Err(Error::InvalidShape(format!("{} exceeds {}", self, MAX_EXTENT)));
        }
        if self.depth > MAX_LAYERS {
            return Err(Error::InvalidShape(format!("{} exceeds {} layers", self, MAX_LAYERS)));
        }
        match self.kind {
            ResourceKind::Texture2D | ResourceKind::TextureCube | ResourceKind::Buffer if self.depth > 1 => {
                Err(Error::InvalidShape(format!("{} must have a depth of 1", self)))
            }
            ResourceKind::Texture3D | ResourceKind::Buffer if self.format.is_depth() => {
                Err(Error::InvalidShape(format!("{} cannot use a depth format", self)))
            }
            _ => Ok(()),
        }
    }

    /// Layers actually allocated (cube maps count six faces)
    pub fn layer_count(&self) -> u64 {
        let layers = self.depth.max(1) as u64;
        match self.kind {
            ResourceKind::TextureCube => layers * 6,
            _ => layers,
        }
    }

    /// Tracked memory of one resource of this shape, in bytes.
    ///
    /// Saturates at `u64::MAX` for shapes `validate` would reject.
    pub fn byte_footprint(&self) -> u64 {
        self.checked_footprint().unwrap_or(u64::MAX)
    }

    /// `byte_footprint`, failing with `InvalidShape` instead of overflowing
    pub fn checked_footprint(&self) -> Result<u64> {
        (self.width as u64)
            .checked_mul(self.height as u64)
            .and_then(|n| n.checked_mul(self.layer_count()))
            .and_then(|n| n.checked_mul(self.format.bits_per_pixel() as u64))
            .map(|bits| bits / 8)
            .ok_or_else(|| Error::InvalidShape(format!("{} has no representable size", self)))
    }

    pub fn texture_desc(&self, label: &str, params: &TextureParams) -> TextureDesc {
        let (dimension, depth_or_layers) = match self.kind {
            ResourceKind::Texture2D | ResourceKind::Buffer => (TextureDimension::D2, 1),
            ResourceKind::Texture2DArray => (TextureDimension::D2Array, self.depth),
            ResourceKind::Texture3D => (TextureDimension::D3, self.depth),
            ResourceKind::TextureCube => (TextureDimension::Cube, 6),
        };
        TextureDesc {
            width: self.width,
            height: self.height,
            depth_or_layers,
            format: self.format,
            usage: if self.format.is_depth() {
                TextureUsage::DepthStencil
            } else {
                TextureUsage::SampledAndRenderTarget
            },
            dimension,
            mip_levels: params.mip_levels(self),
            sampler: params.sampler,
            label: label.to_string(),
        }
    }

    pub fn buffer_desc(&self, label: &str) -> BufferDesc {
        BufferDesc { size: self.byte_footprint(), usage: BufferUsage::Storage, label: label.to_string() }
    }
}

// ===== TEXTURE PARAMS =====

/// Creation parameters of a declared texture that are not part of its
/// shape key: sampling state and mipmaps.
///
/// Transient resources always use the defaults (linear, repeat, no mips).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureParams {
    pub sampler: SamplerDesc,
    /// Allocate a full mip chain
    pub mipmap: bool,
}

impl TextureParams {
    pub fn with_sampler(mut self, sampler: SamplerDesc) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_mipmap(mut self, mipmap: bool) -> Self {
        self.mipmap = mipmap;
        self
    }

    /// Mip levels allocated for `shape`
    pub fn mip_levels(&self, shape: &ShapeKey) -> u32 {
        if self.mipmap && shape.kind != ResourceKind::Buffer {
            full_mip_chain(shape.width, shape.height)
        } else {
            1
        }
    }
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{} {:?} {:?}", self.width, self.height, self.depth, self.format, self.kind)
    }
}

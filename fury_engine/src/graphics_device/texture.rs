/// Texture trait, texture descriptor, and texture info

use serde::{Deserialize, Serialize};

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    // Color formats
    R8_UNORM,
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32B32A32_SFLOAT,

    // Depth formats
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    /// Size of one texel in bits
    pub fn bits_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8_UNORM => 8,
            TextureFormat::D16_UNORM => 16,
            TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::R32_SFLOAT
            | TextureFormat::D32_SFLOAT
            | TextureFormat::D24_UNORM_S8_UINT => 32,
            TextureFormat::R16G16B16A16_SFLOAT => 64,
            TextureFormat::R32G32B32A32_SFLOAT => 128,
        }
    }

    /// Returns true for depth and depth/stencil formats
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM | TextureFormat::D32_SFLOAT | TextureFormat::D24_UNORM_S8_UINT
        )
    }
}

/// Texture usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    /// Texture can be sampled in shaders
    Sampled,
    /// Texture can be used as render target
    RenderTarget,
    /// Texture can be used for both
    SampledAndRenderTarget,
    /// Texture can be used as depth/stencil attachment
    DepthStencil,
}

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureDimension {
    D2,
    D2Array,
    D3,
    Cube,
}

// ===== SAMPLER =====

/// Minification/magnification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Addressing mode for coordinates outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WrapMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    /// Samples outside the texture return `SamplerDesc::border_color`
    ClampToBorder,
}

/// Sampling state baked into a texture at creation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerDesc {
    pub filter: FilterMode,
    pub wrap: WrapMode,
    /// RGBA, used with `WrapMode::ClampToBorder`
    pub border_color: [f32; 4],
}

/// Number of levels in a full mip chain for a `width` x `height` base level
pub fn full_mip_chain(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

// ===== TEXTURE DESC =====

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Depth (3D textures) or number of array layers
    pub depth_or_layers: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Usage flags
    pub usage: TextureUsage,
    /// Dimensionality
    pub dimension: TextureDimension,
    /// Mip levels, 1 for no mipmaps
    pub mip_levels: u32,
    /// Sampling state
    pub sampler: SamplerDesc,
    /// Debug label
    pub label: String,
}

// ===== TEXTURE INFO =====

/// Read-only properties of a created texture.
#[derive(Debug, Clone)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub depth_or_layers: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub dimension: TextureDimension,
    pub mip_levels: u32,
    pub sampler: SamplerDesc,
}

impl TextureInfo {
    pub fn from_desc(desc: &TextureDesc) -> Self {
        Self {
            width: desc.width,
            height: desc.height,
            depth_or_layers: desc.depth_or_layers,
            format: desc.format,
            usage: desc.usage,
            dimension: desc.dimension,
            mip_levels: desc.mip_levels,
            sampler: desc.sampler,
        }
    }

    /// Returns true if this texture is a texture array
    pub fn is_array(&self) -> bool {
        self.dimension == TextureDimension::D2Array && self.depth_or_layers > 1
    }
}

// ===== TEXTURE TRAIT =====

/// Texture resource trait
///
/// Implemented by backend-specific texture types.
/// The texture is automatically destroyed when dropped.
pub trait Texture: Send + Sync {
    /// Get the read-only properties of this texture
    fn info(&self) -> &TextureInfo;

    /// Backend-unique identifier
    fn id(&self) -> u64;
}

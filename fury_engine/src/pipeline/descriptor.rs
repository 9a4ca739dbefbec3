/// Declarative pipeline descriptors.
///
/// A `PipelineDesc` is the human-editable document that defines a complete
/// frame: the named persistent resources it uses and the ordered passes
/// that produce and consume them. Stored as RON.

use std::collections::BTreeMap;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::config;
use crate::error::Result;
use crate::graphics_device::{BlendMode, ClearPolicy, TextureFormat, Viewport};
use crate::pool::{ResourceKind, ShapeKey, TextureParams};
use crate::scene::{LightType, MaterialLayer};

// ===== PASS KIND =====

/// Closed set of pass kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassKind {
    /// Draws visible meshes into the bound targets
    Geometry,
    /// Draws shadow casters once per shadow-casting light
    Shadow,
    /// Draws one light volume per visible light
    Lighting,
    /// Single fullscreen draw over the inputs
    PostProcess,
}

// ===== BINDINGS =====

/// Where a pass input comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingSource {
    /// A pipeline-scoped declared resource
    Resource(String),
    /// A named output of an earlier pass
    Pass { pass: String, output: String },
}

impl BindingSource {
    pub fn resource(name: &str) -> Self {
        BindingSource::Resource(name.to_string())
    }

    pub fn pass(pass: &str, output: &str) -> Self {
        BindingSource::Pass { pass: pass.to_string(), output: output.to_string() }
    }

    /// Name as written in error messages (`pass.output` for pass outputs)
    pub fn display_name(&self) -> String {
        match self {
            BindingSource::Resource(name) => name.clone(),
            BindingSource::Pass { pass, output } => format!("{}.{}", pass, output),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBinding {
    pub name: String,
    pub source: BindingSource,
}

/// Extent of a transient output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutputSize {
    Fixed { width: u32, height: u32 },
    /// Camera viewport scaled by `scale`
    Viewport { scale: f32 },
}

impl OutputSize {
    /// Concrete extent for the given viewport (never below 1×1 unless fixed)
    pub fn resolve(&self, viewport: &Viewport) -> (u32, u32) {
        match *self {
            OutputSize::Fixed { width, height } => (width, height),
            OutputSize::Viewport { scale } => (
                ((viewport.width * scale).round() as u32).max(1),
                ((viewport.height * scale).round() as u32).max(1),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutputTarget {
    /// Acquired from the pool for the duration of its lifetime
    Transient {
        size: OutputSize,
        /// Depth (3D) or layer count (arrays); 1 otherwise
        depth: u32,
        format: TextureFormat,
        kind: ResourceKind,
    },
    /// Writes into a declared resource
    Resource(String),
}

impl OutputTarget {
    /// Viewport-sized 2D target
    pub fn viewport(format: TextureFormat) -> Self {
        OutputTarget::Transient {
            size: OutputSize::Viewport { scale: 1.0 },
            depth: 1,
            format,
            kind: ResourceKind::Texture2D,
        }
    }

    pub fn fixed(width: u32, height: u32, format: TextureFormat) -> Self {
        OutputTarget::Transient {
            size: OutputSize::Fixed { width, height },
            depth: 1,
            format,
            kind: ResourceKind::Texture2D,
        }
    }

    /// Fixed-size 2D array, one layer per shadow-casting light
    pub fn layers(width: u32, height: u32, layers: u32, format: TextureFormat) -> Self {
        OutputTarget::Transient {
            size: OutputSize::Fixed { width, height },
            depth: layers,
            format,
            kind: ResourceKind::Texture2DArray,
        }
    }

    /// Pool shape of a transient target for the given viewport
    pub fn transient_shape(&self, viewport: &Viewport) -> Option<ShapeKey> {
        match self {
            OutputTarget::Transient { size, depth, format, kind } => {
                let (width, height) = size.resolve(viewport);
                Some(ShapeKey { width, height, depth: *depth, format: *format, kind: *kind })
            }
            OutputTarget::Resource(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputBinding {
    pub name: String,
    pub target: OutputTarget,
}

// ===== DRAW FILTER =====

/// Restricts what a pass draws. Empty fields accept everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawFilter {
    pub light_type: Option<LightType>,
    pub layers: Vec<MaterialLayer>,
}

impl DrawFilter {
    pub fn accepts_layer(&self, layer: MaterialLayer) -> bool {
        self.layers.is_empty() || self.layers.contains(&layer)
    }

    pub fn accepts_light(&self, light_type: LightType) -> bool {
        self.light_type.map_or(true, |t| t == light_type)
    }
}

// ===== PASS =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassDesc {
    pub name: String,
    pub kind: PassKind,
    /// Shader program looked up in the program registry
    pub program: String,
    #[serde(default)]
    pub inputs: Vec<InputBinding>,
    #[serde(default)]
    pub outputs: Vec<OutputBinding>,
    #[serde(default)]
    pub filter: DrawFilter,
    #[serde(default)]
    pub clear: ClearPolicy,
    #[serde(default)]
    pub blend: BlendMode,
    /// Pushed as constants by passes that use them
    #[serde(default)]
    pub params: BTreeMap<String, f32>,
}

impl PassDesc {
    pub fn new(name: &str, kind: PassKind, program: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            program: program.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            filter: DrawFilter::default(),
            clear: ClearPolicy::default(),
            blend: BlendMode::default(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, name: &str, source: BindingSource) -> Self {
        self.inputs.push(InputBinding { name: name.to_string(), source });
        self
    }

    pub fn with_output(mut self, name: &str, target: OutputTarget) -> Self {
        self.outputs.push(OutputBinding { name: name.to_string(), target });
        self
    }

    pub fn with_filter(mut self, filter: DrawFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_clear(mut self, clear: ClearPolicy) -> Self {
        self.clear = clear;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_param(mut self, name: &str, value: f32) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|o| o.name == name)
    }
}

// ===== PIPELINE =====

/// Persistent resource declared by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDecl {
    pub name: String,
    pub shape: ShapeKey,
    /// Sampling state and mipmaps; defaults when omitted
    #[serde(default)]
    pub params: TextureParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDesc {
    pub name: String,
    #[serde(default)]
    pub resources: Vec<ResourceDecl>,
    pub passes: Vec<PassDesc>,
}

impl PipelineDesc {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), resources: Vec::new(), passes: Vec::new() }
    }

    pub fn with_resource(mut self, name: &str, shape: ShapeKey) -> Self {
        self.with_resource_params(name, shape, TextureParams::default())
    }

    pub fn with_resource_params(mut self, name: &str, shape: ShapeKey, params: TextureParams) -> Self {
        self.resources.push(ResourceDecl { name: name.to_string(), shape, params });
        self
    }

    pub fn with_pass(mut self, pass: PassDesc) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn pass(&self, name: &str) -> Option<&PassDesc> {
        self.passes.iter().find(|p| p.name == name)
    }

    pub fn from_ron(text: &str) -> Result<Self> {
        config::from_ron_str(text)
    }

    pub fn to_ron(&self) -> Result<String> {
        config::to_ron_string(self)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        config::load_ron_file(path)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        config::save_ron_file(self, path)
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;

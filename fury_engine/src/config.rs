//! Configuration documents
//!
//! Every declarative document of the engine (pipeline descriptors, engine
//! setup) is a serde type stored as RON. Parse and IO failures surface as
//! `Error::ConfigurationError`.

use std::path::Path;
use glam::Vec3;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::log::LogSeverity;
use crate::pipeline::PipelineDesc;
use crate::scene::AABB;

// ===== RON HELPERS =====

/// Parse a RON document
pub fn from_ron_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    ron::from_str(text).map_err(|e| Error::ConfigurationError(format!("parse error: {}", e)))
}

/// Serialize to pretty-printed RON
pub fn to_ron_string<T: Serialize>(value: &T) -> Result<String> {
    ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
        .map_err(|e| Error::ConfigurationError(format!("serialization error: {}", e)))
}

pub fn load_ron_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::ConfigurationError(format!("cannot read '{}': {}", path.display(), e))
    })?;
    from_ron_str(&contents)
}

pub fn save_ron_file<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let contents = to_ron_string(value)?;
    std::fs::write(path, contents).map_err(|e| {
        Error::ConfigurationError(format!("cannot write '{}': {}", path.display(), e))
    })
}

// ===== CONFIG TYPES =====

/// Spatial index setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Root region of the index
    pub bounds: AABB,
    /// Maximum subdivision depth (root = 0)
    pub max_depth: u32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            bounds: AABB::new(Vec3::splat(-1024.0), Vec3::splat(1024.0)),
            max_depth: 6,
        }
    }
}

/// Transient pool setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Name used in log lines (one pool per resolution tier, ...)
    pub label: String,
    /// Upper bound on tracked memory; `None` means unbounded
    pub memory_budget: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { label: "transient".to_string(), memory_budget: None }
    }
}

/// Complete frame setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub octree: OctreeConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default = "default_min_severity")]
    pub min_log_severity: LogSeverity,
    pub pipeline: PipelineDesc,
}

fn default_min_severity() -> LogSeverity {
    LogSeverity::Info
}

impl EngineConfig {
    pub fn new(pipeline: PipelineDesc) -> Self {
        Self {
            octree: OctreeConfig::default(),
            pool: PoolConfig::default(),
            min_log_severity: default_min_severity(),
            pipeline,
        }
    }

    pub fn from_ron(text: &str) -> Result<Self> {
        from_ron_str(text)
    }

    pub fn to_ron(&self) -> Result<String> {
        to_ron_string(self)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_ron_file(path)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_ron_file(self, path)
    }
}

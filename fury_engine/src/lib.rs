/*!
# Fury Engine

Rendering core for the Fury engine: the spatial index that answers
visibility queries, the declarative render pipeline that sequences GPU
passes over the results, and the transient resource pool that supplies
their render targets.

## Architecture

- **Scene / SceneIndex**: entity tree and the octree queried by passes
- **RenderPipeline**: loads a `PipelineDesc` and executes its passes per frame
- **TransientPool**: keyed, LIFO-reusing cache of GPU resources
- **GraphicsDevice / CommandList**: boundary to the graphics API
  (a headless implementation is provided)

Pools, indices and pipelines are explicit instances owned by the caller.
The logger is the only process-wide state.
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod camera;
pub mod scene;
pub mod graphics_device;
pub mod pool;
pub mod pipeline;

// Main fury namespace module
pub mod fury {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging sub-module (types and setters, the engine_* macros stay internal)
    pub mod log {
        pub use crate::log::{
            min_severity, reset_logger, set_logger, set_min_severity, DefaultLogger, LogEntry,
            LogSeverity, Logger,
        };
    }

    // Configuration documents
    pub mod config {
        pub use crate::config::*;
    }

    // Camera and frustum
    pub mod camera {
        pub use crate::camera::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Graphics API boundary
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Transient resource pool
    pub mod pool {
        pub use crate::pool::*;
    }

    // Render pipeline
    pub mod pipeline {
        pub use crate::pipeline::*;
    }
}

// Re-export math library at crate root
pub use glam;

/// Transient GPU resource pool

pub mod shape;
pub mod pooled_resource;
pub mod transient_pool;

pub use shape::{ResourceKind, ShapeKey, TextureParams, MAX_EXTENT, MAX_LAYERS};
pub use pooled_resource::{AllocationState, PooledHandle, ResourceKey};
pub use transient_pool::{PoolStats, TransientPool};

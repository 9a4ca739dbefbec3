/// Pool entries and their allocation state machine.
///
/// Transitions are driven only by `TransientPool`:
///
/// ```text
/// Unallocated --materialize--> Allocated --declare(changed)/mark_dirty--> Dirty
///      ^                          |  ^                                     |
///      |                          |  +-------------materialize-------------+
///      +------release_all---------+
/// any --release_declared--> Released
/// ```

use slotmap::new_key_type;
use crate::graphics_device::GpuResource;
use super::shape::{ShapeKey, TextureParams};

new_key_type! {
    /// Stable key of a pool entry
    pub struct ResourceKey;
}

/// Allocation state of a pool entry
#[derive(Debug, Clone)]
pub enum AllocationState {
    /// Declared, no GPU allocation yet
    Unallocated,
    /// GPU allocation valid for `shape`
    Allocated { resource: GpuResource, shape: ShapeKey },
    /// Allocation exists but no longer matches the declaration
    Dirty { resource: GpuResource, shape: ShapeKey },
    /// Explicitly released; cannot be materialized again
    Released,
}

impl AllocationState {
    pub fn is_allocated(&self) -> bool {
        matches!(self, AllocationState::Allocated { .. })
    }

    /// Shape of the live allocation, if any
    pub fn allocated_shape(&self) -> Option<&ShapeKey> {
        match self {
            AllocationState::Allocated { shape, .. } | AllocationState::Dirty { shape, .. } => Some(shape),
            AllocationState::Unallocated | AllocationState::Released => None,
        }
    }

    pub fn resource(&self) -> Option<&GpuResource> {
        match self {
            AllocationState::Allocated { resource, .. } | AllocationState::Dirty { resource, .. } => {
                Some(resource)
            }
            AllocationState::Unallocated | AllocationState::Released => None,
        }
    }
}

/// One entry of the pool
#[derive(Debug)]
pub(crate) struct PooledResource {
    /// Requested shape (for declared entries, the latest declaration)
    pub shape: ShapeKey,
    /// Sampling and mip parameters (defaults for transient entries)
    pub params: TextureParams,
    pub state: AllocationState,
    /// Held by a pass (transient entries only)
    pub checked_out: bool,
    /// Set for declared, named entries
    pub name: Option<String>,
}

/// A checked-out transient resource.
///
/// Not `Clone`: giving it back to `TransientPool::release` consumes it, so a
/// released handle cannot be used again.
#[derive(Debug)]
pub struct PooledHandle {
    pub(crate) key: ResourceKey,
    pub(crate) shape: ShapeKey,
    pub(crate) resource: GpuResource,
}

impl PooledHandle {
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    pub fn shape(&self) -> &ShapeKey {
        &self.shape
    }

    pub fn resource(&self) -> &GpuResource {
        &self.resource
    }
}

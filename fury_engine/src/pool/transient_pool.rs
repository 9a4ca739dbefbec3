/// Transient resource pool.
///
/// Keyed cache of GPU resources (render targets, generic buffers). Each
/// shape key owns a LIFO free stack: `acquire` pops the most recently
/// released resource or allocates a new one, `release` pushes it back.
/// Tracked memory changes only on allocation and deallocation, never on
/// check-out/check-in.
///
/// The pool is an explicit instance: create one per device, resolution
/// tier or test, and pass it by reference to the pipeline.

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::graphics_device::{GpuResource, GraphicsDevice};
use crate::{engine_debug, engine_err, engine_info, engine_trace, engine_warn};
use super::pooled_resource::{AllocationState, PooledHandle, PooledResource, ResourceKey};
use super::shape::{ResourceKind, ShapeKey, TextureParams};

const SOURCE: &str = "fury::TransientPool";

/// Snapshot of pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Bytes currently allocated through this pool
    pub memory_bytes: u64,
    /// Entries holding a live GPU allocation
    pub resource_count: usize,
    /// Transient entries resident in free stacks
    pub free_count: usize,
    /// Transient entries held by passes
    pub checked_out_count: usize,
    /// Device allocations performed since creation
    pub allocation_count: u64,
}

pub struct TransientPool {
    graphics_device: Arc<Mutex<dyn GraphicsDevice>>,
    config: PoolConfig,
    resources: SlotMap<ResourceKey, PooledResource>,
    free_stacks: FxHashMap<ShapeKey, Vec<ResourceKey>>,
    declared: FxHashMap<String, ResourceKey>,
    memory_bytes: u64,
    allocation_count: u64,
}

impl TransientPool {
    pub fn new(graphics_device: Arc<Mutex<dyn GraphicsDevice>>) -> Self {
        Self::with_config(graphics_device, PoolConfig::default())
    }

    pub fn with_config(graphics_device: Arc<Mutex<dyn GraphicsDevice>>, config: PoolConfig) -> Self {
        Self {
            graphics_device,
            config,
            resources: SlotMap::with_key(),
            free_stacks: FxHashMap::default(),
            declared: FxHashMap::default(),
            memory_bytes: 0,
            allocation_count: 0,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    // ===== ALLOCATION =====

    /// Allocate a GPU resource for `shape` and account for its footprint
    fn allocate(&mut self, shape: &ShapeKey, label: &str, params: &TextureParams) -> Result<GpuResource> {
        let footprint = shape.checked_footprint()?;
        if let Some(budget) = self.config.memory_budget {
            if self.memory_bytes.saturating_add(footprint) > budget {
                engine_warn!(SOURCE, "[{}] {} ({} bytes) exceeds budget: {}/{} bytes in use",
                    self.config.label, shape, footprint, self.memory_bytes, budget);
                return Err(Error::OutOfMemory);
            }
        }

        let resource = {
            let mut device = self.graphics_device.lock()
                .map_err(|_| engine_err!(SOURCE, "[{}] graphics device lock poisoned", self.config.label))?;
            match shape.kind {
                ResourceKind::Buffer => GpuResource::Buffer(device.create_buffer(&shape.buffer_desc(label))?),
                _ => GpuResource::Texture(device.create_texture(&shape.texture_desc(label, params))?),
            }
        };

        self.memory_bytes = self.memory_bytes.saturating_add(footprint);
        self.allocation_count += 1;
        engine_debug!(SOURCE, "[{}] Allocated '{}' {} (+{} bytes, total {})",
            self.config.label, label, shape, footprint, self.memory_bytes);
        Ok(resource)
    }

    fn deallocate(&mut self, shape: &ShapeKey) {
        self.memory_bytes = self.memory_bytes.saturating_sub(shape.byte_footprint());
    }

    // ===== TRANSIENT RESOURCES =====

    /// Check out a resource of `shape`.
    ///
    /// Reuses the most recently released resource with the same key, or
    /// allocates a new one.
    ///
    /// # Errors
    ///
    /// `InvalidShape` for shapes that cannot exist, `OutOfMemory` when the
    /// device or the pool budget refuses the allocation.
    pub fn acquire(&mut self, shape: &ShapeKey) -> Result<PooledHandle> {
        let shape = &shape.normalized();
        shape.validate()?;

        if let Some(key) = self.free_stacks.get_mut(shape).and_then(Vec::pop) {
            if let Some(entry) = self.resources.get_mut(key) {
                if let Some(resource) = entry.state.resource().cloned() {
                    entry.checked_out = true;
                    engine_trace!(SOURCE, "[{}] Reused {}", self.config.label, shape);
                    return Ok(PooledHandle { key, shape: *shape, resource });
                }
            }
        }

        let resource = self.allocate(shape, "transient", &TextureParams::default())?;
        let key = self.resources.insert(PooledResource {
            shape: *shape,
            params: TextureParams::default(),
            state: AllocationState::Allocated { resource: resource.clone(), shape: *shape },
            checked_out: true,
            name: None,
        });
        Ok(PooledHandle { key, shape: *shape, resource })
    }

    /// Return a checked-out resource to its free stack.
    ///
    /// Does not deallocate and does not change tracked memory.
    pub fn release(&mut self, handle: PooledHandle) -> Result<()> {
        let entry = self.resources.get_mut(handle.key).ok_or_else(|| {
            Error::InvalidResource(format!("stale handle for {}", handle.shape))
        })?;
        if !entry.checked_out || entry.name.is_some() {
            return Err(Error::InvalidResource(format!("{} is not checked out", handle.shape)));
        }

        entry.checked_out = false;
        self.free_stacks.entry(handle.shape).or_default().push(handle.key);
        Ok(())
    }

    /// Deallocate a checked-out resource instead of returning it.
    pub fn destroy(&mut self, handle: PooledHandle) -> Result<()> {
        match self.resources.get(handle.key) {
            Some(entry) if entry.checked_out && entry.name.is_none() => {}
            _ => return Err(Error::InvalidResource(format!("stale handle for {}", handle.shape))),
        }
        self.resources.remove(handle.key);
        self.deallocate(&handle.shape);
        Ok(())
    }

    /// Replace a checked-out resource with one of a different shape.
    ///
    /// Shape keys never change in place: the old resource is destroyed
    /// (memory decremented) and a new one acquired. An invalid `new_shape`
    /// returns the old resource to the pool and fails.
    pub fn reshape(&mut self, handle: PooledHandle, new_shape: &ShapeKey) -> Result<PooledHandle> {
        if let Err(err) = new_shape.validate() {
            self.release(handle)?;
            return Err(err);
        }
        self.destroy(handle)?;
        self.acquire(new_shape)
    }

    /// Deallocate every free transient resource (e.g. on resolution change).
    ///
    /// Returns the number of resources destroyed.
    pub fn release_unused(&mut self) -> usize {
        let stacks = std::mem::take(&mut self.free_stacks);
        let mut count = 0;
        for (shape, keys) in stacks {
            for key in keys {
                if self.resources.remove(key).is_some() {
                    self.deallocate(&shape);
                    count += 1;
                }
            }
        }
        if count > 0 {
            engine_info!(SOURCE, "[{}] Released {} unused resources ({} bytes remain)",
                self.config.label, count, self.memory_bytes);
        }
        count
    }

    /// Deallocate everything, free and checked-out, and reset tracked memory.
    ///
    /// Outstanding handles become stale. Declared resources return to
    /// `Unallocated` and are re-created on their next `materialize`.
    pub fn release_all(&mut self) {
        let before = self.resources.len();
        self.resources.retain(|_, entry| entry.name.is_some());
        for entry in self.resources.values_mut() {
            if !matches!(entry.state, AllocationState::Released) {
                entry.state = AllocationState::Unallocated;
            }
        }
        self.free_stacks.clear();
        self.memory_bytes = 0;
        engine_info!(SOURCE, "[{}] Released all resources ({} transient)",
            self.config.label, before - self.resources.len());
    }

    // ===== DECLARED RESOURCES =====

    /// Declare a named, persistent resource without allocating it.
    ///
    /// Re-declaring with identical parameters keeps the current allocation;
    /// changed parameters mark it dirty so the next `materialize` reallocates.
    pub fn declare(&mut self, name: &str, shape: &ShapeKey) -> Result<ResourceKey> {
        self.declare_with(name, shape, &TextureParams::default())
    }

    /// `declare` with explicit sampling and mip parameters.
    ///
    /// A change of `params` alone also marks the allocation dirty.
    pub fn declare_with(&mut self, name: &str, shape: &ShapeKey, params: &TextureParams) -> Result<ResourceKey> {
        let shape = &shape.normalized();
        shape.validate()?;

        if let Some(&key) = self.declared.get(name) {
            if let Some(entry) = self.resources.get_mut(key) {
                if entry.shape != *shape || entry.params != *params {
                    entry.shape = *shape;
                    entry.params = *params;
                    entry.state = match std::mem::replace(&mut entry.state, AllocationState::Unallocated) {
                        AllocationState::Allocated { resource, shape } | AllocationState::Dirty { resource, shape } => {
                            AllocationState::Dirty { resource, shape }
                        }
                        AllocationState::Unallocated | AllocationState::Released => AllocationState::Unallocated,
                    };
                    engine_debug!(SOURCE, "[{}] '{}' redeclared as {}", self.config.label, name, shape);
                } else if matches!(entry.state, AllocationState::Released) {
                    entry.state = AllocationState::Unallocated;
                }
                return Ok(key);
            }
        }

        let key = self.resources.insert(PooledResource {
            shape: *shape,
            params: *params,
            state: AllocationState::Unallocated,
            checked_out: false,
            name: Some(name.to_string()),
        });
        self.declared.insert(name.to_string(), key);
        Ok(key)
    }

    /// Ensure a declared resource is allocated and return it.
    ///
    /// Skips the device call when a valid, clean allocation exists.
    pub fn materialize(&mut self, key: ResourceKey) -> Result<GpuResource> {
        let entry = self.resources.get_mut(key)
            .ok_or_else(|| Error::InvalidResource("unknown declared resource".to_string()))?;
        let name = entry.name.clone().unwrap_or_default();
        let shape = entry.shape;
        let params = entry.params;

        match std::mem::replace(&mut entry.state, AllocationState::Unallocated) {
            AllocationState::Allocated { resource, shape: allocated } if allocated == shape => {
                entry.state = AllocationState::Allocated { resource: resource.clone(), shape };
                return Ok(resource);
            }
            AllocationState::Released => {
                entry.state = AllocationState::Released;
                return Err(Error::InvalidResource(format!("'{}' was released", name)));
            }
            AllocationState::Allocated { shape: stale, .. } | AllocationState::Dirty { shape: stale, .. } => {
                self.deallocate(&stale);
            }
            AllocationState::Unallocated => {}
        }

        let resource = self.allocate(&shape, &name, &params)?;
        if let Some(entry) = self.resources.get_mut(key) {
            entry.state = AllocationState::Allocated { resource: resource.clone(), shape };
        }
        Ok(resource)
    }

    /// Force the next `materialize` to reallocate
    pub fn mark_dirty(&mut self, key: ResourceKey) -> Result<()> {
        let entry = self.resources.get_mut(key)
            .ok_or_else(|| Error::InvalidResource("unknown declared resource".to_string()))?;
        if let AllocationState::Allocated { .. } = entry.state {
            if let AllocationState::Allocated { resource, shape } =
                std::mem::replace(&mut entry.state, AllocationState::Unallocated)
            {
                entry.state = AllocationState::Dirty { resource, shape };
            }
        }
        Ok(())
    }

    /// Deallocate a declared resource and retire it
    pub fn release_declared(&mut self, name: &str) -> Result<()> {
        let key = *self.declared.get(name)
            .ok_or_else(|| Error::InvalidResource(format!("'{}' is not declared", name)))?;
        let stale = match self.resources.get_mut(key) {
            Some(entry) => {
                let stale = entry.state.allocated_shape().copied();
                entry.state = AllocationState::Released;
                stale
            }
            None => None,
        };
        if let Some(shape) = stale {
            self.deallocate(&shape);
        }
        Ok(())
    }

    pub fn declared(&self, name: &str) -> Option<ResourceKey> {
        self.declared.get(name).copied()
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.contains_key(name)
    }

    pub fn state(&self, key: ResourceKey) -> Option<&AllocationState> {
        self.resources.get(key).map(|entry| &entry.state)
    }

    /// Latest declared parameters of a declared resource
    pub fn declared_params(&self, key: ResourceKey) -> Option<&TextureParams> {
        self.resources.get(key).filter(|e| e.name.is_some()).map(|e| &e.params)
    }

    /// Latest declared shape of a declared resource
    pub fn declared_shape(&self, key: ResourceKey) -> Option<&ShapeKey> {
        self.resources.get(key).filter(|e| e.name.is_some()).map(|e| &e.shape)
    }

    // ===== STATISTICS =====

    pub fn memory_bytes(&self) -> u64 {
        self.memory_bytes
    }

    /// Entries holding a live GPU allocation
    pub fn resource_count(&self) -> usize {
        self.resources.values().filter(|e| e.state.resource().is_some()).count()
    }

    pub fn free_count(&self, shape: &ShapeKey) -> usize {
        self.free_stacks.get(shape).map_or(0, Vec::len)
    }

    pub fn checked_out_count(&self) -> usize {
        self.resources.values().filter(|e| e.checked_out).count()
    }

    pub fn allocation_count(&self) -> u64 {
        self.allocation_count
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            memory_bytes: self.memory_bytes,
            resource_count: self.resource_count(),
            free_count: self.free_stacks.values().map(Vec::len).sum(),
            checked_out_count: self.checked_out_count(),
            allocation_count: self.allocation_count,
        }
    }
}

#[cfg(test)]
#[path = "transient_pool_tests.rs"]
mod tests;

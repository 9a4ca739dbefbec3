//! Unit tests for transient_pool.rs
//!
//! Uses the headless device to observe allocations.

use std::sync::{Arc, Mutex};
use crate::config::PoolConfig;
use crate::error::Error;
use crate::graphics_device::{FilterMode, HeadlessDevice, SamplerDesc, TextureFormat, WrapMode};
use crate::pool::{AllocationState, ShapeKey, TextureParams, TransientPool, MAX_EXTENT};

// ============================================================================
// HELPERS
// ============================================================================

fn setup() -> (Arc<Mutex<HeadlessDevice>>, TransientPool) {
    let device = Arc::new(Mutex::new(HeadlessDevice::new()));
    let pool = TransientPool::new(device.clone());
    (device, pool)
}

fn setup_with_budget(budget: u64) -> (Arc<Mutex<HeadlessDevice>>, TransientPool) {
    let device = Arc::new(Mutex::new(HeadlessDevice::new()));
    let config = PoolConfig { label: "budgeted".to_string(), memory_budget: Some(budget) };
    let pool = TransientPool::with_config(device.clone(), config);
    (device, pool)
}

fn color(width: u32, height: u32) -> ShapeKey {
    ShapeKey::texture_2d(width, height, TextureFormat::R8G8B8A8_UNORM)
}

// ============================================================================
// ACQUIRE / RELEASE
// ============================================================================

#[test]
fn test_acquire_release_acquire_reuses_resource() {
    let (device, mut pool) = setup();
    let shape = color(1920, 1080);

    let first = pool.acquire(&shape).unwrap();
    let first_id = first.resource().id();
    let memory = pool.memory_bytes();
    assert_eq!(memory, 1920 * 1080 * 4);

    pool.release(first).unwrap();
    assert_eq!(pool.memory_bytes(), memory);
    assert_eq!(pool.free_count(&shape), 1);

    let second = pool.acquire(&shape).unwrap();
    assert_eq!(second.resource().id(), first_id);
    assert_eq!(pool.memory_bytes(), memory);
    assert_eq!(device.lock().unwrap().allocation_count(), 1);
}

#[test]
fn test_distinct_keys_accumulate_memory() {
    let (_device, mut pool) = setup();
    let a = color(1920, 1080);
    let b = color(2048, 2048);

    let ha = pool.acquire(&a).unwrap();
    let hb = pool.acquire(&b).unwrap();

    assert_ne!(ha.resource().id(), hb.resource().id());
    assert_eq!(pool.memory_bytes(), a.byte_footprint() + b.byte_footprint());
    assert_eq!(pool.checked_out_count(), 2);
}

#[test]
fn test_checked_out_resource_is_not_handed_out_twice() {
    let (_device, mut pool) = setup();
    let shape = color(64, 64);

    let a = pool.acquire(&shape).unwrap();
    let b = pool.acquire(&shape).unwrap();
    assert_ne!(a.resource().id(), b.resource().id());
}

#[test]
fn test_reuse_is_lifo() {
    let (_device, mut pool) = setup();
    let shape = color(256, 256);

    let a = pool.acquire(&shape).unwrap();
    let b = pool.acquire(&shape).unwrap();
    let b_id = b.resource().id();
    let a_id = a.resource().id();

    pool.release(a).unwrap();
    pool.release(b).unwrap();

    assert_eq!(pool.acquire(&shape).unwrap().resource().id(), b_id);
    assert_eq!(pool.acquire(&shape).unwrap().resource().id(), a_id);
}

#[test]
fn test_acquire_invalid_shape() {
    let (device, mut pool) = setup();
    let result = pool.acquire(&color(0, 1080));
    assert!(matches!(result, Err(Error::InvalidShape(_))));
    assert_eq!(device.lock().unwrap().allocation_count(), 0);
    assert_eq!(pool.memory_bytes(), 0);
}

#[test]
fn test_acquire_oversized_layer_count() {
    let (device, mut pool) = setup();
    let shape = ShapeKey::texture_2d_array(MAX_EXTENT, MAX_EXTENT, u32::MAX, TextureFormat::R32G32B32A32_SFLOAT);
    assert!(matches!(pool.acquire(&shape), Err(Error::InvalidShape(_))));
    assert_eq!(device.lock().unwrap().allocation_count(), 0);
    assert_eq!(pool.memory_bytes(), 0);
}

#[test]
fn test_unset_depth_shares_free_stack() {
    let (device, mut pool) = setup();
    let flat = ShapeKey { depth: 0, ..color(64, 64) };
    let handle = pool.acquire(&flat).unwrap();
    assert_eq!(handle.shape(), &color(64, 64));
    let id = handle.resource().id();
    pool.release(handle).unwrap();

    let again = pool.acquire(&color(64, 64)).unwrap();
    assert_eq!(again.resource().id(), id);
    assert_eq!(device.lock().unwrap().allocation_count(), 1);
}

#[test]
fn test_release_after_release_all_is_stale() {
    let (_device, mut pool) = setup();
    let handle = pool.acquire(&color(32, 32)).unwrap();
    pool.release_all();
    assert!(matches!(pool.release(handle), Err(Error::InvalidResource(_))));
}

// ============================================================================
// FAILURES AND BUDGET
// ============================================================================

#[test]
fn test_device_failure_leaves_pool_unchanged() {
    let (device, mut pool) = setup();
    device.lock().unwrap().fail_next_allocations(1);

    let result = pool.acquire(&color(512, 512));
    assert_eq!(result.err(), Some(Error::OutOfMemory));
    assert_eq!(pool.memory_bytes(), 0);
    assert_eq!(pool.resource_count(), 0);

    assert!(pool.acquire(&color(512, 512)).is_ok());
}

#[test]
fn test_budget_refuses_allocation() {
    let shape = color(256, 256);
    let (device, mut pool) = setup_with_budget(shape.byte_footprint());

    let first = pool.acquire(&shape).unwrap();
    assert_eq!(pool.acquire(&shape).err(), Some(Error::OutOfMemory));
    assert_eq!(device.lock().unwrap().allocation_count(), 1);

    // Reuse does not allocate, so it stays within budget
    pool.release(first).unwrap();
    assert!(pool.acquire(&shape).is_ok());
}

// ============================================================================
// RESHAPE / DESTROY / BULK RELEASE
// ============================================================================

#[test]
fn test_reshape_replaces_resource() {
    let (device, mut pool) = setup();
    let small = color(640, 480);
    let large = color(1280, 720);

    let handle = pool.acquire(&small).unwrap();
    let handle = pool.reshape(handle, &large).unwrap();

    assert_eq!(*handle.shape(), large);
    assert_eq!(pool.memory_bytes(), large.byte_footprint());
    assert_eq!(pool.free_count(&small), 0);
    assert_eq!(device.lock().unwrap().live_allocations(), 1);
}

#[test]
fn test_reshape_to_invalid_shape_returns_resource() {
    let (_device, mut pool) = setup();
    let shape = color(640, 480);
    let handle = pool.acquire(&shape).unwrap();

    let result = pool.reshape(handle, &color(640, 0));
    assert!(matches!(result, Err(Error::InvalidShape(_))));
    assert_eq!(pool.free_count(&shape), 1);
    assert_eq!(pool.memory_bytes(), shape.byte_footprint());
}

#[test]
fn test_destroy_decrements_memory() {
    let (device, mut pool) = setup();
    let handle = pool.acquire(&color(128, 128)).unwrap();
    pool.destroy(handle).unwrap();
    assert_eq!(pool.memory_bytes(), 0);
    assert_eq!(device.lock().unwrap().live_allocations(), 0);
}

#[test]
fn test_release_unused_keeps_checked_out() {
    let (_device, mut pool) = setup();
    let shape = color(128, 128);
    let kept = pool.acquire(&shape).unwrap();
    let freed = pool.acquire(&shape).unwrap();
    pool.release(freed).unwrap();

    assert_eq!(pool.release_unused(), 1);
    assert_eq!(pool.memory_bytes(), shape.byte_footprint());
    assert_eq!(pool.free_count(&shape), 0);
    pool.release(kept).unwrap();
}

#[test]
fn test_release_all_resets_memory() {
    let (device, mut pool) = setup();
    let a = pool.acquire(&color(100, 100)).unwrap();
    let _b = pool.acquire(&color(200, 200)).unwrap();
    pool.release(a).unwrap();

    pool.release_all();

    assert_eq!(pool.memory_bytes(), 0);
    assert_eq!(pool.stats().resource_count, 0);
    assert_eq!(pool.stats().free_count, 0);
    // `_b` still owns its GPU resource until dropped
    drop(_b);
    assert_eq!(device.lock().unwrap().live_allocations(), 0);
}

// ============================================================================
// DECLARED RESOURCES
// ============================================================================

#[test]
fn test_declare_does_not_allocate() {
    let (device, mut pool) = setup();
    let key = pool.declare("history", &color(1920, 1080)).unwrap();
    assert!(matches!(pool.state(key), Some(AllocationState::Unallocated)));
    assert_eq!(device.lock().unwrap().allocation_count(), 0);
    assert_eq!(pool.declared("history"), Some(key));
}

#[test]
fn test_materialize_allocates_once() {
    let (device, mut pool) = setup();
    let key = pool.declare("history", &color(1920, 1080)).unwrap();

    let first = pool.materialize(key).unwrap();
    let second = pool.materialize(key).unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(device.lock().unwrap().allocation_count(), 1);
    assert!(pool.state(key).unwrap().is_allocated());
}

#[test]
fn test_redeclare_same_shape_keeps_allocation() {
    let (device, mut pool) = setup();
    let shape = color(800, 600);
    let key = pool.declare("history", &shape).unwrap();
    pool.materialize(key).unwrap();

    assert_eq!(pool.declare("history", &shape).unwrap(), key);
    assert!(pool.state(key).unwrap().is_allocated());
    pool.materialize(key).unwrap();
    assert_eq!(device.lock().unwrap().allocation_count(), 1);
}

#[test]
fn test_redeclare_changed_shape_reallocates() {
    let (device, mut pool) = setup();
    let small = color(800, 600);
    let large = color(1600, 1200);
    let key = pool.declare("history", &small).unwrap();
    let old = pool.materialize(key).unwrap();

    pool.declare("history", &large).unwrap();
    assert!(matches!(pool.state(key), Some(AllocationState::Dirty { .. })));
    assert_eq!(pool.declared_shape(key), Some(&large));

    let new = pool.materialize(key).unwrap();
    assert_ne!(old.id(), new.id());
    assert_eq!(pool.memory_bytes(), large.byte_footprint());
    assert_eq!(device.lock().unwrap().allocation_count(), 2);
}

#[test]
fn test_declared_params_reach_the_device() {
    let (_device, mut pool) = setup();
    let sampler = SamplerDesc { filter: FilterMode::Nearest, wrap: WrapMode::ClampToEdge, border_color: [0.0; 4] };
    let params = TextureParams::default().with_sampler(sampler).with_mipmap(true);
    let key = pool.declare_with("lut", &color(256, 256), &params).unwrap();

    let resource = pool.materialize(key).unwrap();
    let info = resource.as_texture().unwrap().info();
    assert_eq!(info.mip_levels, 9);
    assert_eq!(info.sampler, sampler);
    assert_eq!(pool.declared_params(key), Some(&params));
}

#[test]
fn test_redeclare_changed_params_reallocates() {
    let (device, mut pool) = setup();
    let shape = color(128, 128);
    let key = pool.declare("history", &shape).unwrap();
    let old = pool.materialize(key).unwrap();

    // Same shape, different sampling
    let border = SamplerDesc { wrap: WrapMode::ClampToBorder, border_color: [1.0, 1.0, 1.0, 1.0], ..SamplerDesc::default() };
    let params = TextureParams::default().with_sampler(border);
    pool.declare_with("history", &shape, &params).unwrap();
    assert!(matches!(pool.state(key), Some(AllocationState::Dirty { .. })));

    let new = pool.materialize(key).unwrap();
    assert_ne!(old.id(), new.id());
    assert_eq!(new.as_texture().unwrap().info().sampler, border);
    assert_eq!(pool.memory_bytes(), shape.byte_footprint());
    assert_eq!(device.lock().unwrap().allocation_count(), 2);

    // Identical redeclaration keeps it
    pool.declare_with("history", &shape, &params).unwrap();
    assert!(pool.state(key).unwrap().is_allocated());
}

#[test]
fn test_mark_dirty_forces_reallocation() {
    let (_device, mut pool) = setup();
    let shape = color(64, 64);
    let key = pool.declare("lut", &shape).unwrap();
    let old = pool.materialize(key).unwrap();

    pool.mark_dirty(key).unwrap();
    let new = pool.materialize(key).unwrap();

    assert_ne!(old.id(), new.id());
    assert_eq!(pool.memory_bytes(), shape.byte_footprint());
}

#[test]
fn test_mark_dirty_on_unallocated_is_noop() {
    let (_device, mut pool) = setup();
    let key = pool.declare("lut", &color(64, 64)).unwrap();
    pool.mark_dirty(key).unwrap();
    assert!(matches!(pool.state(key), Some(AllocationState::Unallocated)));
}

#[test]
fn test_release_declared() {
    let (_device, mut pool) = setup();
    let key = pool.declare("history", &color(64, 64)).unwrap();
    pool.materialize(key).unwrap();

    pool.release_declared("history").unwrap();
    assert!(matches!(pool.state(key), Some(AllocationState::Released)));
    assert_eq!(pool.memory_bytes(), 0);
    assert!(matches!(pool.materialize(key), Err(Error::InvalidResource(_))));

    // Declaring again revives the entry
    pool.declare("history", &color(64, 64)).unwrap();
    assert!(pool.materialize(key).is_ok());
}

#[test]
fn test_release_all_unallocates_declared() {
    let (device, mut pool) = setup();
    let key = pool.declare("history", &color(64, 64)).unwrap();
    pool.materialize(key).unwrap();

    pool.release_all();
    assert!(matches!(pool.state(key), Some(AllocationState::Unallocated)));
    assert!(pool.is_declared("history"));

    pool.materialize(key).unwrap();
    assert_eq!(device.lock().unwrap().allocation_count(), 2);
}

#[test]
fn test_materialize_failure_keeps_declaration() {
    let (device, mut pool) = setup();
    let key = pool.declare("history", &color(64, 64)).unwrap();
    device.lock().unwrap().fail_next_allocations(1);

    assert_eq!(pool.materialize(key).err(), Some(Error::OutOfMemory));
    assert!(matches!(pool.state(key), Some(AllocationState::Unallocated)));
    assert!(pool.materialize(key).is_ok());
}

#[test]
fn test_stats_snapshot() {
    let (_device, mut pool) = setup();
    let shape = color(16, 16);
    let a = pool.acquire(&shape).unwrap();
    let _b = pool.acquire(&shape).unwrap();
    pool.release(a).unwrap();

    let stats = pool.stats();
    assert_eq!(stats.resource_count, 2);
    assert_eq!(stats.free_count, 1);
    assert_eq!(stats.checked_out_count, 1);
    assert_eq!(stats.allocation_count, 2);
    assert_eq!(stats.memory_bytes, 2 * shape.byte_footprint());
}

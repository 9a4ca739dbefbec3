use glam::{Mat4, Vec3};
use slotmap::SlotMap;
use crate::camera::Frustum;
use crate::scene::{LinearSceneIndex, Sphere};
use super::*;

fn world_aabb() -> AABB {
    AABB::new(Vec3::splat(-100.0), Vec3::splat(100.0))
}

fn keys(n: usize) -> Vec<EntityKey> {
    let mut sm = SlotMap::<EntityKey, ()>::with_key();
    (0..n).map(|_| sm.insert(())).collect()
}

/// Create a frustum looking down -Z from origin, narrow FOV.
fn forward_frustum() -> Frustum {
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 50.0);
    let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y);
    Frustum::from_view_projection(&(proj * view))
}

fn sorted(mut v: Vec<EntityKey>) -> Vec<EntityKey> {
    v.sort();
    v
}

// ============================================================================
// INSERT / PLACEMENT
// ============================================================================

#[test]
fn test_new_has_only_root() {
    let octree = OctreeSceneIndex::new(world_aabb(), 4);
    assert_eq!(octree.node_count(), 1);
    assert_eq!(octree.root_bounds(), world_aabb());
    assert!(octree.is_empty());
}

#[test]
fn test_children_created_lazily() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 2);
    let k = keys(1);

    // Fits in octant 7 at depth 1 and octant 7's octant 0 at depth 2
    assert!(octree.insert(k[0], &AABB::new(Vec3::splat(10.0), Vec3::splat(20.0))));
    assert_eq!(octree.node_count(), 3);
    assert_eq!(octree.stored_depth(k[0]), Some(2));
}

#[test]
fn test_straddling_entity_stays_at_parent() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 4);
    let k = keys(1);

    assert!(octree.insert(k[0], &AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0))));
    assert_eq!(octree.stored_depth(k[0]), Some(0));
    assert_eq!(octree.node_count(), 1);
}

#[test]
fn test_box_touching_split_plane_descends() {
    let mut octree = OctreeSceneIndex::new(AABB::new(Vec3::splat(-8.0), Vec3::splat(8.0)), 3);
    let k = keys(2);

    // Max face on the root split plane, then on each child's upper face
    let touching = AABB::new(Vec3::splat(-1.0), Vec3::ZERO);
    assert!(octree.insert(k[0], &touching));
    assert_eq!(octree.stored_depth(k[0]), Some(3));

    // Min face on the split plane goes to the upper octant
    assert!(octree.insert(k[1], &AABB::new(Vec3::ZERO, Vec3::ONE)));
    assert_eq!(octree.stored_depth(k[1]), Some(3));

    let low = sorted(octree.query_iter(&AABB::new(Vec3::splat(-8.0), Vec3::splat(-0.5))).collect());
    assert_eq!(low, vec![k[0]]);
    let all = sorted(octree.query_iter(&touching).collect());
    assert_eq!(all, sorted(vec![k[0], k[1]]));
}

#[test]
fn test_max_depth_caps_descent() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 1);
    let k = keys(1);

    octree.insert(k[0], &AABB::new(Vec3::splat(50.0), Vec3::splat(51.0)));
    assert_eq!(octree.stored_depth(k[0]), Some(1));
}

#[test]
fn test_insert_outside_root_is_noop() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    let k = keys(1);

    assert!(!octree.insert(k[0], &AABB::new(Vec3::splat(-200.0), Vec3::splat(-150.0))));
    assert!(!octree.contains(k[0]));
    assert_eq!(octree.node_count(), 1);
}

#[test]
fn test_insert_partially_outside_is_rejected() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    let k = keys(1);

    assert!(!octree.insert(k[0], &AABB::new(Vec3::splat(90.0), Vec3::splat(110.0))));
    assert!(!octree.contains(k[0]));
}

#[test]
fn test_insert_invalid_bounds_is_ignored() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    let k = keys(1);

    assert!(!octree.insert(k[0], &AABB::new(Vec3::ONE, Vec3::ZERO)));
    assert!(octree.is_empty());
}

#[test]
fn test_reinsert_replaces_entry() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    let k = keys(1);
    octree.insert(k[0], &AABB::new(Vec3::splat(10.0), Vec3::splat(11.0)));
    octree.insert(k[0], &AABB::new(Vec3::splat(-11.0), Vec3::splat(-10.0)));

    assert_eq!(octree.len(), 1);
    assert_eq!(octree.bounds(k[0]), Some(AABB::new(Vec3::splat(-11.0), Vec3::splat(-10.0))));
}

// ============================================================================
// REMOVE / UPDATE
// ============================================================================

#[test]
fn test_insert_remove_round_trip() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    let k = keys(2);
    octree.insert(k[0], &AABB::new(Vec3::splat(1.0), Vec3::splat(2.0)));
    let volume = AABB::new(Vec3::splat(-50.0), Vec3::splat(50.0));
    let before: Vec<EntityKey> = octree.query_iter(&volume).collect();

    octree.insert(k[1], &AABB::new(Vec3::splat(3.0), Vec3::splat(4.0)));
    assert!(octree.remove(k[1]));
    assert!(!octree.remove(k[1]));

    let after: Vec<EntityKey> = octree.query_iter(&volume).collect();
    assert_eq!(before, after);
}

#[test]
fn test_update_moves_entity() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    let k = keys(1);
    octree.insert(k[0], &AABB::new(Vec3::splat(50.0), Vec3::splat(60.0)));

    assert!(octree.update(k[0], &AABB::new(Vec3::splat(-60.0), Vec3::splat(-50.0))));

    let low = AABB::new(Vec3::splat(-100.0), Vec3::splat(0.0));
    let high = AABB::new(Vec3::splat(1.0), Vec3::splat(100.0));
    assert_eq!(octree.query_iter(&low).collect::<Vec<_>>(), vec![k[0]]);
    assert_eq!(octree.query_iter(&high).count(), 0);
}

#[test]
fn test_update_outside_root_drops_entity() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    let k = keys(1);
    octree.insert(k[0], &AABB::new(Vec3::splat(1.0), Vec3::splat(2.0)));

    assert!(!octree.update(k[0], &AABB::new(Vec3::splat(500.0), Vec3::splat(501.0))));
    assert!(!octree.contains(k[0]));
}

#[test]
fn test_clear_removes_all() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    for (i, key) in keys(10).into_iter().enumerate() {
        let pos = i as f32 * 5.0 - 25.0;
        octree.insert(key, &AABB::new(Vec3::splat(pos), Vec3::splat(pos + 2.0)));
    }
    assert_eq!(octree.len(), 10);

    octree.clear();

    assert!(octree.is_empty());
    assert_eq!(octree.node_count(), 1);
    assert_eq!(octree.query_iter(&world_aabb()).count(), 0);
}

// ============================================================================
// QUERY
// ============================================================================

#[test]
fn test_frustum_query_culls_outside_entities() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    let k = keys(2);
    octree.insert(k[0], &AABB::new(Vec3::new(-1.0, -1.0, -10.0), Vec3::new(1.0, 1.0, -8.0)));
    octree.insert(k[1], &AABB::new(Vec3::new(-1.0, -1.0, 10.0), Vec3::new(1.0, 1.0, 12.0)));

    let frustum = forward_frustum();
    let mut results = Vec::new();
    octree.query_into(&frustum, &mut results);

    assert_eq!(results, vec![k[0]]);
}

#[test]
fn test_sphere_query() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 4);
    let k = keys(2);
    octree.insert(k[0], &AABB::new(Vec3::splat(9.0), Vec3::splat(10.0)));
    octree.insert(k[1], &AABB::new(Vec3::splat(30.0), Vec3::splat(31.0)));

    let sphere = Sphere::new(Vec3::splat(10.0), 5.0);
    assert_eq!(octree.query_iter(&sphere).collect::<Vec<_>>(), vec![k[0]]);
}

#[test]
fn test_no_duplicates_in_results() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    let k = keys(1);
    octree.insert(k[0], &AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0)));

    let count = octree.query_iter(&world_aabb()).filter(|&key| key == k[0]).count();
    assert_eq!(count, 1);
}

#[test]
fn test_invalid_volume_yields_empty_result() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    let k = keys(1);
    octree.insert(k[0], &AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0)));

    let nan = AABB::new(Vec3::splat(f32::NAN), Vec3::splat(1.0));
    assert_eq!(octree.query_iter(&nan).count(), 0);
    assert_eq!(octree.query_iter(&Sphere::new(Vec3::ZERO, -1.0)).count(), 0);
}

#[test]
fn test_query_is_rerunnable() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    for (i, key) in keys(5).into_iter().enumerate() {
        let p = i as f32 * 10.0;
        octree.insert(key, &AABB::new(Vec3::splat(p), Vec3::splat(p + 1.0)));
    }
    let volume = AABB::new(Vec3::ZERO, Vec3::splat(25.0));

    let first = sorted(octree.query_iter(&volume).collect());
    let second = sorted(octree.query_iter(&volume).collect());
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

/// Matches a brute-force scan on a deterministic pseudo-random scene.
#[test]
fn test_query_matches_linear_scan() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 5);
    let mut linear = LinearSceneIndex::new();
    let mut seed: u32 = 12345;
    let mut next = move || {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
        ((seed >> 8) % 1800) as f32 / 10.0 - 90.0
    };

    for key in keys(200) {
        let min = Vec3::new(next(), next(), next());
        let size = Vec3::new(next().abs() / 10.0, next().abs() / 10.0, next().abs() / 10.0);
        let aabb = AABB::new(min, (min + size).min(Vec3::splat(99.0)).max(min));
        assert!(octree.insert(key, &aabb));
        linear.insert(key, &aabb);
    }

    for _ in 0..20 {
        let center = Vec3::new(next(), next(), next());
        let volume = AABB::from_center_half_extents(center, Vec3::splat(next().abs() / 3.0 + 1.0));
        let sphere = Sphere::new(center, next().abs() / 3.0 + 1.0);

        assert_eq!(sorted(octree.query(&volume).collect()), sorted(linear.query(&volume).collect()));
        assert_eq!(sorted(octree.query(&sphere).collect()), sorted(linear.query(&sphere).collect()));
    }
}

/// 8 entities at depths 0–2; a query covering exactly one depth-1 octant
/// returns only what is stored at or below it, never root straddlers.
#[test]
fn test_octant_query_excludes_root_straddlers() {
    let mut octree = OctreeSceneIndex::new(AABB::new(Vec3::splat(-8.0), Vec3::splat(8.0)), 2);
    let k = keys(8);

    let placements = [
        // Root straddlers (cross a root split plane, away from octant 7)
        (AABB::new(Vec3::new(-5.0, -5.0, -1.0), Vec3::new(-3.0, -3.0, 1.0)), 0),
        (AABB::new(Vec3::new(-6.0, -1.0, -6.0), Vec3::new(-4.0, 1.0, -4.0)), 0),
        // Octant 7 ([0, 8]^3)
        (AABB::new(Vec3::splat(3.0), Vec3::splat(5.0)), 1),
        (AABB::new(Vec3::splat(1.0), Vec3::splat(2.0)), 2),
        (AABB::new(Vec3::splat(5.0), Vec3::splat(6.0)), 2),
        // Octant 0 ([-8, 0]^3)
        (AABB::new(Vec3::splat(-5.0), Vec3::splat(-3.0)), 1),
        (AABB::new(Vec3::splat(-7.0), Vec3::splat(-6.5)), 2),
        // Octant 1 (+x, -y, -z)
        (AABB::new(Vec3::new(3.0, -5.0, -5.0), Vec3::new(5.0, -3.0, -3.0)), 1),
    ];

    for (key, (aabb, depth)) in k.iter().zip(placements.iter()) {
        assert!(octree.insert(*key, aabb));
        assert_eq!(octree.stored_depth(*key), Some(*depth));
    }

    let octant = AABB::new(Vec3::ZERO, Vec3::splat(8.0));
    let results = sorted(octree.query_iter(&octant).collect());
    assert_eq!(results, sorted(vec![k[2], k[3], k[4]]));
}

// ============================================================================
// GROWTH
// ============================================================================

#[test]
fn test_grow_to_fit_doubles_toward_target() {
    let mut octree = OctreeSceneIndex::new(AABB::new(Vec3::ZERO, Vec3::splat(10.0)), 3);
    let k = keys(2);
    octree.insert(k[0], &AABB::new(Vec3::splat(1.0), Vec3::splat(2.0)));
    let depth_before = octree.stored_depth(k[0]).unwrap();

    let target = AABB::new(Vec3::splat(-5.0), Vec3::splat(-4.0));
    assert!(octree.grow_to_fit(&target));

    assert_eq!(octree.root_bounds(), AABB::new(Vec3::splat(-10.0), Vec3::splat(10.0)));
    assert_eq!(octree.max_depth(), 4);
    assert_eq!(octree.stored_depth(k[0]), Some(depth_before + 1));

    assert!(octree.insert(k[1], &target));
    assert_eq!(octree.query_iter(&AABB::new(Vec3::splat(-10.0), Vec3::ZERO)).collect::<Vec<_>>(), vec![k[1]]);
    assert_eq!(octree.query_iter(&AABB::new(Vec3::splat(0.5), Vec3::splat(10.0))).collect::<Vec<_>>(), vec![k[0]]);
}

#[test]
fn test_grow_to_fit_noop_when_contained() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    assert!(octree.grow_to_fit(&AABB::new(Vec3::ZERO, Vec3::ONE)));
    assert_eq!(octree.root_bounds(), world_aabb());
    assert_eq!(octree.max_depth(), 3);
}

#[test]
fn test_grow_to_fit_rejects_invalid_bounds() {
    let mut octree = OctreeSceneIndex::new(world_aabb(), 3);
    assert!(!octree.grow_to_fit(&AABB::new(Vec3::splat(f32::INFINITY), Vec3::splat(f32::INFINITY))));
}

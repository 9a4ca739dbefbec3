/// Query volumes accepted by the spatial index.
///
/// A volume classifies boxes three ways so hierarchical structures can
/// prune (`Outside`), accept whole subtrees (`Inside`) or keep testing
/// (`Partial`).

use glam::Vec3;
use serde::{Deserialize, Serialize};
use super::aabb::AABB;

/// Result of a 3-way volume/AABB classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// AABB is entirely outside the volume
    Outside,
    /// AABB is entirely inside the volume
    Inside,
    /// AABB partially overlaps the volume
    Partial,
}

/// A region of space the spatial index can be queried with.
///
/// Implementations may be conservative (report `Partial` where the box is
/// actually outside) but must never report `Outside` for an overlapping box.
pub trait QueryVolume: Send + Sync {
    /// Classify a box against this volume
    fn classify_aabb(&self, aabb: &AABB) -> Containment;

    /// Test if a box overlaps this volume
    fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.classify_aabb(aabb) != Containment::Outside
    }

    /// Malformed volumes (NaN, inverted, negative radius) match nothing
    fn is_valid(&self) -> bool;
}

impl QueryVolume for AABB {
    fn classify_aabb(&self, aabb: &AABB) -> Containment {
        if !self.intersects(aabb) {
            Containment::Outside
        } else if self.contains(aabb) {
            Containment::Inside
        } else {
            Containment::Partial
        }
    }

    fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.intersects(aabb)
    }

    fn is_valid(&self) -> bool {
        AABB::is_valid(self)
    }
}

/// Sphere volume (point and spot light influence)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn bounds(&self) -> AABB {
        AABB::from_sphere(self.center, self.radius)
    }
}

impl QueryVolume for Sphere {
    fn classify_aabb(&self, aabb: &AABB) -> Containment {
        let r2 = self.radius * self.radius;

        // Closest point of the box to the center
        let closest = self.center.clamp(aabb.min, aabb.max);
        if closest.distance_squared(self.center) > r2 {
            return Containment::Outside;
        }

        // Farthest corner decides full containment
        let far = Vec3::new(
            if self.center.x - aabb.min.x > aabb.max.x - self.center.x { aabb.min.x } else { aabb.max.x },
            if self.center.y - aabb.min.y > aabb.max.y - self.center.y { aabb.min.y } else { aabb.max.y },
            if self.center.z - aabb.min.z > aabb.max.z - self.center.z { aabb.min.z } else { aabb.max.z },
        );
        if far.distance_squared(self.center) <= r2 {
            Containment::Inside
        } else {
            Containment::Partial
        }
    }

    fn is_valid(&self) -> bool {
        self.center.is_finite() && self.radius.is_finite() && self.radius >= 0.0
    }
}

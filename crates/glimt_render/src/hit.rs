//! Nearest-intersection accumulator.

use glimt_core::MaterialId;
use glimt_math::Vec3;

/// Closest intersection found so far along a ray.
///
/// Intersection tests update the record only when their candidate `t` is
/// strictly below the current one, so sharing one record across a whole
/// collection of primitives yields the nearest hit without sorting.
#[derive(Debug, Clone, Copy)]
pub struct HitRecord {
    pub t: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub material: Option<MaterialId>,
}

impl HitRecord {
    /// Fresh record with `t` at infinity and no material.
    pub fn new() -> Self {
        Self {
            t: f32::INFINITY,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            material: None,
        }
    }

    /// True once any intersection has been recorded.
    pub fn is_hit(&self) -> bool {
        self.material.is_some()
    }

    /// Accept `t` if it beats the current closest and clears `tmin`.
    /// Returns whether the record was updated.
    pub fn consider(
        &mut self,
        t: f32,
        point: Vec3,
        normal: Vec3,
        material: MaterialId,
        tmin: f32,
    ) -> bool {
        if t >= tmin && t < self.t {
            self.t = t;
            self.point = point;
            self.normal = normal;
            self.material = Some(material);
            true
        } else {
            false
        }
    }
}

impl Default for HitRecord {
    fn default() -> Self {
        Self::new()
    }
}

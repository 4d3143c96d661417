//! Recursive Whitted-style ray transport.
//!
//! `trace_ray` finds the nearest hit (through the grid when the scene has
//! one), shades it with ambient plus per-light Phong terms, then recurses
//! into reflection and refraction rays. Recursion is bounded twice: by the
//! bounce limit and by a scalar path weight that shrinks with every
//! attenuation color picked up along the path.

use crate::hit::HitRecord;
use crate::scene::Scene;
use glimt_core::material::reflect;
use glimt_core::{Color, Illumination, RenderConfig};
use glimt_math::{Ray, Vec3};
use std::sync::atomic::{AtomicU64, Ordering};

/// Surface offset applied to secondary and shadow ray origins to avoid
/// immediate self-intersection.
pub const OFFSET_EPSILON: f32 = 1e-3;

/// Minimum t for secondary and shadow rays.
const RAY_TMIN: f32 = 1e-4;

/// Ray counters, accumulated across worker threads.
#[derive(Debug, Default)]
pub struct RenderStats {
    primary_rays: AtomicU64,
    secondary_rays: AtomicU64,
    shadow_rays: AtomicU64,
}

impl RenderStats {
    pub fn primary_rays(&self) -> u64 {
        self.primary_rays.load(Ordering::Relaxed)
    }

    pub fn secondary_rays(&self) -> u64 {
        self.secondary_rays.load(Ordering::Relaxed)
    }

    pub fn shadow_rays(&self) -> u64 {
        self.shadow_rays.load(Ordering::Relaxed)
    }
}

/// The transport core. Borrows the scene and config immutably, so one
/// tracer can be shared across render threads.
pub struct RayTracer<'a> {
    scene: &'a Scene,
    config: &'a RenderConfig,
    stats: RenderStats,
}

impl<'a> RayTracer<'a> {
    pub fn new(scene: &'a Scene, config: &'a RenderConfig) -> Self {
        Self {
            scene,
            config,
            stats: RenderStats::default(),
        }
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Trace a camera ray. `None` means the ray hit nothing and the
    /// caller should substitute the scene background.
    pub fn trace_ray(&self, ray: &Ray, tmin: f32) -> Option<Color> {
        self.trace_with_hit(ray, tmin).map(|(color, _)| color)
    }

    /// Like [`trace_ray`](Self::trace_ray) but also returns the primary
    /// hit, for depth and normal buffers.
    pub fn trace_with_hit(&self, ray: &Ray, tmin: f32) -> Option<(Color, HitRecord)> {
        self.stats.primary_rays.fetch_add(1, Ordering::Relaxed);
        let hit = self.nearest_hit(ray, tmin)?;
        let color = self.shade(ray, &hit, 0, 1.0);
        Some((color, hit))
    }

    fn nearest_hit(&self, ray: &Ray, tmin: f32) -> Option<HitRecord> {
        let mut hit = HitRecord::new();
        let found = match &self.scene.grid {
            Some(grid) => grid.intersect(&self.scene.primitives, ray, tmin, &mut hit),
            None => self
                .scene
                .primitives
                .intersect(self.scene.root, ray, tmin, &mut hit),
        };
        found.then_some(hit)
    }

    fn shade(&self, ray: &Ray, hit: &HitRecord, bounces: u32, weight: f32) -> Color {
        let Some(material_id) = hit.material else {
            return Color::ZERO;
        };
        let Some(material) = self.scene.materials.get(material_id) else {
            return Color::ZERO;
        };

        let backface = hit.normal.dot(ray.direction()) > 0.0;
        if backface && !self.config.shade_back {
            return Color::ZERO;
        }
        let normal = if backface { -hit.normal } else { hit.normal };

        let mut radiance = material.diffuse_color() * self.scene.ambient;
        for light in &self.scene.lights {
            let illum = light.illuminate(hit.point);
            if self.config.shadows && self.occluded(hit.point, hit.normal, &illum) {
                continue;
            }
            radiance += self.scene.materials.shade(
                material_id,
                ray,
                hit.point,
                normal,
                illum.dir_to_light,
                illum.color,
            );
        }

        if bounces >= self.config.max_bounces {
            return radiance;
        }

        let reflective = material.reflective_color();
        if reflective != Color::ZERO {
            let w = weight * reflective.max_element();
            if w > self.config.cutoff_weight {
                let direction = reflect(ray.direction(), normal).normalize();
                let secondary = Ray::new(hit.point + OFFSET_EPSILON * hit.normal, direction);
                self.stats.secondary_rays.fetch_add(1, Ordering::Relaxed);
                match self.nearest_hit(&secondary, RAY_TMIN) {
                    Some(next) => {
                        radiance += reflective * self.shade(&secondary, &next, bounces + 1, w);
                    }
                    // An escaped reflection sees the background
                    None => radiance += reflective * self.scene.background,
                }
            }
        }

        let transparent = material.transparent_color();
        if transparent != Color::ZERO {
            let w = weight * transparent.max_element();
            if w > self.config.cutoff_weight {
                let ior = material.index_of_refraction();
                // Entering or exiting decides which way eta flips
                let (eta, refract_normal) = if backface {
                    (ior, -hit.normal)
                } else {
                    (1.0 / ior, hit.normal)
                };
                let direction = refract(ray.direction(), refract_normal, eta);
                self.stats.secondary_rays.fetch_add(1, Ordering::Relaxed);
                // Total internal reflection yields a zero direction,
                // which traces as a miss and contributes nothing, as
                // does any escaped refraction ray.
                if direction != Vec3::ZERO {
                    let secondary = Ray::new(hit.point - OFFSET_EPSILON * hit.normal, direction);
                    if let Some(next) = self.nearest_hit(&secondary, RAY_TMIN) {
                        radiance += transparent * self.shade(&secondary, &next, bounces + 1, w);
                    }
                }
            }
        }

        radiance
    }

    fn occluded(&self, point: Vec3, normal: Vec3, illum: &Illumination) -> bool {
        self.stats.shadow_rays.fetch_add(1, Ordering::Relaxed);
        let shadow_ray = Ray::new(point + OFFSET_EPSILON * normal, illum.dir_to_light);
        match self.nearest_hit(&shadow_ray, RAY_TMIN) {
            Some(hit) => hit.t < illum.distance,
            None => false,
        }
    }
}

/// Snell refraction; returns the zero vector on total internal
/// reflection. `d` and `n` must be unit length, with `n` opposing `d`.
fn refract(d: Vec3, n: Vec3, eta: f32) -> Vec3 {
    let cos_i = -d.dot(n);
    let discriminant = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if discriminant < 0.0 {
        Vec3::ZERO
    } else {
        (eta * d + (eta * cos_i - discriminant.sqrt()) * n).normalize()
    }
}

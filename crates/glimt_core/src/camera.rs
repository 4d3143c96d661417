//! Cameras for ray generation.
//!
//! Both cameras map normalized film coordinates in `[0, 1]²` to world-space
//! rays; `(0, 0)` is the lower-left corner of the film. Pixel-to-film
//! mapping and aspect handling belong to the render driver.

use glimt_math::{Ray, Vec2, Vec3};

/// Camera. Perspective rays fan out from a single eye point; orthographic
/// rays are parallel and offset across a world-sized film plane.
#[derive(Debug, Clone)]
pub enum Camera {
    Perspective(PerspectiveCamera),
    Orthographic(OrthographicCamera),
}

impl Camera {
    /// Generate a world-space ray for the film point. The returned
    /// direction is unit length.
    pub fn generate_ray(&self, film: Vec2) -> Ray {
        match self {
            Camera::Perspective(c) => c.generate_ray(film),
            Camera::Orthographic(c) => c.generate_ray(film),
        }
    }
}

impl From<PerspectiveCamera> for Camera {
    fn from(c: PerspectiveCamera) -> Self {
        Camera::Perspective(c)
    }
}

impl From<OrthographicCamera> for Camera {
    fn from(c: OrthographicCamera) -> Self {
        Camera::Orthographic(c)
    }
}

/// Pinhole camera with a vertical field of view.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    center: Vec3,
    direction: Vec3,
    horizontal: Vec3,
    screen_up: Vec3,
    /// Half the film height at unit distance from the eye.
    half_extent: f32,
}

impl PerspectiveCamera {
    /// `vfov` is the vertical field of view in radians. `up` need not be
    /// orthogonal to `direction`; it is re-orthogonalized.
    pub fn new(center: Vec3, direction: Vec3, up: Vec3, vfov: f32) -> Self {
        let direction = direction.normalize();
        let horizontal = direction.cross(up).normalize();
        let screen_up = horizontal.cross(direction);
        Self {
            center,
            direction,
            horizontal,
            screen_up,
            half_extent: (vfov / 2.0).tan(),
        }
    }

    pub fn generate_ray(&self, film: Vec2) -> Ray {
        let u = (film.x - 0.5) * 2.0 * self.half_extent;
        let v = (film.y - 0.5) * 2.0 * self.half_extent;
        let direction = (self.direction + u * self.horizontal + v * self.screen_up).normalize();
        Ray::new(self.center, direction)
    }
}

/// Parallel-projection camera over a square film of world-space `size`.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    center: Vec3,
    direction: Vec3,
    horizontal: Vec3,
    screen_up: Vec3,
    size: f32,
}

impl OrthographicCamera {
    pub fn new(center: Vec3, direction: Vec3, up: Vec3, size: f32) -> Self {
        let direction = direction.normalize();
        let horizontal = direction.cross(up).normalize();
        let screen_up = horizontal.cross(direction);
        Self {
            center,
            direction,
            horizontal,
            screen_up,
            size,
        }
    }

    pub fn generate_ray(&self, film: Vec2) -> Ray {
        let origin = self.center
            + (film.x - 0.5) * self.size * self.horizontal
            + (film.y - 0.5) * self.size * self.screen_up;
        Ray::new(origin, self.direction)
    }
}

//! Geometry primitives and their flat store.
//!
//! Primitives live in a [`PrimitiveStore`] arena and reference each other
//! by [`PrimId`], so groups and transforms hold indices instead of owning
//! pointers. All intersection math lives here; the contract everywhere is
//! "update the shared [`HitRecord`] only when strictly closer and past
//! `tmin`".

use crate::error::SceneError;
use crate::hit::HitRecord;
use glimt_core::MaterialId;
use glimt_math::{Aabb, Mat4, Mat4Ext, Ray, Vec3};

/// Index of a primitive in a [`PrimitiveStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimId(usize);

impl PrimId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Scene geometry. A closed set dispatched by matching; `Group` and
/// `Transform` reference children through the store.
#[derive(Debug, Clone)]
pub enum Primitive {
    Sphere {
        center: Vec3,
        radius: f32,
        material: MaterialId,
    },
    /// Infinite plane `normal · p = offset`. Unbounded, so it has no
    /// bounding box and stays out of the acceleration grid.
    Plane {
        normal: Vec3,
        offset: f32,
        material: MaterialId,
    },
    /// Flat-shaded triangle; the face normal is fixed at construction.
    Triangle {
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        normal: Vec3,
        material: MaterialId,
    },
    /// Affine wrapper: rays are mapped into object space by `inverse`,
    /// normals come back through `normal_matrix` (inverse transpose).
    Transform {
        matrix: Mat4,
        inverse: Mat4,
        normal_matrix: Mat4,
        child: PrimId,
    },
    Group {
        children: Vec<PrimId>,
    },
}

impl Primitive {
    /// Build a sphere, rejecting non-positive or non-finite radii.
    pub fn sphere(center: Vec3, radius: f32, material: MaterialId) -> Result<Self, SceneError> {
        if !center.is_finite() {
            return Err(SceneError::NonFiniteGeometry);
        }
        if !(radius.is_finite() && radius > 0.0) {
            return Err(SceneError::InvalidSphereRadius(radius));
        }
        Ok(Primitive::Sphere {
            center,
            radius,
            material,
        })
    }

    /// Build a plane from a (not necessarily unit) normal and signed
    /// distance from the origin.
    pub fn plane(normal: Vec3, offset: f32, material: MaterialId) -> Result<Self, SceneError> {
        if !(normal.is_finite() && offset.is_finite()) {
            return Err(SceneError::NonFiniteGeometry);
        }
        if normal.length_squared() == 0.0 {
            return Err(SceneError::DegeneratePlaneNormal);
        }
        let scale = normal.length();
        Ok(Primitive::Plane {
            normal: normal / scale,
            offset: offset / scale,
            material,
        })
    }

    /// Build a triangle, rejecting zero-area faces.
    pub fn triangle(v0: Vec3, v1: Vec3, v2: Vec3, material: MaterialId) -> Result<Self, SceneError> {
        if !(v0.is_finite() && v1.is_finite() && v2.is_finite()) {
            return Err(SceneError::NonFiniteGeometry);
        }
        let cross = (v1 - v0).cross(v2 - v0);
        if cross.length_squared() == 0.0 {
            return Err(SceneError::DegenerateTriangle);
        }
        Ok(Primitive::Triangle {
            v0,
            v1,
            v2,
            normal: cross.normalize(),
            material,
        })
    }

    /// Build a transform wrapper, rejecting singular matrices.
    pub fn transform(matrix: Mat4, child: PrimId) -> Result<Self, SceneError> {
        if !matrix.is_finite() || matrix.determinant().abs() < f32::EPSILON {
            return Err(SceneError::SingularTransform);
        }
        let inverse = matrix.inverse();
        Ok(Primitive::Transform {
            matrix,
            inverse,
            normal_matrix: inverse.transpose(),
            child,
        })
    }

    pub fn group(children: Vec<PrimId>) -> Self {
        Primitive::Group { children }
    }
}

/// Arena of primitives. The scene owns exactly one store; everything else
/// refers into it by [`PrimId`].
#[derive(Debug, Default)]
pub struct PrimitiveStore {
    primitives: Vec<Primitive>,
}

impl PrimitiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primitive and return its id. Children referenced by the
    /// primitive must already be in the store.
    pub fn add(&mut self, primitive: Primitive) -> Result<PrimId, SceneError> {
        match &primitive {
            Primitive::Transform { child, .. } => self.check_id(*child)?,
            Primitive::Group { children } => {
                for child in children {
                    self.check_id(*child)?;
                }
            }
            _ => {}
        }
        let id = PrimId(self.primitives.len());
        self.primitives.push(primitive);
        Ok(id)
    }

    fn check_id(&self, id: PrimId) -> Result<(), SceneError> {
        if id.0 < self.primitives.len() {
            Ok(())
        } else {
            Err(SceneError::UnknownPrimitive(id.0))
        }
    }

    pub fn get(&self, id: PrimId) -> Option<&Primitive> {
        self.primitives.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Intersect a ray against the primitive, updating `hit` when a
    /// strictly closer intersection past `tmin` is found. The ray
    /// direction must be unit length.
    pub fn intersect(&self, id: PrimId, ray: &Ray, tmin: f32, hit: &mut HitRecord) -> bool {
        let Some(primitive) = self.get(id) else {
            return false;
        };

        match primitive {
            Primitive::Sphere {
                center,
                radius,
                material,
            } => intersect_sphere(ray, *center, *radius, *material, tmin, hit),

            Primitive::Plane {
                normal,
                offset,
                material,
            } => intersect_plane(ray, *normal, *offset, *material, tmin, hit),

            Primitive::Triangle {
                v0,
                v1,
                v2,
                normal,
                material,
            } => intersect_triangle(ray, *v0, *v1, *v2, *normal, *material, tmin, hit),

            Primitive::Transform {
                inverse,
                normal_matrix,
                child,
                ..
            } => self.intersect_transformed(ray, inverse, normal_matrix, *child, tmin, hit),

            Primitive::Group { children } => {
                let mut any = false;
                for child in children {
                    any |= self.intersect(*child, ray, tmin, hit);
                }
                any
            }
        }
    }

    pub(crate) fn intersect_transformed(
        &self,
        ray: &Ray,
        inverse: &Mat4,
        normal_matrix: &Mat4,
        child: PrimId,
        tmin: f32,
        hit: &mut HitRecord,
    ) -> bool {
        let origin_os = inverse.transform_point3(ray.origin());
        let dir_os = inverse.transform_vector3(ray.direction());

        // Re-normalizing the object-space direction rescales t, so tmin
        // and the returned t move by the same factor.
        let scale = dir_os.length();
        if scale == 0.0 {
            return false;
        }
        let ray_os = Ray::new(origin_os, dir_os / scale);

        let mut hit_os = HitRecord::new();
        if !self.intersect(child, &ray_os, tmin * scale, &mut hit_os) {
            return false;
        }

        let t_world = hit_os.t / scale;
        let normal_world = normal_matrix.transform_vector3(hit_os.normal).normalize();
        let material = match hit_os.material {
            Some(m) => m,
            None => return false,
        };
        hit.consider(t_world, ray.at(t_world), normal_world, material, tmin)
    }

    /// World-space bounding box, `None` for unbounded primitives (planes,
    /// and groups/transforms containing only planes).
    pub fn bounding_box(&self, id: PrimId) -> Option<Aabb> {
        let primitive = self.get(id)?;
        match primitive {
            Primitive::Sphere { center, radius, .. } => {
                let r = Vec3::splat(*radius);
                Some(Aabb::from_points(*center - r, *center + r))
            }
            Primitive::Plane { .. } => None,
            Primitive::Triangle { v0, v1, v2, .. } => {
                let min = v0.min(v1.min(*v2));
                let max = v0.max(v1.max(*v2));
                Some(Aabb::from_points(min, max))
            }
            Primitive::Transform { matrix, child, .. } => {
                let child_box = self.bounding_box(*child)?;
                Some(matrix.transform_aabb(&child_box))
            }
            Primitive::Group { children } => {
                let mut bounds: Option<Aabb> = None;
                for child in children {
                    if let Some(child_box) = self.bounding_box(*child) {
                        bounds = Some(match bounds {
                            Some(b) => Aabb::surrounding(&b, &child_box),
                            None => child_box,
                        });
                    }
                }
                bounds
            }
        }
    }
}

fn intersect_sphere(
    ray: &Ray,
    center: Vec3,
    radius: f32,
    material: MaterialId,
    tmin: f32,
    hit: &mut HitRecord,
) -> bool {
    let to_center = center - ray.origin();
    let tp = to_center.dot(ray.direction());

    let t = if to_center.length_squared() < radius * radius {
        // Origin inside: exactly one root lies ahead of the origin.
        let d2 = to_center.length_squared() - tp * tp;
        tp + (radius * radius - d2).sqrt()
    } else {
        // Origin outside: sphere must be ahead and the perpendicular
        // distance to the ray within the radius.
        if tp < 0.0 {
            return false;
        }
        let d2 = to_center.length_squared() - tp * tp;
        if d2 > radius * radius {
            return false;
        }
        tp - (radius * radius - d2).sqrt()
    };

    let point = ray.at(t);
    let normal = (point - center).normalize();
    hit.consider(t, point, normal, material, tmin)
}

fn intersect_plane(
    ray: &Ray,
    normal: Vec3,
    offset: f32,
    material: MaterialId,
    tmin: f32,
    hit: &mut HitRecord,
) -> bool {
    let denom = normal.dot(ray.direction());
    if denom.abs() < 1e-8 {
        return false;
    }
    let t = (offset - normal.dot(ray.origin())) / denom;
    if t < tmin {
        return false;
    }
    hit.consider(t, ray.at(t), normal, material, tmin)
}

#[allow(clippy::too_many_arguments)]
fn intersect_triangle(
    ray: &Ray,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    normal: Vec3,
    material: MaterialId,
    tmin: f32,
    hit: &mut HitRecord,
) -> bool {
    // Moller-Trumbore with inclusive boundaries, so rays grazing an edge
    // or vertex still count as hits.
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let pvec = ray.direction().cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < 1e-10 {
        return false;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin() - v0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.direction().dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    let t = edge2.dot(qvec) * inv_det;
    hit.consider(t, ray.at(t), normal, material, tmin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glimt_core::{Color, Material, MaterialStore, PhongMaterial};

    fn white_material() -> MaterialId {
        let mut store = MaterialStore::new();
        store.add(Material::Phong(PhongMaterial::new(
            Color::ONE,
            Color::ZERO,
            1.0,
        )))
    }

    fn sphere_at(store: &mut PrimitiveStore, center: Vec3, radius: f32) -> PrimId {
        let material = white_material();
        store
            .add(Primitive::sphere(center, radius, material).unwrap())
            .unwrap()
    }

    #[test]
    fn test_sphere_head_on_t_is_distance_minus_radius() {
        let mut store = PrimitiveStore::new();
        let id = sphere_at(&mut store, Vec3::new(0.0, 0.0, -5.0), 1.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let mut hit = HitRecord::new();
        assert!(store.intersect(id, &ray, 0.0, &mut hit));
        assert!((hit.t - 4.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_sphere_miss_when_closest_approach_exceeds_radius() {
        let mut store = PrimitiveStore::new();
        let id = sphere_at(&mut store, Vec3::new(0.0, 2.0, -5.0), 1.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let mut hit = HitRecord::new();
        assert!(!store.intersect(id, &ray, 0.0, &mut hit));
        assert!(!hit.is_hit());
    }

    #[test]
    fn test_sphere_origin_inside() {
        let mut store = PrimitiveStore::new();
        let id = sphere_at(&mut store, Vec3::ZERO, 2.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let mut hit = HitRecord::new();
        assert!(store.intersect(id, &ray, 0.0, &mut hit));
        assert!((hit.t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_behind_ray_is_missed() {
        let mut store = PrimitiveStore::new();
        let id = sphere_at(&mut store, Vec3::new(0.0, 0.0, 5.0), 1.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let mut hit = HitRecord::new();
        assert!(!store.intersect(id, &ray, 0.0, &mut hit));
    }

    #[test]
    fn test_plane_intersection() {
        let mut store = PrimitiveStore::new();
        let material = white_material();
        let id = store
            .add(Primitive::plane(Vec3::Y, -1.0, material).unwrap())
            .unwrap();

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0));
        let mut hit = HitRecord::new();
        assert!(store.intersect(id, &ray, 0.0, &mut hit));
        assert!((hit.t - 1.0).abs() < 1e-5);

        // Parallel ray misses
        let parallel = Ray::new(Vec3::ZERO, Vec3::X);
        let mut hit = HitRecord::new();
        assert!(!store.intersect(id, &parallel, 0.0, &mut hit));
    }

    #[test]
    fn test_triangle_boundary_inclusive() {
        let mut store = PrimitiveStore::new();
        let material = white_material();
        let id = store
            .add(
                Primitive::triangle(
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(1.0, 0.0, 0.0),
                    Vec3::new(0.0, 1.0, 0.0),
                    material,
                )
                .unwrap(),
            )
            .unwrap();

        // Straight down onto the v0 vertex (u = v = 0): inclusive
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let mut hit = HitRecord::new();
        assert!(store.intersect(id, &ray, 0.0, &mut hit));

        // On the hypotenuse (u + v = 1): inclusive
        let ray = Ray::new(Vec3::new(0.5, 0.5, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let mut hit = HitRecord::new();
        assert!(store.intersect(id, &ray, 0.0, &mut hit));

        // Just past the hypotenuse: rejected
        let ray = Ray::new(Vec3::new(0.501, 0.501, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let mut hit = HitRecord::new();
        assert!(!store.intersect(id, &ray, 0.0, &mut hit));
    }

    #[test]
    fn test_degenerate_triangle_rejected() {
        let material = white_material();
        let result = Primitive::triangle(Vec3::ZERO, Vec3::X, Vec3::X * 2.0, material);
        assert!(matches!(result, Err(SceneError::DegenerateTriangle)));
    }

    #[test]
    fn test_group_reports_nearest_hit() {
        let mut store = PrimitiveStore::new();
        let near = sphere_at(&mut store, Vec3::new(0.0, 0.0, -3.0), 1.0);
        let far = sphere_at(&mut store, Vec3::new(0.0, 0.0, -8.0), 1.0);
        let group = store
            .add(Primitive::group(vec![far, near]))
            .unwrap();

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let mut hit = HitRecord::new();
        assert!(store.intersect(group, &ray, 0.0, &mut hit));

        // Nearest wins: t for the closer sphere
        assert!((hit.t - 2.0).abs() < 1e-5);

        // And it matches the minimum over individual intersections
        let mut hit_near = HitRecord::new();
        store.intersect(near, &ray, 0.0, &mut hit_near);
        assert_eq!(hit.t, hit_near.t);
    }

    #[test]
    fn test_transform_round_trip_matches_scaled_sphere() {
        let mut store = PrimitiveStore::new();

        // Sphere of radius 3 at (1, 0, -10), built directly
        let direct = sphere_at(&mut store, Vec3::new(1.0, 0.0, -10.0), 3.0);

        // Unit sphere at origin, wrapped in scale(3) + translate
        let unit = sphere_at(&mut store, Vec3::ZERO, 1.0);
        let matrix = Mat4::from_translation(Vec3::new(1.0, 0.0, -10.0))
            * Mat4::from_scale(Vec3::splat(3.0));
        let wrapped = store
            .add(Primitive::transform(matrix, unit).unwrap())
            .unwrap();

        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));

        let mut hit_direct = HitRecord::new();
        assert!(store.intersect(direct, &ray, 0.0, &mut hit_direct));

        let mut hit_wrapped = HitRecord::new();
        assert!(store.intersect(wrapped, &ray, 0.0, &mut hit_wrapped));

        assert!((hit_direct.t - hit_wrapped.t).abs() < 1e-4);
        assert!((hit_direct.normal - hit_wrapped.normal).length() < 1e-4);
    }

    #[test]
    fn test_transform_nonuniform_scale_normal() {
        let mut store = PrimitiveStore::new();
        let unit = sphere_at(&mut store, Vec3::ZERO, 1.0);
        let matrix = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let squashed = store
            .add(Primitive::transform(matrix, unit).unwrap())
            .unwrap();

        // Hit the +X pole of the ellipsoid: the normal there is still +X
        // and must come back unit length through the inverse transpose.
        let ray = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        let mut hit = HitRecord::new();
        assert!(store.intersect(squashed, &ray, 0.0, &mut hit));
        assert!((hit.t - 3.0).abs() < 1e-4);
        assert!((hit.normal - Vec3::X).length() < 1e-4);
        assert!((hit.normal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_singular_transform_rejected() {
        let mut store = PrimitiveStore::new();
        let unit = sphere_at(&mut store, Vec3::ZERO, 1.0);
        let flat = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(matches!(
            Primitive::transform(flat, unit),
            Err(SceneError::SingularTransform)
        ));
    }

    #[test]
    fn test_group_bounding_box_unions_children() {
        let mut store = PrimitiveStore::new();
        let a = sphere_at(&mut store, Vec3::new(-5.0, 0.0, 0.0), 1.0);
        let b = sphere_at(&mut store, Vec3::new(5.0, 0.0, 0.0), 1.0);
        let group = store.add(Primitive::group(vec![a, b])).unwrap();

        let bounds = store.bounding_box(group).unwrap();
        assert!((bounds.min().x - -6.0).abs() < 1e-5);
        assert!((bounds.max().x - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_plane_has_no_bounding_box() {
        let mut store = PrimitiveStore::new();
        let material = white_material();
        let plane = store
            .add(Primitive::plane(Vec3::Y, 0.0, material).unwrap())
            .unwrap();
        assert!(store.bounding_box(plane).is_none());
    }
}

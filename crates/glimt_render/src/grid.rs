//! Uniform voxel grid acceleration structure.
//!
//! The grid partitions the scene bounding box into an `nx * ny * nz`
//! lattice. Each bounded primitive is inserted into every voxel its
//! (possibly transformed) volume conservatively overlaps; rays then walk
//! only the voxels they actually pass through via 3D-DDA instead of
//! testing every primitive. Unbounded primitives (planes) are kept in a
//! side list and tested on every ray.
//!
//! The grid never owns geometry; voxels hold `PrimId` references into the
//! scene's primitive store plus the transform context each primitive was
//! inserted under.

use crate::hit::HitRecord;
use crate::primitive::{PrimId, Primitive, PrimitiveStore};
use glimt_core::{Color, GridResolution};
use glimt_math::{Aabb, Interval, Mat4, Mat4Ext, Ray, Vec3};
use std::sync::atomic::{AtomicU64, Ordering};

/// Face indexing convention: 0 = -X, 1 = +Z, 2 = +X, 3 = -Z, 4 = +Y,
/// 5 = -Y. Outward normals in that order.
pub const FACE_NORMALS: [Vec3; 6] = [
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(0.0, 0.0, -1.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(0.0, -1.0, 0.0),
];

/// Heat ramp for the cell-occupancy visualization, cold to hot.
pub const OCCUPANCY_RAMP: [Vec3; 17] = [
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(0.8, 0.9, 1.0),
    Vec3::new(0.6, 0.8, 1.0),
    Vec3::new(0.4, 0.7, 1.0),
    Vec3::new(0.2, 0.6, 1.0),
    Vec3::new(0.0, 0.6, 0.9),
    Vec3::new(0.0, 0.7, 0.6),
    Vec3::new(0.0, 0.8, 0.3),
    Vec3::new(0.2, 0.9, 0.0),
    Vec3::new(0.5, 1.0, 0.0),
    Vec3::new(0.8, 1.0, 0.0),
    Vec3::new(1.0, 0.9, 0.0),
    Vec3::new(1.0, 0.7, 0.0),
    Vec3::new(1.0, 0.5, 0.0),
    Vec3::new(1.0, 0.3, 0.0),
    Vec3::new(1.0, 0.1, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
];

/// Transform context a primitive was inserted under, with the matrices
/// intersection needs precomputed.
#[derive(Debug, Clone)]
pub struct ItemTransform {
    pub matrix: Mat4,
    pub inverse: Mat4,
    pub normal_matrix: Mat4,
}

impl ItemTransform {
    fn new(matrix: Mat4) -> Self {
        let inverse = matrix.inverse();
        Self {
            matrix,
            inverse,
            normal_matrix: inverse.transpose(),
        }
    }
}

/// One entry of a voxel's membership list.
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub prim: PrimId,
    pub transform: Option<ItemTransform>,
}

/// One cell of the lattice.
#[derive(Debug, Clone, Default)]
pub struct Voxel {
    pub opaque: bool,
    pub items: Vec<DrawItem>,
}

/// Debug hit from the grid visualization traversal: the entry face of the
/// first occupied voxel plus a color keyed by how many items it holds.
#[derive(Debug, Clone, Copy)]
pub struct GridVisHit {
    pub t: f32,
    pub normal: Vec3,
    pub color: Color,
    pub cell: [usize; 3],
}

/// Per-axis DDA marching state.
#[derive(Debug, Clone)]
struct MarchingInfo {
    index: [i64; 3],
    sign: [i64; 3],
    t_next: [f32; 3],
    d_t: [f32; 3],
    /// Parametric t at which the current cell was entered.
    t_current: f32,
    /// Face the current cell was entered through.
    face: usize,
}

#[derive(Debug)]
pub struct Grid {
    bounds: Aabb,
    res: GridResolution,
    voxel_size: Vec3,
    voxels: Vec<Voxel>,
    /// Unbounded primitives, tested against every ray.
    unbounded: Vec<DrawItem>,
    /// Cells visited across all traversals, for render diagnostics.
    cells_visited: AtomicU64,
}

impl Grid {
    pub fn new(bounds: Aabb, res: GridResolution) -> Self {
        let size = bounds.max() - bounds.min();
        let voxel_size = Vec3::new(
            size.x / res.nx as f32,
            size.y / res.ny as f32,
            size.z / res.nz as f32,
        );
        Self {
            bounds,
            res,
            voxel_size,
            voxels: vec![Voxel::default(); res.voxel_count()],
            unbounded: Vec::new(),
            cells_visited: AtomicU64::new(0),
        }
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn resolution(&self) -> GridResolution {
        self.res
    }

    pub fn voxel(&self, i: usize, j: usize, k: usize) -> &Voxel {
        &self.voxels[self.flat(i, j, k)]
    }

    /// Number of occupied voxels, for build diagnostics.
    pub fn occupied_count(&self) -> usize {
        self.voxels.iter().filter(|v| v.opaque).count()
    }

    /// Total cells visited by [`intersect`](Self::intersect) so far.
    pub fn cells_visited(&self) -> u64 {
        self.cells_visited.load(Ordering::Relaxed)
    }

    fn flat(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.res.ny + j) * self.res.nx + i
    }

    /// World-space box of one cell.
    fn cell_bounds(&self, i: usize, j: usize, k: usize) -> Aabb {
        let min = self.bounds.min()
            + Vec3::new(
                i as f32 * self.voxel_size.x,
                j as f32 * self.voxel_size.y,
                k as f32 * self.voxel_size.z,
            );
        Aabb::from_points(min, min + self.voxel_size)
    }

    fn cell_of(&self, p: Vec3) -> [i64; 3] {
        let rel = (p - self.bounds.min()) / self.voxel_size;
        [
            (rel.x.floor() as i64).clamp(0, self.res.nx as i64 - 1),
            (rel.y.floor() as i64).clamp(0, self.res.ny as i64 - 1),
            (rel.z.floor() as i64).clamp(0, self.res.nz as i64 - 1),
        ]
    }

    /// Voxel index range overlapped by a world-space box, clamped to the
    /// lattice. `None` when the box lies entirely outside.
    fn voxel_range(&self, aabb: &Aabb) -> Option<([usize; 3], [usize; 3])> {
        let gmin = self.bounds.min();
        let gmax = self.bounds.max();
        if aabb.min().x > gmax.x
            || aabb.min().y > gmax.y
            || aabb.min().z > gmax.z
            || aabb.max().x < gmin.x
            || aabb.max().y < gmin.y
            || aabb.max().z < gmin.z
        {
            return None;
        }
        let lo = self.cell_of(aabb.min());
        let hi = self.cell_of(aabb.max());
        Some((
            [lo[0] as usize, lo[1] as usize, lo[2] as usize],
            [hi[0] as usize, hi[1] as usize, hi[2] as usize],
        ))
    }

    /// Insert a primitive (and, recursively, its subtree) under an
    /// optional transform context.
    pub fn insert(&mut self, store: &PrimitiveStore, id: PrimId, transform: Option<Mat4>) {
        let Some(primitive) = store.get(id) else {
            return;
        };

        match primitive {
            Primitive::Group { children } => {
                for child in children.clone() {
                    self.insert(store, child, transform);
                }
            }

            Primitive::Transform { matrix, child, .. } => {
                let composed = match transform {
                    Some(outer) => outer * *matrix,
                    None => *matrix,
                };
                self.insert(store, *child, Some(composed));
            }

            Primitive::Plane { .. } => {
                self.unbounded.push(DrawItem {
                    prim: id,
                    transform: transform.map(ItemTransform::new),
                });
            }

            Primitive::Sphere { center, radius, .. } => match transform {
                None => self.insert_sphere(id, *center, *radius),
                Some(matrix) => {
                    // Transformed spheres fall back to their transformed
                    // bounding box, which is conservative.
                    let r = Vec3::splat(*radius);
                    let local = Aabb::from_points(*center - r, *center + r);
                    let world = matrix.transform_aabb(&local);
                    self.insert_by_bounds(id, &world, Some(matrix));
                }
            },

            Primitive::Triangle { v0, v1, v2, .. } => {
                let (w0, w1, w2) = match transform {
                    Some(matrix) => (
                        matrix.transform_point3(*v0),
                        matrix.transform_point3(*v1),
                        matrix.transform_point3(*v2),
                    ),
                    None => (*v0, *v1, *v2),
                };
                self.insert_triangle(id, w0, w1, w2, transform);
            }
        }
    }

    /// Untransformed sphere: exact closest-point distance test per voxel.
    fn insert_sphere(&mut self, id: PrimId, center: Vec3, radius: f32) {
        let r = Vec3::splat(radius);
        let bbox = Aabb::from_points(center - r, center + r);
        let Some((lo, hi)) = self.voxel_range(&bbox) else {
            return;
        };

        for k in lo[2]..=hi[2] {
            for j in lo[1]..=hi[1] {
                for i in lo[0]..=hi[0] {
                    let cell = self.cell_bounds(i, j, k);
                    let closest = center.clamp(cell.min(), cell.max());
                    if (closest - center).length_squared() <= radius * radius {
                        self.push_item(i, j, k, id, None);
                    }
                }
            }
        }
    }

    /// Triangle in world space: separating-axis test per voxel.
    fn insert_triangle(
        &mut self,
        id: PrimId,
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        transform: Option<Mat4>,
    ) {
        let min = v0.min(v1.min(v2));
        let max = v0.max(v1.max(v2));
        let bbox = Aabb::from_points(min, max);
        let Some((lo, hi)) = self.voxel_range(&bbox) else {
            return;
        };

        for k in lo[2]..=hi[2] {
            for j in lo[1]..=hi[1] {
                for i in lo[0]..=hi[0] {
                    let cell = self.cell_bounds(i, j, k);
                    let center = cell.centroid();
                    let half = (cell.max() - cell.min()) * 0.5;
                    if triangle_overlaps_box(v0, v1, v2, center, half) {
                        self.push_item(i, j, k, id, transform);
                    }
                }
            }
        }
    }

    fn insert_by_bounds(&mut self, id: PrimId, world: &Aabb, transform: Option<Mat4>) {
        let Some((lo, hi)) = self.voxel_range(world) else {
            return;
        };
        for k in lo[2]..=hi[2] {
            for j in lo[1]..=hi[1] {
                for i in lo[0]..=hi[0] {
                    self.push_item(i, j, k, id, transform);
                }
            }
        }
    }

    fn push_item(&mut self, i: usize, j: usize, k: usize, id: PrimId, transform: Option<Mat4>) {
        let idx = self.flat(i, j, k);
        let voxel = &mut self.voxels[idx];
        voxel.opaque = true;
        voxel.items.push(DrawItem {
            prim: id,
            transform: transform.map(ItemTransform::new),
        });
    }

    /// Set up DDA marching for a ray, or `None` if it misses the box.
    fn initialize_march(&self, ray: &Ray, tmin: f32) -> Option<MarchingInfo> {
        let origin = ray.at(tmin);
        let dir = ray.direction();
        if dir == Vec3::ZERO {
            return None;
        }

        let (start_t, index, face) = if self.bounds.contains(origin) {
            let face = entry_face_for_direction(dir);
            (tmin, self.cell_of(origin), face)
        } else if !self
            .bounds
            .hit(ray, Interval::new(tmin, f32::INFINITY))
        {
            return None;
        } else {
            // Slab entry: among the three candidate entry planes, take
            // the nearest one whose entry point lies within the box on
            // the other two axes.
            let (t_enter, face) = self.nearest_entry(ray, tmin)?;
            let p = ray.at(t_enter);
            (t_enter, self.cell_of(p), face)
        };

        let mut sign = [0i64; 3];
        let mut d_t = [f32::INFINITY; 3];
        let mut t_next = [f32::INFINITY; 3];
        let dirs = [dir.x, dir.y, dir.z];
        let mins = [
            self.bounds.min().x,
            self.bounds.min().y,
            self.bounds.min().z,
        ];
        let sizes = [self.voxel_size.x, self.voxel_size.y, self.voxel_size.z];
        let origins = [ray.origin().x, ray.origin().y, ray.origin().z];

        for axis in 0..3 {
            if dirs[axis] > 0.0 {
                sign[axis] = 1;
                d_t[axis] = sizes[axis] / dirs[axis];
                let boundary = mins[axis] + (index[axis] + 1) as f32 * sizes[axis];
                t_next[axis] = (boundary - origins[axis]) / dirs[axis];
            } else if dirs[axis] < 0.0 {
                sign[axis] = -1;
                d_t[axis] = -sizes[axis] / dirs[axis];
                let boundary = mins[axis] + index[axis] as f32 * sizes[axis];
                t_next[axis] = (boundary - origins[axis]) / dirs[axis];
            }
            // Zero direction component: that axis never advances.
            if t_next[axis] < start_t {
                t_next[axis] += d_t[axis];
            }
        }

        Some(MarchingInfo {
            index,
            sign,
            t_next,
            d_t,
            t_current: start_t,
            face,
        })
    }

    fn nearest_entry(&self, ray: &Ray, tmin: f32) -> Option<(f32, usize)> {
        let dir = ray.direction();
        let origin = ray.origin();
        let dirs = [dir.x, dir.y, dir.z];
        let origins = [origin.x, origin.y, origin.z];
        let mins = [
            self.bounds.min().x,
            self.bounds.min().y,
            self.bounds.min().z,
        ];
        let maxs = [
            self.bounds.max().x,
            self.bounds.max().y,
            self.bounds.max().z,
        ];

        let mut best: Option<(f32, usize)> = None;
        for axis in 0..3 {
            if dirs[axis] == 0.0 {
                continue;
            }
            let plane = if dirs[axis] > 0.0 {
                mins[axis]
            } else {
                maxs[axis]
            };
            let t = (plane - origins[axis]) / dirs[axis];
            if t < tmin {
                continue;
            }
            let p = ray.at(t);
            let ps = [p.x, p.y, p.z];
            let inside_others = (0..3).filter(|a| *a != axis).all(|a| {
                // Small tolerance so corner-grazing entries still count.
                ps[a] >= mins[a] - 1e-5 && ps[a] <= maxs[a] + 1e-5
            });
            if !inside_others {
                continue;
            }
            let face = face_for(axis, dirs[axis] > 0.0);
            if best.map_or(true, |(bt, _)| t < bt) {
                best = Some((t, face));
            }
        }
        best
    }

    fn in_range(&self, index: [i64; 3]) -> bool {
        index[0] >= 0
            && index[1] >= 0
            && index[2] >= 0
            && index[0] < self.res.nx as i64
            && index[1] < self.res.ny as i64
            && index[2] < self.res.nz as i64
    }

    /// Intersect a ray against the grid contents, updating `hit` with the
    /// nearest intersection past `tmin`. Unbounded primitives are tested
    /// regardless of whether the ray touches the lattice.
    pub fn intersect(
        &self,
        store: &PrimitiveStore,
        ray: &Ray,
        tmin: f32,
        hit: &mut HitRecord,
    ) -> bool {
        let mut any = false;

        for item in &self.unbounded {
            any |= intersect_item(store, item, ray, tmin, hit);
        }

        let Some(mut march) = self.initialize_march(ray, tmin) else {
            return any;
        };

        // Index going out of range on any axis means the ray has left the
        // lattice; this is the normal termination, not an error.
        while self.in_range(march.index) {
            self.cells_visited.fetch_add(1, Ordering::Relaxed);
            let voxel = self.voxel(
                march.index[0] as usize,
                march.index[1] as usize,
                march.index[2] as usize,
            );
            if voxel.opaque {
                for item in &voxel.items {
                    any |= intersect_item(store, item, ray, tmin, hit);
                }
            }

            // Nothing in a farther voxel can beat a hit inside this one.
            let t_exit = march.t_next[0].min(march.t_next[1]).min(march.t_next[2]);
            if hit.is_hit() && hit.t < t_exit {
                return true;
            }

            step(&mut march);
        }

        any
    }

    /// Debug traversal: march until the first occupied voxel and report
    /// its entry face and an occupancy-keyed color. Does not intersect
    /// any geometry.
    pub fn visualize(&self, ray: &Ray, tmin: f32) -> Option<GridVisHit> {
        let mut march = self.initialize_march(ray, tmin)?;

        while self.in_range(march.index) {
            let cell = [
                march.index[0] as usize,
                march.index[1] as usize,
                march.index[2] as usize,
            ];
            let voxel = self.voxel(cell[0], cell[1], cell[2]);
            if voxel.opaque {
                let shade = voxel.items.len().min(OCCUPANCY_RAMP.len()) - 1;
                return Some(GridVisHit {
                    t: march.t_current,
                    normal: FACE_NORMALS[march.face],
                    color: OCCUPANCY_RAMP[shade],
                    cell,
                });
            }
            step(&mut march);
        }

        None
    }

    /// Every cell the ray traverses, in order, with the face it entered
    /// through. Used for wireframe-style grid inspection.
    pub fn traversed_cells(&self, ray: &Ray, tmin: f32) -> Vec<([usize; 3], usize)> {
        let mut cells = Vec::new();
        let Some(mut march) = self.initialize_march(ray, tmin) else {
            return cells;
        };
        while self.in_range(march.index) {
            cells.push((
                [
                    march.index[0] as usize,
                    march.index[1] as usize,
                    march.index[2] as usize,
                ],
                march.face,
            ));
            step(&mut march);
        }
        cells
    }
}

/// Advance the march one cell: step the axis with the nearest pending
/// boundary crossing.
fn step(march: &mut MarchingInfo) {
    let mut axis = 0;
    for a in 1..3 {
        if march.t_next[a] < march.t_next[axis] {
            axis = a;
        }
    }
    march.t_current = march.t_next[axis];
    march.index[axis] += march.sign[axis];
    march.t_next[axis] += march.d_t[axis];
    march.face = face_for(axis, march.sign[axis] > 0);
}

/// Face entered when moving along `axis` in the given direction.
fn face_for(axis: usize, positive: bool) -> usize {
    match (axis, positive) {
        (0, true) => 0,
        (0, false) => 2,
        (1, true) => 5,
        (1, false) => 4,
        (2, true) => 3,
        _ => 1,
    }
}

/// Face to report for a march starting inside the box: the one the ray
/// would have entered through on its dominant axis.
fn entry_face_for_direction(dir: Vec3) -> usize {
    let ax = dir.x.abs();
    let ay = dir.y.abs();
    let az = dir.z.abs();
    if ax >= ay && ax >= az {
        face_for(0, dir.x > 0.0)
    } else if ay >= az {
        face_for(1, dir.y > 0.0)
    } else {
        face_for(2, dir.z > 0.0)
    }
}

fn intersect_item(
    store: &PrimitiveStore,
    item: &DrawItem,
    ray: &Ray,
    tmin: f32,
    hit: &mut HitRecord,
) -> bool {
    match &item.transform {
        Some(t) => {
            store.intersect_transformed(ray, &t.inverse, &t.normal_matrix, item.prim, tmin, hit)
        }
        None => store.intersect(item.prim, ray, tmin, hit),
    }
}

/// Triangle/box overlap via the separating axis theorem, with the box
/// given as center + half extents. Thirteen axes: the three box axes,
/// the triangle plane normal, and the nine edge cross products.
fn triangle_overlaps_box(v0: Vec3, v1: Vec3, v2: Vec3, center: Vec3, half: Vec3) -> bool {
    let p0 = v0 - center;
    let p1 = v1 - center;
    let p2 = v2 - center;

    let e0 = p1 - p0;
    let e1 = p2 - p1;
    let e2 = p0 - p2;

    // Box axes
    for axis in 0..3 {
        let (min, max) = match axis {
            0 => (p0.x.min(p1.x).min(p2.x), p0.x.max(p1.x).max(p2.x)),
            1 => (p0.y.min(p1.y).min(p2.y), p0.y.max(p1.y).max(p2.y)),
            _ => (p0.z.min(p1.z).min(p2.z), p0.z.max(p1.z).max(p2.z)),
        };
        let h = match axis {
            0 => half.x,
            1 => half.y,
            _ => half.z,
        };
        if min > h || max < -h {
            return false;
        }
    }

    // Triangle plane
    let normal = e0.cross(-e2);
    let r = half.x * normal.x.abs() + half.y * normal.y.abs() + half.z * normal.z.abs();
    let d = normal.dot(p0);
    if d.abs() > r {
        return false;
    }

    // Nine edge cross products
    let edges = [e0, e1, e2];
    let units = [Vec3::X, Vec3::Y, Vec3::Z];
    for edge in &edges {
        for unit in &units {
            let axis = unit.cross(*edge);
            let r = half.x * axis.x.abs() + half.y * axis.y.abs() + half.z * axis.z.abs();
            let q0 = axis.dot(p0);
            let q1 = axis.dot(p1);
            let q2 = axis.dot(p2);
            let min = q0.min(q1).min(q2);
            let max = q0.max(q1).max(q2);
            if min > r || max < -r {
                return false;
            }
        }
    }

    true
}

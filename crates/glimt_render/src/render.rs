//! Parallel render driver.
//!
//! Divides the image into buckets, traces every pixel through the shared
//! [`RayTracer`], and assembles a [`Frame`] holding color, depth and
//! normal buffers. Misses are substituted with the scene background in
//! the color buffer.

use crate::bucket::{generate_buckets, Bucket, DEFAULT_BUCKET_SIZE};
use crate::scene::Scene;
use crate::tracer::RayTracer;
use glimt_core::{Color, RenderConfig};
use glimt_math::{Vec2, Vec3};
use rayon::prelude::*;
use std::time::Instant;

/// One traced pixel: shaded color, primary-hit distance (infinite on a
/// miss) and the primary-hit normal as absolute values.
#[derive(Debug, Clone, Copy)]
pub struct PixelSample {
    pub color: Color,
    pub depth: f32,
    pub normal: Vec3,
}

/// Output buffers of a render, row-major with `(0, 0)` at the top left.
pub struct Frame {
    pub width: u32,
    pub height: u32,
    color: Vec<Color>,
    depth: Vec<f32>,
    normal: Vec<Vec3>,
}

impl Frame {
    fn new(width: u32, height: u32, background: Color) -> Self {
        let n = (width * height) as usize;
        Self {
            width,
            height,
            color: vec![background; n],
            depth: vec![f32::INFINITY; n],
            normal: vec![Vec3::ZERO; n],
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    pub fn color_at(&self, x: u32, y: u32) -> Color {
        self.color[self.offset(x, y)]
    }

    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.depth[self.offset(x, y)]
    }

    pub fn normal_at(&self, x: u32, y: u32) -> Vec3 {
        self.normal[self.offset(x, y)]
    }

    fn put(&mut self, x: u32, y: u32, sample: PixelSample) {
        let i = self.offset(x, y);
        self.color[i] = sample.color;
        self.depth[i] = sample.depth;
        self.normal[i] = sample.normal;
    }

    /// Map the depth buffer to grayscale: `near` and closer is white,
    /// `far` and beyond (including misses) is black.
    pub fn depth_grayscale(&self, near: f32, far: f32) -> Vec<f32> {
        self.depth
            .iter()
            .map(|t| {
                if t.is_finite() {
                    ((far - t) / (far - near)).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// Render the scene into a frame.
pub fn render(scene: &Scene, config: &RenderConfig, width: u32, height: u32) -> Frame {
    let start = Instant::now();
    let tracer = RayTracer::new(scene, config);
    let buckets = generate_buckets(width, height, DEFAULT_BUCKET_SIZE);

    log::info!(
        "rendering {}x{} in {} buckets, grid {}",
        width,
        height,
        buckets.len(),
        if scene.grid.is_some() { "on" } else { "off" }
    );

    let results: Vec<(Bucket, Vec<PixelSample>)> = buckets
        .par_iter()
        .map(|bucket| (*bucket, render_bucket(bucket, &tracer, scene, width, height)))
        .collect();

    let mut frame = Frame::new(width, height, scene.background);
    for (bucket, samples) in results {
        let mut i = 0;
        for local_y in 0..bucket.height {
            for local_x in 0..bucket.width {
                frame.put(bucket.x + local_x, bucket.y + local_y, samples[i]);
                i += 1;
            }
        }
    }

    let stats = tracer.stats();
    log::info!(
        "render finished in {:.2?}: {} primary, {} secondary, {} shadow rays",
        start.elapsed(),
        stats.primary_rays(),
        stats.secondary_rays(),
        stats.shadow_rays()
    );
    if let Some(grid) = &scene.grid {
        log::info!("grid traversal visited {} cells", grid.cells_visited());
    }

    frame
}

/// Render one bucket; samples come back in row-major order within it.
fn render_bucket(
    bucket: &Bucket,
    tracer: &RayTracer,
    scene: &Scene,
    width: u32,
    height: u32,
) -> Vec<PixelSample> {
    let mut samples = Vec::with_capacity(bucket.pixel_count() as usize);

    for local_y in 0..bucket.height {
        for local_x in 0..bucket.width {
            let x = bucket.x + local_x;
            let y = bucket.y + local_y;

            // Pixel centers on a [0,1]^2 film, y up
            let film = Vec2::new(
                (x as f32 + 0.5) / width as f32,
                1.0 - (y as f32 + 0.5) / height as f32,
            );
            let ray = scene.camera.generate_ray(film);

            let sample = match tracer.trace_with_hit(&ray, 0.0) {
                Some((color, hit)) => PixelSample {
                    color,
                    depth: hit.t,
                    normal: hit.normal.abs(),
                },
                None => PixelSample {
                    color: scene.background,
                    depth: f32::INFINITY,
                    normal: Vec3::ZERO,
                },
            };
            samples.push(sample);
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{Primitive, PrimitiveStore};
    use glimt_core::{
        Light, Material, MaterialStore, OrthographicCamera, PhongMaterial,
    };

    /// Unit white sphere at the origin, directional light straight down,
    /// orthographic camera looking along -Z.
    fn lit_sphere_scene() -> Scene {
        let mut materials = MaterialStore::new();
        let white = materials.add(Material::Phong(PhongMaterial::new(
            Color::ONE,
            Color::ZERO,
            1.0,
        )));

        let mut primitives = PrimitiveStore::new();
        let sphere = primitives
            .add(Primitive::sphere(Vec3::ZERO, 1.0, white).unwrap())
            .unwrap();
        let root = primitives.add(Primitive::group(vec![sphere])).unwrap();

        let camera = OrthographicCamera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::Y,
            4.0,
        );

        Scene::new(camera, primitives, root, materials)
            .with_background(Color::new(0.2, 0.3, 0.7))
            .with_light(Light::directional(Vec3::new(0.0, -1.0, 0.0), Color::ONE))
    }

    #[test]
    fn test_lit_sphere_end_to_end() {
        let _ = env_logger::builder().is_test(true).try_init();
        let scene = lit_sphere_scene();
        let config = RenderConfig::default();
        let frame = render(&scene, &config, 64, 64);

        // Film spans [-2,2]^2, so the sphere covers pixels 16..48.
        // Near the top of the sphere the normal lines up with the light.
        let top = frame.color_at(32, 18);
        // At the silhouette edge the diffuse term grazes to zero
        let edge = frame.color_at(46, 32);
        assert!(
            top.x > edge.x,
            "top {:?} should outshine silhouette {:?}",
            top,
            edge
        );

        // Outside the silhouette the background comes through exactly
        assert_eq!(frame.color_at(2, 2), scene.background);
        assert_eq!(frame.depth_at(2, 2), f32::INFINITY);

        // Center pixel hits the front of the sphere at z=1, depth 9
        assert!((frame.depth_at(32, 32) - 9.0).abs() < 0.05);

        // Normal buffer: center hit faces +Z
        let n = frame.normal_at(32, 32);
        assert!(n.z > 0.9);
    }

    #[test]
    fn test_depth_grayscale_mapping() {
        let scene = lit_sphere_scene();
        let config = RenderConfig::default();
        let frame = render(&scene, &config, 32, 32);

        let gray = frame.depth_grayscale(8.5, 10.0);
        let center = gray[(16 * 32 + 16) as usize];
        let outside = gray[(2 * 32 + 2) as usize];
        // Sphere front (t = 9) lands mid-ramp; misses map to black
        assert!(center > 0.3 && center < 1.0);
        assert_eq!(outside, 0.0);
    }

    #[test]
    fn test_grid_render_matches_brute_force_render() {
        let mut scene = lit_sphere_scene();
        let config = RenderConfig::default();
        let plain = render(&scene, &config, 32, 32);

        scene
            .build_grid(glimt_core::GridResolution::uniform(6))
            .unwrap();
        let gridded = render(&scene, &config, 32, 32);

        for y in 0..32 {
            for x in 0..32 {
                let a = plain.color_at(x, y);
                let b = gridded.color_at(x, y);
                assert!(
                    (a - b).length() < 1e-5,
                    "pixel ({}, {}) differs: {:?} vs {:?}",
                    x,
                    y,
                    a,
                    b
                );
            }
        }
    }
}

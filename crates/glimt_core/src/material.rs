//! Materials and the Phong shading model.
//!
//! Materials live in a flat [`MaterialStore`] and are addressed by
//! [`MaterialId`]; the procedural variants blend between two other entries
//! of the store, so shading dispatches through the store rather than
//! through nested ownership.

use crate::noise::octave_noise;
use glimt_math::{Mat4, Ray, Vec3};

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// Index of a material in a [`MaterialStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(usize);

impl MaterialId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Phong material: diffuse + specular response plus the attenuation
/// colors that drive reflection and refraction rays.
#[derive(Debug, Clone)]
pub struct PhongMaterial {
    pub diffuse: Color,
    pub specular: Color,
    pub exponent: f32,
    pub reflective: Color,
    pub transparent: Color,
    pub index_of_refraction: f32,
}

impl PhongMaterial {
    /// Create a plain diffuse/specular material with no secondary rays.
    pub fn new(diffuse: Color, specular: Color, exponent: f32) -> Self {
        Self {
            diffuse,
            specular,
            exponent,
            reflective: Color::ZERO,
            transparent: Color::ZERO,
            index_of_refraction: 1.0,
        }
    }

    /// Set the reflective attenuation color.
    pub fn with_reflective(mut self, reflective: Color) -> Self {
        self.reflective = reflective;
        self
    }

    /// Set the transparent attenuation color and index of refraction.
    pub fn with_transparent(mut self, transparent: Color, index_of_refraction: f32) -> Self {
        self.transparent = transparent;
        self.index_of_refraction = index_of_refraction;
        self
    }

    /// Evaluate direct illumination from one light.
    fn shade(&self, ray: &Ray, normal: Vec3, dir_to_light: Vec3, light_color: Color) -> Color {
        let mut radiance = Color::ZERO;

        // Diffuse
        let n_dot_l = normal.dot(dir_to_light);
        radiance += self.diffuse * light_color * n_dot_l.max(0.0);

        // Specular: mirror the light about the normal and compare against
        // the view direction
        let view = ray.direction().normalize();
        let reflected = reflect(-dir_to_light, normal).normalize();
        let r_dot_v = reflected.dot(-view).max(0.0);
        radiance += r_dot_v.powf(self.exponent) * light_color * self.specular;

        radiance
    }
}

/// Surface material. A closed set: tracing only ever spawns secondary
/// rays from the Phong variant, the procedural variants blend the shading
/// of two other materials by a spatial weight.
#[derive(Debug, Clone)]
pub enum Material {
    Phong(PhongMaterial),
    /// World-space checkerboard: parity of the floored texture-space
    /// coordinates picks one of two materials.
    Checkerboard {
        to_texture: Mat4,
        even: MaterialId,
        odd: MaterialId,
    },
    /// Octave-noise blend between two materials.
    Noise {
        to_texture: Mat4,
        a: MaterialId,
        b: MaterialId,
        octaves: u32,
    },
    /// Sine-warped noise bands.
    Marble {
        to_texture: Mat4,
        a: MaterialId,
        b: MaterialId,
        octaves: u32,
        frequency: f32,
        amplitude: f32,
    },
    /// Noise rings flattened along Y.
    Wood {
        to_texture: Mat4,
        a: MaterialId,
        b: MaterialId,
        octaves: u32,
    },
}

impl Material {
    /// Albedo used for the ambient term. Procedural materials report
    /// black, matching their zero base color in the reference renderer.
    pub fn diffuse_color(&self) -> Color {
        match self {
            Material::Phong(p) => p.diffuse,
            _ => Color::ZERO,
        }
    }

    /// Attenuation color for reflection rays; zero means none are spawned.
    pub fn reflective_color(&self) -> Color {
        match self {
            Material::Phong(p) => p.reflective,
            _ => Color::ZERO,
        }
    }

    /// Attenuation color for refraction rays; zero means none are spawned.
    pub fn transparent_color(&self) -> Color {
        match self {
            Material::Phong(p) => p.transparent,
            _ => Color::ZERO,
        }
    }

    pub fn index_of_refraction(&self) -> f32 {
        match self {
            Material::Phong(p) => p.index_of_refraction,
            _ => 1.0,
        }
    }
}

/// Flat store of materials, addressed by [`MaterialId`].
#[derive(Debug, Default)]
pub struct MaterialStore {
    materials: Vec<Material>,
}

impl MaterialStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material to the store and return its id.
    pub fn add(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.materials.len());
        self.materials.push(material);
        id
    }

    /// Get a material by id.
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    /// Number of materials in the store.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Evaluate one light's contribution at a surface point.
    ///
    /// `dir_to_light` and `normal` are unit vectors; `point` is the
    /// world-space intersection point (procedural materials sample it).
    pub fn shade(
        &self,
        id: MaterialId,
        ray: &Ray,
        point: Vec3,
        normal: Vec3,
        dir_to_light: Vec3,
        light_color: Color,
    ) -> Color {
        let Some(material) = self.get(id) else {
            return Color::ZERO;
        };

        match material {
            Material::Phong(p) => p.shade(ray, normal, dir_to_light, light_color),

            Material::Checkerboard {
                to_texture,
                even,
                odd,
            } => {
                let p = to_texture.transform_point3(point);
                let parity = |v: f32| if (v.floor() as i64) % 2 == 0 { 1 } else { -1 };
                let mul = parity(p.x) * parity(p.y) * parity(p.z);
                let pick = if mul == 1 { *even } else { *odd };
                self.shade(pick, ray, point, normal, dir_to_light, light_color)
            }

            Material::Noise {
                to_texture,
                a,
                b,
                octaves,
            } => {
                let p = to_texture.transform_point3(point);
                let w = octave_noise(p, *octaves).clamp(0.0, 1.0);
                self.blend(w, *a, *b, ray, point, normal, dir_to_light, light_color)
            }

            Material::Marble {
                to_texture,
                a,
                b,
                octaves,
                frequency,
                amplitude,
            } => {
                let p = to_texture.transform_point3(point);
                let n = octave_noise(p, *octaves);
                let w = ((frequency * p.x + amplitude * n).sin() * 0.5 + 0.5).clamp(0.0, 1.0);
                self.blend(w, *a, *b, ray, point, normal, dir_to_light, light_color)
            }

            Material::Wood {
                to_texture,
                a,
                b,
                octaves,
            } => {
                let p = to_texture.transform_point3(point);
                let squashed = Vec3::new(p.x, 0.1 * p.y, p.z);
                let w = (octave_noise(squashed, *octaves) - 0.5).clamp(0.0, 1.0);
                self.blend(w, *a, *b, ray, point, normal, dir_to_light, light_color)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn blend(
        &self,
        w: f32,
        a: MaterialId,
        b: MaterialId,
        ray: &Ray,
        point: Vec3,
        normal: Vec3,
        dir_to_light: Vec3,
        light_color: Color,
    ) -> Color {
        w * self.shade(a, ray, point, normal, dir_to_light, light_color)
            + (1.0 - w) * self.shade(b, ray, point, normal, dir_to_light, light_color)
    }
}

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(material: Material) -> (MaterialStore, MaterialId) {
        let mut store = MaterialStore::new();
        let id = store.add(material);
        (store, id)
    }

    #[test]
    fn test_diffuse_peaks_at_normal_incidence() {
        let (store, id) = store_with(Material::Phong(PhongMaterial::new(
            Color::ONE,
            Color::ZERO,
            1.0,
        )));

        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let normal = Vec3::Y;

        let head_on = store.shade(id, &ray, Vec3::ZERO, normal, Vec3::Y, Color::ONE);
        let grazing_dir = Vec3::new(1.0, 0.01, 0.0).normalize();
        let grazing = store.shade(id, &ray, Vec3::ZERO, normal, grazing_dir, Color::ONE);

        assert!(head_on.x > grazing.x);
        assert!((head_on.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_light_below_surface_contributes_nothing() {
        let (store, id) = store_with(Material::Phong(PhongMaterial::new(
            Color::ONE,
            Color::ZERO,
            1.0,
        )));

        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let radiance = store.shade(id, &ray, Vec3::ZERO, Vec3::Y, -Vec3::Y, Color::ONE);

        assert_eq!(radiance, Color::ZERO);
    }

    #[test]
    fn test_specular_highlight_along_mirror_direction() {
        let (store, id) = store_with(Material::Phong(PhongMaterial::new(
            Color::ZERO,
            Color::ONE,
            32.0,
        )));

        // Light straight down the normal, view straight down the normal:
        // the mirror direction lines up exactly with the viewer.
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let radiance = store.shade(id, &ray, Vec3::ZERO, Vec3::Y, Vec3::Y, Color::ONE);

        assert!((radiance.x - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_checkerboard_alternates() {
        let mut store = MaterialStore::new();
        let white = store.add(Material::Phong(PhongMaterial::new(
            Color::ONE,
            Color::ZERO,
            1.0,
        )));
        let black = store.add(Material::Phong(PhongMaterial::new(
            Color::ZERO,
            Color::ZERO,
            1.0,
        )));
        let checker = store.add(Material::Checkerboard {
            to_texture: Mat4::IDENTITY,
            even: white,
            odd: black,
        });

        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let a = store.shade(
            checker,
            &ray,
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::Y,
            Vec3::Y,
            Color::ONE,
        );
        let b = store.shade(
            checker,
            &ray,
            Vec3::new(1.5, 0.5, 0.5),
            Vec3::Y,
            Vec3::Y,
            Color::ONE,
        );

        assert!(a.x > 0.5);
        assert_eq!(b, Color::ZERO);
    }

    #[test]
    fn test_procedural_materials_spawn_no_secondary_rays() {
        let mut store = MaterialStore::new();
        let shiny = store.add(Material::Phong(
            PhongMaterial::new(Color::ONE, Color::ZERO, 1.0).with_reflective(Color::ONE),
        ));
        let checker = Material::Checkerboard {
            to_texture: Mat4::IDENTITY,
            even: shiny,
            odd: shiny,
        };

        assert_eq!(checker.reflective_color(), Color::ZERO);
        assert_eq!(checker.transparent_color(), Color::ZERO);
    }
}

//! Light sources.

use crate::material::Color;
use glimt_math::Vec3;

/// What a light delivers to a shading point: a unit direction toward the
/// light, the (possibly attenuated) color arriving there, and the distance
/// to the light for shadow-ray clipping.
#[derive(Debug, Clone, Copy)]
pub struct Illumination {
    pub dir_to_light: Vec3,
    pub color: Color,
    pub distance: f32,
}

/// Scene light. Directional lights sit at infinity; point lights fall off
/// with distance through the standard constant/linear/quadratic terms.
#[derive(Debug, Clone)]
pub enum Light {
    Directional {
        direction: Vec3,
        color: Color,
    },
    Point {
        position: Vec3,
        color: Color,
        /// (constant, linear, quadratic) attenuation coefficients.
        attenuation: Vec3,
    },
}

impl Light {
    /// Directional light shining along `direction`.
    pub fn directional(direction: Vec3, color: Color) -> Self {
        Light::Directional {
            direction: direction.normalize(),
            color,
        }
    }

    /// Point light with no falloff.
    pub fn point(position: Vec3, color: Color) -> Self {
        Light::Point {
            position,
            color,
            attenuation: Vec3::new(1.0, 0.0, 0.0),
        }
    }

    /// Point light with constant/linear/quadratic falloff.
    pub fn point_attenuated(position: Vec3, color: Color, attenuation: Vec3) -> Self {
        Light::Point {
            position,
            color,
            attenuation,
        }
    }

    /// Evaluate the light as seen from `point`.
    pub fn illuminate(&self, point: Vec3) -> Illumination {
        match self {
            Light::Directional { direction, color } => Illumination {
                dir_to_light: -*direction,
                color: *color,
                distance: f32::INFINITY,
            },
            Light::Point {
                position,
                color,
                attenuation,
            } => {
                let to_light = *position - point;
                let distance = to_light.length();
                let falloff =
                    attenuation.x + attenuation.y * distance + attenuation.z * distance * distance;
                let color = if falloff > 0.0 {
                    *color / falloff
                } else {
                    *color
                };
                Illumination {
                    dir_to_light: to_light / distance,
                    color,
                    distance,
                }
            }
        }
    }
}

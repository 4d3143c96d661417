//! glimt core - materials, lights, cameras and render configuration.
//!
//! This crate provides the shading side of the renderer:
//!
//! - **Materials**: Phong plus the procedural Checkerboard/Noise/Marble/Wood
//!   blends, stored in a flat [`MaterialStore`] addressed by [`MaterialId`]
//! - **Lights**: directional and point lights
//! - **Cameras**: perspective and orthographic ray generation
//! - **Configuration**: [`RenderConfig`] for bounce/shadow/grid settings

pub mod camera;
pub mod config;
pub mod light;
pub mod material;
pub mod noise;

// Re-export commonly used types
pub use camera::{Camera, OrthographicCamera, PerspectiveCamera};
pub use config::{GridResolution, RenderConfig};
pub use light::{Illumination, Light};
pub use material::{Color, Material, MaterialId, MaterialStore, PhongMaterial};
pub use noise::octave_noise;

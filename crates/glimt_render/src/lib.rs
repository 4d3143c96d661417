//! glimt render - the ray tracing engine.
//!
//! This crate contains the transport core and everything it traces
//! against:
//!
//! - **Primitives**: sphere, plane, triangle, transform and group,
//!   arena-allocated in a [`PrimitiveStore`]
//! - **Acceleration**: uniform voxel [`Grid`] walked with 3D-DDA
//! - **Tracer**: recursive Whitted-style [`RayTracer`] with shadow rays
//!   and weight-bounded reflection/refraction
//! - **Driver**: bucketed parallel [`render`] producing color, depth and
//!   normal buffers

pub mod bucket;
pub mod error;
pub mod grid;
pub mod hit;
pub mod primitive;
pub mod render;
pub mod scene;
pub mod tracer;

// Re-export commonly used types
pub use bucket::{generate_buckets, Bucket, DEFAULT_BUCKET_SIZE};
pub use error::SceneError;
pub use grid::{DrawItem, Grid, GridVisHit, Voxel};
pub use hit::HitRecord;
pub use primitive::{PrimId, Primitive, PrimitiveStore};
pub use render::{render, Frame, PixelSample};
pub use scene::Scene;
pub use tracer::{RayTracer, RenderStats};

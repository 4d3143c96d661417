//! Scene validation errors.

use thiserror::Error;

/// Errors raised while assembling a scene. Geometry is validated on
/// insertion so the tracing hot path never sees degenerate primitives.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("sphere radius must be positive and finite, got {0}")]
    InvalidSphereRadius(f32),

    #[error("plane normal must be non-zero and finite")]
    DegeneratePlaneNormal,

    #[error("triangle has zero area")]
    DegenerateTriangle,

    #[error("primitive contains non-finite coordinates")]
    NonFiniteGeometry,

    #[error("transform matrix is singular")]
    SingularTransform,

    #[error("unknown primitive id {0}")]
    UnknownPrimitive(usize),

    #[error("scene bounding box is empty or unbounded, cannot build a grid")]
    UnboundedScene,

    #[error("grid resolution must be at least one voxel per axis")]
    InvalidGridResolution,
}

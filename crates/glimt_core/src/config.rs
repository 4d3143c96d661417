//! Render configuration.

/// Resolution of the uniform acceleration grid, in voxels per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridResolution {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl GridResolution {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Same voxel count along every axis.
    pub fn uniform(n: usize) -> Self {
        Self::new(n, n, n)
    }

    pub fn voxel_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }
}

/// Knobs for a render pass. Everything the tracer consults lives here
/// instead of in globals.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Maximum recursion depth for reflection/refraction rays. Zero
    /// disables secondary rays entirely.
    pub max_bounces: u32,
    /// Secondary rays stop once the accumulated path weight is no longer
    /// strictly above this value.
    pub cutoff_weight: f32,
    /// Cast shadow rays toward each light.
    pub shadows: bool,
    /// Shade surfaces seen from behind (flipping the normal); when off,
    /// back faces render black.
    pub shade_back: bool,
    /// Build a uniform grid at this resolution and trace through it;
    /// `None` tests every primitive per ray.
    pub grid: Option<GridResolution>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_bounces: 4,
            cutoff_weight: 0.01,
            shadows: true,
            shade_back: true,
            grid: None,
        }
    }
}

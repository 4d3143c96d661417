//! Scene container.

use crate::error::SceneError;
use crate::grid::Grid;
use crate::primitive::{PrimId, PrimitiveStore};
use glimt_core::{Camera, Color, GridResolution, Light, MaterialStore, RenderConfig};

/// Everything the tracer reads: camera, geometry, materials, lights and
/// the optional acceleration grid. Immutable once the render starts.
pub struct Scene {
    pub camera: Camera,
    pub background: Color,
    pub ambient: Color,
    pub lights: Vec<Light>,
    pub materials: MaterialStore,
    pub primitives: PrimitiveStore,
    /// Root of the primitive tree, usually a group.
    pub root: PrimId,
    pub grid: Option<Grid>,
}

impl Scene {
    pub fn new(
        camera: impl Into<Camera>,
        primitives: PrimitiveStore,
        root: PrimId,
        materials: MaterialStore,
    ) -> Self {
        Self {
            camera: camera.into(),
            background: Color::ZERO,
            ambient: Color::ZERO,
            lights: Vec::new(),
            materials,
            primitives,
            root,
            grid: None,
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn with_ambient(mut self, color: Color) -> Self {
        self.ambient = color;
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.lights.push(light);
        self
    }

    /// Config-driven setup: builds the acceleration grid when the config
    /// asks for one.
    pub fn prepare(&mut self, config: &RenderConfig) -> Result<(), SceneError> {
        if let Some(res) = config.grid {
            self.build_grid(res)?;
        }
        Ok(())
    }

    /// Build the acceleration grid over the root's bounding box. Fails if
    /// the scene contains only unbounded geometry.
    pub fn build_grid(&mut self, res: GridResolution) -> Result<(), SceneError> {
        if res.nx == 0 || res.ny == 0 || res.nz == 0 {
            return Err(SceneError::InvalidGridResolution);
        }
        let bounds = self
            .primitives
            .bounding_box(self.root)
            .ok_or(SceneError::UnboundedScene)?;

        let mut grid = Grid::new(bounds, res);
        grid.insert(&self.primitives, self.root, None);

        log::info!(
            "built {}x{}x{} grid, {}/{} voxels occupied",
            res.nx,
            res.ny,
            res.nz,
            grid.occupied_count(),
            res.voxel_count()
        );

        self.grid = Some(grid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Primitive;
    use glimt_core::{Material, PerspectiveCamera, PhongMaterial};
    use glimt_math::Vec3;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::Y,
            std::f32::consts::FRAC_PI_2,
        )
    }

    #[test]
    fn test_build_grid_over_bounded_scene() {
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

        let mut scene = Scene::new(camera(), primitives, root, materials);
        scene.build_grid(GridResolution::uniform(4)).unwrap();
        assert!(scene.grid.is_some());
    }

    #[test]
    fn test_prepare_honors_config_grid() {
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
        let mut scene = Scene::new(camera(), primitives, root, materials);

        let config = RenderConfig {
            grid: Some(GridResolution::uniform(4)),
            ..RenderConfig::default()
        };
        scene.prepare(&config).unwrap();
        assert!(scene.grid.is_some());
    }

    #[test]
    fn test_zero_grid_resolution_rejected() {
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
        let mut scene = Scene::new(camera(), primitives, root, materials);

        assert!(matches!(
            scene.build_grid(GridResolution::new(0, 4, 4)),
            Err(SceneError::InvalidGridResolution)
        ));
    }

    #[test]
    fn test_build_grid_fails_for_plane_only_scene() {
        let mut materials = MaterialStore::new();
        let white = materials.add(Material::Phong(PhongMaterial::new(
            Color::ONE,
            Color::ZERO,
            1.0,
        )));
        let mut primitives = PrimitiveStore::new();
        let plane = primitives
            .add(Primitive::plane(Vec3::Y, 0.0, white).unwrap())
            .unwrap();
        let root = primitives.add(Primitive::group(vec![plane])).unwrap();

        let mut scene = Scene::new(camera(), primitives, root, materials);
        assert!(matches!(
            scene.build_grid(GridResolution::uniform(4)),
            Err(SceneError::UnboundedScene)
        ));
    }
}

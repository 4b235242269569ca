use crate::asset::{Handle, Mesh};
use crate::renderer::Material;

/// Marks an entity as drawable: which geometry and surface it uses and
/// whether it contributes to the shadow map.
#[derive(Clone, Copy)]
pub struct MeshRenderer {
    pub mesh: Handle<Mesh>,
    pub material: Handle<Material>,
    pub cast_shadows: bool,
}

impl MeshRenderer {
    pub fn new(mesh: Handle<Mesh>, material: Handle<Material>) -> Self {
        Self {
            mesh,
            material,
            cast_shadows: true,
        }
    }

    pub fn without_shadows(mut self) -> Self {
        self.cast_shadows = false;
        self
    }
}

/// Tags the entity whose transform drives the view matrix.
#[derive(Clone, Copy, Default)]
pub struct MainCamera;

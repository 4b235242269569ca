mod cache;
mod handle;
mod mesh;

pub use cache::AssetCache;
pub use handle::Handle;
pub use mesh::Mesh;

use crate::renderer::{Material, Texture};

/// All renderer-owned resources, keyed by stable handles.  Collaborators hold
/// handles only; the backing vectors may grow freely.
#[derive(Default)]
pub struct Assets {
    pub meshes: AssetCache<Mesh>,
    pub materials: AssetCache<Material>,
    pub textures: AssetCache<Texture>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }
}

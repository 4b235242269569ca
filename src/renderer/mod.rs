pub mod batch;
pub mod camera;
pub mod depth;
pub mod error;
pub mod gpu;
pub mod lights;
pub mod material;
pub mod primitives;
#[allow(clippy::module_inception)]
pub mod renderer;
pub mod skybox;
pub mod texture;
pub mod uniforms;
pub mod vertex;

mod internal;

pub use batch::{Batch, BatchKey, RenderBatcher, ShadowBatch};
pub use camera::Camera;
pub use depth::Depth;
pub use error::RenderError;
pub use lights::{
    DirectionalLight, LightsUniform, SpotLight, MAX_DIRECTIONAL_LIGHTS, MAX_SPOT_LIGHTS,
};
pub use material::{Material, MaterialFlags};
pub use renderer::Renderer;
pub use skybox::{AtlasLayout, CubemapOrientation, Skybox};
pub use texture::Texture;
pub use vertex::{v, InstanceRaw, Vertex};

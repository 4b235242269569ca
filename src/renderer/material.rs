use bitflags::bitflags;
use glam::Vec3;

use crate::asset::Handle;
use crate::renderer::Texture;

bitflags! {
    /// Per-map enable bits, mirrored verbatim into the shader which branches
    /// on them instead of relying on bound-texture state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFlags: u32 {
        const ALBEDO_MAP    = 1 << 0;
        const NORMAL_MAP    = 1 << 1;
        const METALLIC_MAP  = 1 << 2;
        const ROUGHNESS_MAP = 1 << 3;
        const AO_MAP        = 1 << 4;
        const EMISSIVE_MAP  = 1 << 5;
    }
}

/// PBR surface description.  Scalar/vector parameters plus up to six
/// optional texture maps.  Identity is the registry handle; the renderer
/// never mutates a material, only `Renderer::edit_material` does.
#[derive(Clone, Copy, Debug)]
pub struct Material {
    pub albedo: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub ao: f32,
    pub emissive: Vec3,
    pub emissive_strength: f32,

    pub albedo_map: Option<Handle<Texture>>,
    pub normal_map: Option<Handle<Texture>>,
    pub metallic_map: Option<Handle<Texture>>,
    pub roughness_map: Option<Handle<Texture>>,
    pub ao_map: Option<Handle<Texture>>,
    pub emissive_map: Option<Handle<Texture>>,

    pub flags: MaterialFlags,
}

impl Material {
    pub fn new(albedo: Vec3) -> Self {
        Self {
            albedo,
            metallic: 0.0,
            roughness: 1.0,
            ao: 1.0,
            emissive: Vec3::ZERO,
            emissive_strength: 0.0,
            albedo_map: None,
            normal_map: None,
            metallic_map: None,
            roughness_map: None,
            ao_map: None,
            emissive_map: None,
            flags: MaterialFlags::empty(),
        }
    }

    pub fn white() -> Self {
        Self::new(Vec3::ONE)
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic.clamp(0.0, 1.0);
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_emissive(mut self, emissive: Vec3, strength: f32) -> Self {
        self.emissive = emissive;
        self.emissive_strength = strength.max(0.0);
        self
    }

    pub fn with_albedo_map(mut self, texture: Handle<Texture>) -> Self {
        self.albedo_map = Some(texture);
        self.flags |= MaterialFlags::ALBEDO_MAP;
        self
    }

    pub fn with_normal_map(mut self, texture: Handle<Texture>) -> Self {
        self.normal_map = Some(texture);
        self.flags |= MaterialFlags::NORMAL_MAP;
        self
    }

    pub fn with_metallic_map(mut self, texture: Handle<Texture>) -> Self {
        self.metallic_map = Some(texture);
        self.flags |= MaterialFlags::METALLIC_MAP;
        self
    }

    pub fn with_roughness_map(mut self, texture: Handle<Texture>) -> Self {
        self.roughness_map = Some(texture);
        self.flags |= MaterialFlags::ROUGHNESS_MAP;
        self
    }

    pub fn with_ao_map(mut self, texture: Handle<Texture>) -> Self {
        self.ao_map = Some(texture);
        self.flags |= MaterialFlags::AO_MAP;
        self
    }

    pub fn with_emissive_map(mut self, texture: Handle<Texture>) -> Self {
        self.emissive_map = Some(texture);
        self.flags |= MaterialFlags::EMISSIVE_MAP;
        self
    }

    /// Texture slot for each reserved binding, in binding order.  Slots whose
    /// flag is unset stay `None` and bind the neutral fallback.
    pub fn map_slots(&self) -> [(MaterialFlags, Option<Handle<Texture>>); 6] {
        [
            (MaterialFlags::ALBEDO_MAP, self.albedo_map),
            (MaterialFlags::NORMAL_MAP, self.normal_map),
            (MaterialFlags::METALLIC_MAP, self.metallic_map),
            (MaterialFlags::ROUGHNESS_MAP, self.roughness_map),
            (MaterialFlags::AO_MAP, self.ao_map),
            (MaterialFlags::EMISSIVE_MAP, self.emissive_map),
        ]
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::white()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_builders_set_matching_flags() {
        let tex: Handle<Texture> = Handle::new(0);
        let material = Material::white().with_albedo_map(tex).with_normal_map(tex);
        assert!(material.flags.contains(MaterialFlags::ALBEDO_MAP));
        assert!(material.flags.contains(MaterialFlags::NORMAL_MAP));
        assert!(!material.flags.contains(MaterialFlags::EMISSIVE_MAP));
    }

    #[test]
    fn slots_follow_binding_order() {
        let tex: Handle<Texture> = Handle::new(3);
        let material = Material::white().with_roughness_map(tex);
        let slots = material.map_slots();
        assert_eq!(slots[3].1, Some(tex));
        assert!(slots[0].1.is_none());
    }
}

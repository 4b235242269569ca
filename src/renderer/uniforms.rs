use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::renderer::Material;

/// Frame-wide shading inputs: view/projection, the shadow caster's
/// light-space matrix and the camera's world position.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct GlobalsUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub light_matrix: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
}

impl GlobalsUniform {
    pub fn new(view: Mat4, proj: Mat4, light_matrix: Mat4, camera_pos: Vec3) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            light_matrix: light_matrix.to_cols_array_2d(),
            camera_pos: [camera_pos.x, camera_pos.y, camera_pos.z, 1.0],
        }
    }
}

impl Default for GlobalsUniform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO)
    }
}

/// Scalar/vector material parameters plus the map-enable bits the shader
/// branches on.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    /// rgb = albedo, w = ao
    pub albedo_ao: [f32; 4],
    /// rgb = emissive, w = emissive strength
    pub emissive: [f32; 4],
    /// x = metallic, y = roughness
    pub params: [f32; 4],
    pub flags: [u32; 4],
}

impl MaterialUniform {
    pub fn from_material(material: &Material) -> Self {
        Self {
            albedo_ao: [
                material.albedo.x,
                material.albedo.y,
                material.albedo.z,
                material.ao,
            ],
            emissive: [
                material.emissive.x,
                material.emissive.y,
                material.emissive.z,
                material.emissive_strength,
            ],
            params: [material.metallic, material.roughness, 0.0, 0.0],
            flags: [material.flags.bits(), 0, 0, 0],
        }
    }
}

/// Environment pass inputs: rotation-only view, projection, ambient tint.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SkyUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

/// Shadow pass input: the light-space view-projection.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ShadowUniform {
    pub light_matrix: [[f32; 4]; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::MaterialFlags;

    #[test]
    fn material_uniform_carries_flag_bits() {
        let mut material = Material::white().with_metallic(0.25).with_roughness(0.5);
        material.flags |= MaterialFlags::ALBEDO_MAP;
        let uniform = MaterialUniform::from_material(&material);
        assert_eq!(uniform.flags[0], MaterialFlags::ALBEDO_MAP.bits());
        assert_eq!(uniform.params[0], 0.25);
        assert_eq!(uniform.params[1], 0.5);
    }
}

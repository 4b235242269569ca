use std::path::PathBuf;

use glam::Vec3;

use crate::renderer::CubemapOrientation;

/// Renderer configuration fixed at initialization.
#[derive(Clone, Debug)]
pub struct RenderSettings {
    /// Edge length of the square shadow map, in texels.
    pub shadow_map_size: u32,
    /// Instance slots in each per-pass instance buffer.  A frame whose
    /// batches need more slots fails those batches instead of growing.
    pub instance_capacity: u32,
    pub vsync: bool,
    pub environment: EnvironmentSettings,
}

#[derive(Clone, Debug)]
pub struct EnvironmentSettings {
    /// Cubemap atlas image; `None` renders a solid ambient background.
    pub atlas_path: Option<PathBuf>,
    pub orientation: CubemapOrientation,
    pub ambient: Vec3,
    pub ambient_intensity: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shadow_map_size: 4096,
            instance_capacity: 4096,
            vsync: true,
            environment: EnvironmentSettings::default(),
        }
    }
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            atlas_path: None,
            orientation: CubemapOrientation::Default,
            ambient: Vec3::new(0.1, 0.1, 0.15),
            ambient_intensity: 1.0,
        }
    }
}

impl RenderSettings {
    pub fn present_mode(&self, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
        let preferred = if self.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::Immediate
        };
        if available.contains(&preferred) {
            preferred
        } else {
            wgpu::PresentMode::Fifo
        }
    }
}

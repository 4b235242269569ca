use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::scene::Transform;

pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;
pub const MAX_SPOT_LIGHTS: usize = 8;

/// Directional light plus the orthographic frustum it would use when it is
/// the frame's shadow caster.
#[derive(Clone, Copy, Debug)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadows: bool,
    pub shadow_size: f32,
    pub shadow_distance: f32,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            color,
            intensity,
            cast_shadows: false,
            shadow_size: 15.0,
            shadow_distance: 30.0,
        }
    }

    pub fn with_shadows(mut self) -> Self {
        self.cast_shadows = true;
        self
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SpotLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Inner/outer cone half-angles, radians.
    pub inner_cutoff: f32,
    pub outer_cutoff: f32,
}

impl SpotLight {
    pub fn new(direction: Vec3, color: Vec3, intensity: f32, inner: f32, outer: f32) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            color,
            intensity,
            inner_cutoff: inner,
            outer_cutoff: outer,
        }
    }
}

/// The light-space matrix for the frame: orthographic view-projection from
/// the first directional light flagged as a shadow caster.  Without one the
/// shadow pass still runs against an identity matrix, which samples as
/// uniformly lit.
pub fn light_space_matrix(lights: &[DirectionalLight]) -> Mat4 {
    lights
        .iter()
        .find(|light| light.cast_shadows)
        .map(directional_light_matrix)
        .unwrap_or(Mat4::IDENTITY)
}

fn directional_light_matrix(light: &DirectionalLight) -> Mat4 {
    let direction = light.direction.normalize_or_zero();
    let direction = if direction.length_squared() > 0.0 {
        direction
    } else {
        Vec3::new(0.0, -1.0, 0.0)
    };

    let focus = Vec3::ZERO;
    let light_pos = focus - direction * light.shadow_distance;
    let up = shadow_up(direction);
    let view = Mat4::look_at_rh(light_pos, focus, up);

    let extent = light.shadow_size.max(0.1);
    let (left, right) = (-extent, extent);
    let (bottom, top) = (-extent, extent);
    let near = 0.1;
    let far = light.shadow_distance * 2.0;

    // Orthographic projection with 0..1 depth
    let projection = Mat4::from_cols(
        Vec4::new(2.0 / (right - left), 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 / (top - bottom), 0.0, 0.0),
        Vec4::new(0.0, 0.0, -1.0 / (far - near), 0.0),
        Vec4::new(
            -(right + left) / (right - left),
            -(top + bottom) / (top - bottom),
            -near / (far - near),
            1.0,
        ),
    );

    projection * view
}

fn shadow_up(direction: Vec3) -> Vec3 {
    if direction.abs().dot(Vec3::Y) > 0.95 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct DirectionalLightRaw {
    /// xyz = direction, w = cast-shadows flag
    pub direction: [f32; 4],
    /// rgb premultiplied by intensity
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SpotLightRaw {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub color: [f32; 4],
    /// x = cos(inner cutoff), y = cos(outer cutoff)
    pub cone: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    pub counts: [u32; 4],
    /// rgb premultiplied by the environment's ambient intensity
    pub ambient: [f32; 4],
    pub directionals: [DirectionalLightRaw; MAX_DIRECTIONAL_LIGHTS],
    pub spots: [SpotLightRaw; MAX_SPOT_LIGHTS],
}

impl LightsUniform {
    pub fn build(directional: &[DirectionalLight], spots: &[(Transform, SpotLight)]) -> Self {
        let mut uniform = Self::zeroed();

        let dir_count = directional.len().min(MAX_DIRECTIONAL_LIGHTS);
        if directional.len() > MAX_DIRECTIONAL_LIGHTS {
            log::warn!(
                "Frame has {} directional lights, shading the first {}",
                directional.len(),
                MAX_DIRECTIONAL_LIGHTS
            );
        }
        uniform.counts[0] = dir_count as u32;
        for (dst, src) in uniform.directionals.iter_mut().zip(directional.iter()) {
            let color = src.color * src.intensity;
            *dst = DirectionalLightRaw {
                direction: [
                    src.direction.x,
                    src.direction.y,
                    src.direction.z,
                    if src.cast_shadows { 1.0 } else { 0.0 },
                ],
                color: [color.x, color.y, color.z, 0.0],
            };
        }

        let spot_count = spots.len().min(MAX_SPOT_LIGHTS);
        if spots.len() > MAX_SPOT_LIGHTS {
            log::warn!(
                "Frame has {} spot lights, shading the first {}",
                spots.len(),
                MAX_SPOT_LIGHTS
            );
        }
        uniform.counts[1] = spot_count as u32;
        for (dst, (transform, light)) in uniform.spots.iter_mut().zip(spots.iter()) {
            let color = light.color * light.intensity;
            let mut inner = light.inner_cutoff;
            let mut outer = light.outer_cutoff;
            if inner > outer {
                std::mem::swap(&mut inner, &mut outer);
            }
            *dst = SpotLightRaw {
                position: [
                    transform.translation.x,
                    transform.translation.y,
                    transform.translation.z,
                    0.0,
                ],
                direction: [light.direction.x, light.direction.y, light.direction.z, 0.0],
                color: [color.x, color.y, color.z, 0.0],
                cone: [inner.cos(), outer.cos(), 0.0, 0.0],
            };
        }

        uniform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_casting_light_never_supplies_the_matrix() {
        let light = DirectionalLight::new(Vec3::new(0.3, -1.0, 0.2), Vec3::ONE, 1.0);
        assert!(!light.cast_shadows);
        let matrix = light_space_matrix(&[light]);
        assert_eq!(matrix, Mat4::IDENTITY);
    }

    #[test]
    fn first_casting_light_wins() {
        let plain = DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE, 1.0);
        let caster = DirectionalLight::new(Vec3::new(0.4, -1.0, 0.2), Vec3::ONE, 1.0).with_shadows();
        let second = DirectionalLight::new(Vec3::X, Vec3::ONE, 1.0).with_shadows();

        let expected = light_space_matrix(&[caster]);
        let matrix = light_space_matrix(&[plain, caster, second]);
        assert_eq!(matrix, expected);
        assert_ne!(matrix, Mat4::IDENTITY);
    }

    #[test]
    fn shadow_matrix_maps_focus_into_unit_depth() {
        let light = DirectionalLight::new(Vec3::new(0.4, -1.0, 0.2), Vec3::ONE, 1.0).with_shadows();
        let matrix = light_space_matrix(&[light]);
        let clip = matrix * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn swapped_cutoffs_are_reordered() {
        let spot = SpotLight::new(Vec3::NEG_Y, Vec3::ONE, 1.0, 0.8, 0.4);
        let uniform = LightsUniform::build(&[], &[(Transform::IDENTITY, spot)]);
        let cone = uniform.spots[0].cone;
        // cos is decreasing, so the inner (smaller) angle has the larger cosine
        assert!(cone[0] >= cone[1]);
    }

    #[test]
    fn light_counts_are_clamped_to_capacity() {
        let many: Vec<_> = (0..6)
            .map(|_| DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE, 1.0))
            .collect();
        let uniform = LightsUniform::build(&many, &[]);
        assert_eq!(uniform.counts[0], MAX_DIRECTIONAL_LIGHTS as u32);
    }
}

use glam::Mat4;

use crate::scene::Transform;

/// Perspective camera parameters.  Position and orientation come from the
/// entity transform passed into the passes; the camera itself is pure lens
/// state.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// View matrix from the camera entity's transform: the look direction is
    /// the transform's forward axis.
    pub fn view(&self, transform: &Transform) -> Mat4 {
        Mat4::look_to_rh(transform.translation, transform.forward(), transform.up())
    }

    pub fn proj(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, aspect.max(1e-6), self.near, self.far)
    }

    pub fn view_proj(&self, transform: &Transform, aspect: f32) -> Mat4 {
        self.proj(aspect) * self.view(transform)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_y_radians: 60f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn view_proj_is_invertible() {
        let cam = Camera::default();
        let transform = Transform::at(Vec3::new(0.0, 2.0, 5.0)).looking_at(Vec3::ZERO, Vec3::Y);
        let vp = cam.view_proj(&transform, 16.0 / 9.0);
        let id = vp * vp.inverse();
        assert!(id.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn view_looks_down_transform_forward() {
        let cam = Camera::default();
        let transform = Transform::at(Vec3::new(0.0, 0.0, 5.0)); // default faces -Z
        let view = cam.view(&transform);
        let ahead = view.transform_point3(Vec3::new(0.0, 0.0, 0.0));
        // Point at the origin sits in front of the camera (negative view-space z)
        assert!(ahead.z < 0.0);
    }
}

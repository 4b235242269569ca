use glam::{Mat4, Quat, Vec3};

/// Position/rotation/scale triple.  The model matrix is derived on demand and
/// never cached; composition order is scale, then rotate, then translate.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Forward axis of this transform (-Z rotated into world space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Orient the transform to look at `target` from its current position.
    pub fn looking_at(mut self, target: Vec3, up: Vec3) -> Self {
        let forward = (target - self.translation).normalize_or_zero();
        if forward.length_squared() > 0.0 {
            self.rotation = Quat::from_mat4(&Mat4::look_to_rh(Vec3::ZERO, forward, up)).inverse();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        let m = Transform::default().matrix();
        assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn scale_applies_before_translation() {
        let tr = Transform::from_trs(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY, Vec3::splat(2.0));
        let p = tr.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        // (1,0,0) scales to (2,0,0), then translates to (3,2,3)
        assert!(p.abs_diff_eq(Vec3::new(3.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn rotation_applies_between_scale_and_translation() {
        let rot = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let tr = Transform::from_trs(Vec3::new(0.0, 0.0, 5.0), rot, Vec3::splat(3.0));
        let p = tr.matrix().transform_point3(Vec3::X);
        // (1,0,0) -> scale (3,0,0) -> rotate about Y (0,0,-3) -> translate (0,0,2)
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-5));
    }
}

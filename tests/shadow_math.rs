use glam::{Mat4, Vec3, Vec4};
use wgpu_forward::renderer::lights::{light_space_matrix, DirectionalLight};

const EPSILON: f32 = 1e-5;

fn project_shadow(matrix: Mat4, world_pos: Vec3) -> Vec3 {
    let clip = matrix * world_pos.extend(1.0);
    if clip.w <= 0.0 {
        return Vec3::splat(-1.0);
    }
    let ndc = clip.truncate() / clip.w;
    Vec3::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5, ndc.z)
}

#[test]
fn scene_points_project_inside_the_shadow_map() {
    let light =
        DirectionalLight::new(Vec3::new(0.4, -1.0, 0.2), Vec3::ONE, 1.0).with_shadows();
    let matrix = light_space_matrix(&[light]);

    let points = [
        Vec3::new(-3.5, 0.0, -2.0),
        Vec3::new(2.0, 1.0, 4.0),
        Vec3::new(4.5, -0.5, -3.0),
    ];

    for point in points {
        let projected = project_shadow(matrix, point);
        assert!(projected.x >= -EPSILON && projected.x <= 1.0 + EPSILON);
        assert!(projected.y >= -EPSILON && projected.y <= 1.0 + EPSILON);
        assert!(projected.z >= -EPSILON && projected.z <= 1.0 + EPSILON);
    }
}

#[test]
fn shadow_texture_axis_is_flipped_from_clip_space() {
    let light = DirectionalLight::new(Vec3::new(0.0, -1.0, 0.0), Vec3::ONE, 1.0).with_shadows();
    let matrix = light_space_matrix(&[light]);

    // Straight-down light falls back to +Z as its up axis
    let top_world = Vec3::Z * 5.0;
    let bottom_world = Vec3::NEG_Z * 5.0;

    let clip_top = matrix * top_world.extend(1.0);
    let clip_bottom = matrix * bottom_world.extend(1.0);
    let ndc_top = clip_top / clip_top.w;
    let ndc_bottom = clip_bottom / clip_bottom.w;
    assert!(ndc_top.y > ndc_bottom.y);

    let tex_top = project_shadow(matrix, top_world);
    let tex_bottom = project_shadow(matrix, bottom_world);
    assert!(tex_top.y < tex_bottom.y);
}

#[test]
fn shadow_matrix_is_identity_without_a_caster() {
    let lights = [
        DirectionalLight::new(Vec3::new(0.3, -1.0, 0.0), Vec3::ONE, 1.0),
        DirectionalLight::new(Vec3::new(-0.3, -1.0, 0.2), Vec3::ONE, 0.5),
    ];
    assert_eq!(light_space_matrix(&lights), Mat4::IDENTITY);

    let origin = light_space_matrix(&lights) * Vec4::new(1.0, 2.0, 3.0, 1.0);
    assert_eq!(origin, Vec4::new(1.0, 2.0, 3.0, 1.0));
}

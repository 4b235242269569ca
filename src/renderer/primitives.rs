use super::vertex::{v, Vertex};

/// Unit cube centered at the origin with per-face normals and UVs.
pub fn cube_mesh() -> (Vec<Vertex>, Vec<u32>) {
    let vertices = vec![
        // +X
        v([0.5, -0.5, -0.5], [1.0, 0.0, 0.0], [0.0, 1.0]),
        v([0.5, 0.5, -0.5], [1.0, 0.0, 0.0], [0.0, 0.0]),
        v([0.5, 0.5, 0.5], [1.0, 0.0, 0.0], [1.0, 0.0]),
        v([0.5, -0.5, 0.5], [1.0, 0.0, 0.0], [1.0, 1.0]),
        // -X
        v([-0.5, -0.5, 0.5], [-1.0, 0.0, 0.0], [0.0, 1.0]),
        v([-0.5, 0.5, 0.5], [-1.0, 0.0, 0.0], [0.0, 0.0]),
        v([-0.5, 0.5, -0.5], [-1.0, 0.0, 0.0], [1.0, 0.0]),
        v([-0.5, -0.5, -0.5], [-1.0, 0.0, 0.0], [1.0, 1.0]),
        // +Y
        v([-0.5, 0.5, -0.5], [0.0, 1.0, 0.0], [0.0, 1.0]),
        v([-0.5, 0.5, 0.5], [0.0, 1.0, 0.0], [0.0, 0.0]),
        v([0.5, 0.5, 0.5], [0.0, 1.0, 0.0], [1.0, 0.0]),
        v([0.5, 0.5, -0.5], [0.0, 1.0, 0.0], [1.0, 1.0]),
        // -Y
        v([-0.5, -0.5, 0.5], [0.0, -1.0, 0.0], [0.0, 1.0]),
        v([-0.5, -0.5, -0.5], [0.0, -1.0, 0.0], [0.0, 0.0]),
        v([0.5, -0.5, -0.5], [0.0, -1.0, 0.0], [1.0, 0.0]),
        v([0.5, -0.5, 0.5], [0.0, -1.0, 0.0], [1.0, 1.0]),
        // +Z
        v([-0.5, -0.5, 0.5], [0.0, 0.0, 1.0], [0.0, 1.0]),
        v([0.5, -0.5, 0.5], [0.0, 0.0, 1.0], [1.0, 1.0]),
        v([0.5, 0.5, 0.5], [0.0, 0.0, 1.0], [1.0, 0.0]),
        v([-0.5, 0.5, 0.5], [0.0, 0.0, 1.0], [0.0, 0.0]),
        // -Z
        v([0.5, -0.5, -0.5], [0.0, 0.0, -1.0], [0.0, 1.0]),
        v([-0.5, -0.5, -0.5], [0.0, 0.0, -1.0], [1.0, 1.0]),
        v([-0.5, 0.5, -0.5], [0.0, 0.0, -1.0], [1.0, 0.0]),
        v([0.5, 0.5, -0.5], [0.0, 0.0, -1.0], [0.0, 0.0]),
    ];

    let mut indices = Vec::with_capacity(36);
    for face in 0..6u32 {
        let base = face * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

/// Flat XZ plane of the given half-extent, facing +Y.
pub fn plane_mesh(half_extent: f32) -> (Vec<Vertex>, Vec<u32>) {
    let e = half_extent;
    let vertices = vec![
        v([-e, 0.0, -e], [0.0, 1.0, 0.0], [0.0, 0.0]),
        v([-e, 0.0, e], [0.0, 1.0, 0.0], [0.0, 1.0]),
        v([e, 0.0, e], [0.0, 1.0, 0.0], [1.0, 1.0]),
        v([e, 0.0, -e], [0.0, 1.0, 0.0], [1.0, 0.0]),
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];
    (vertices, indices)
}

/// Position-only cube used by the environment pass, 36 vertices, no indices.
#[rustfmt::skip]
pub const SKYBOX_VERTICES: [f32; 108] = [
    -1.0,  1.0, -1.0,
    -1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,
     1.0,  1.0, -1.0,
    -1.0,  1.0, -1.0,

    -1.0, -1.0,  1.0,
    -1.0, -1.0, -1.0,
    -1.0,  1.0, -1.0,
    -1.0,  1.0, -1.0,
    -1.0,  1.0,  1.0,
    -1.0, -1.0,  1.0,

     1.0, -1.0, -1.0,
     1.0, -1.0,  1.0,
     1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,
     1.0,  1.0, -1.0,
     1.0, -1.0, -1.0,

    -1.0, -1.0,  1.0,
    -1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,
     1.0, -1.0,  1.0,
    -1.0, -1.0,  1.0,

    -1.0,  1.0, -1.0,
     1.0,  1.0, -1.0,
     1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,
    -1.0,  1.0,  1.0,
    -1.0,  1.0, -1.0,

    -1.0, -1.0, -1.0,
    -1.0, -1.0,  1.0,
     1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,
    -1.0, -1.0,  1.0,
     1.0, -1.0,  1.0,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_full_index_coverage() {
        let (vertices, indices) = cube_mesh();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn skybox_cube_is_36_vertices() {
        assert_eq!(SKYBOX_VERTICES.len(), 36 * 3);
    }
}

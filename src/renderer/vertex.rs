use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use std::mem;

use crate::renderer::gpu::{AttributeKind, VertexAttribute, VertexLayout};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const STRIDE: u64 = mem::size_of::<Vertex>() as u64;

    pub fn attributes() -> [VertexAttribute; 3] {
        [
            VertexAttribute {
                location: 0,
                components: 3,
                kind: AttributeKind::Float32,
                normalized: false,
                offset: 0,
            },
            VertexAttribute {
                location: 1,
                components: 3,
                kind: AttributeKind::Float32,
                normalized: false,
                offset: 12,
            },
            VertexAttribute {
                location: 2,
                components: 2,
                kind: AttributeKind::Float32,
                normalized: false,
                offset: 24,
            },
        ]
    }

    pub fn layout() -> VertexLayout {
        VertexLayout::new(&Self::attributes(), Self::STRIDE)
    }
}

#[inline]
pub fn v(pos: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Vertex {
    Vertex { pos, normal, uv }
}

/// Per-instance model matrix, fed to the vertex stage as four vec4 columns
/// at instance step rate (locations 3..=6).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    pub const STRIDE: u64 = mem::size_of::<InstanceRaw>() as u64;

    pub fn from_matrix(matrix: Mat4) -> Self {
        Self {
            model: matrix.to_cols_array_2d(),
        }
    }

    pub fn attributes() -> [VertexAttribute; 4] {
        let column = |location: u32| VertexAttribute {
            location,
            components: 4,
            kind: AttributeKind::Float32,
            normalized: false,
            offset: (location as u64 - 3) * 16,
        };
        [column(3), column(4), column(5), column(6)]
    }

    pub fn layout() -> VertexLayout {
        VertexLayout::per_instance(&Self::attributes(), Self::STRIDE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_stride_matches_struct_size() {
        assert_eq!(Vertex::STRIDE, std::mem::size_of::<Vertex>() as u64);
        assert_eq!(InstanceRaw::STRIDE, 64);
    }

    #[test]
    fn instance_columns_are_contiguous() {
        let attrs = InstanceRaw::attributes();
        for (i, attr) in attrs.iter().enumerate() {
            assert_eq!(attr.offset, i as u64 * 16);
            assert_eq!(attr.location, 3 + i as u32);
        }
    }
}

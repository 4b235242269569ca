use crate::renderer::gpu::{BufferKind, GpuBuffer, VertexLayout};
use crate::renderer::Vertex;

/// GPU-resident geometry: a vertex buffer, an optional index buffer, the
/// layout describing the vertex stream, and the element count for draws.
/// Owned by the asset registry; referenced everywhere else by handle.
pub struct Mesh {
    vertex_buffer: GpuBuffer,
    index_buffer: Option<GpuBuffer>,
    layout: VertexLayout,
    index_count: u32,
}

impl Mesh {
    pub fn from_vertices(device: &wgpu::Device, vertices: &[Vertex], indices: &[u32]) -> Self {
        let vertex_buffer =
            GpuBuffer::with_data(device, BufferKind::Vertex, bytemuck::cast_slice(vertices));

        let index_buffer = if indices.is_empty() {
            None
        } else {
            Some(GpuBuffer::with_data(
                device,
                BufferKind::Index,
                bytemuck::cast_slice(indices),
            ))
        };

        let index_count = if indices.is_empty() {
            vertices.len() as u32
        } else {
            indices.len() as u32
        };

        Self {
            vertex_buffer,
            index_buffer,
            layout: Vertex::layout(),
            index_count,
        }
    }

    /// Replace the vertex stream in place.  The new data must fit the
    /// original allocation; geometry that changes size needs a new mesh.
    pub fn reupload(&self, queue: &wgpu::Queue, vertices: &[Vertex]) -> Result<(), crate::renderer::RenderError> {
        self.vertex_buffer
            .upload(queue, bytemuck::cast_slice(vertices))
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        self.vertex_buffer.raw()
    }

    pub fn index_buffer(&self) -> Option<&wgpu::Buffer> {
        self.index_buffer.as_ref().map(GpuBuffer::raw)
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn index_format(&self) -> wgpu::IndexFormat {
        wgpu::IndexFormat::Uint32
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

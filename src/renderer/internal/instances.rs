use glam::Mat4;

use crate::renderer::error::RenderError;
use crate::renderer::gpu::{BufferKind, GpuBuffer};
use crate::renderer::vertex::InstanceRaw;

/// Fixed-capacity GPU storage for per-instance model matrices, bound as an
/// instance-rate vertex buffer.  Each batch claims a disjoint range per
/// frame; writes are deferred to submission, so ranges never alias within a
/// frame.  Overflow is a hard error for the offending batch, never a silent
/// truncation.
pub(crate) struct InstanceBuffer {
    buffer: GpuBuffer,
    capacity: u32,
    cursor: u32,
    scratch: Vec<InstanceRaw>,
}

impl InstanceBuffer {
    pub(crate) fn new(device: &wgpu::Device, capacity: u32) -> Self {
        let buffer = GpuBuffer::allocate(
            device,
            BufferKind::Vertex,
            capacity as u64 * InstanceRaw::STRIDE,
        );
        Self {
            buffer,
            capacity,
            cursor: 0,
            scratch: Vec::with_capacity(capacity as usize),
        }
    }

    pub(crate) fn begin_frame(&mut self) {
        self.cursor = 0;
    }

    /// Upload one batch's matrices, returning the byte range to bind for its
    /// draw.
    pub(crate) fn push(
        &mut self,
        queue: &wgpu::Queue,
        matrices: &[Mat4],
    ) -> Result<std::ops::Range<u64>, RenderError> {
        let requested = matrices.len() as u32;
        let available = self.capacity - self.cursor;
        if requested > available {
            return Err(RenderError::InstanceCapacity {
                requested,
                available,
                capacity: self.capacity,
            });
        }

        self.scratch.clear();
        self.scratch
            .extend(matrices.iter().map(|m| InstanceRaw::from_matrix(*m)));

        let offset = self.cursor as u64 * InstanceRaw::STRIDE;
        self.buffer
            .upload_at(queue, offset, bytemuck::cast_slice(&self.scratch))?;
        self.cursor += requested;

        Ok(offset..offset + requested as u64 * InstanceRaw::STRIDE)
    }

    pub(crate) fn buffer(&self) -> &wgpu::Buffer {
        self.buffer.raw()
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }
}

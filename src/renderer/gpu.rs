use wgpu::util::DeviceExt;

use crate::renderer::error::RenderError;

/// What a buffer will be bound as.  Transfer-destination usage is always
/// included so contents can be replaced after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
    Storage,
}

impl BufferKind {
    fn usages(self) -> wgpu::BufferUsages {
        let base = match self {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::Uniform => wgpu::BufferUsages::UNIFORM,
            BufferKind::Storage => wgpu::BufferUsages::STORAGE,
        };
        base | wgpu::BufferUsages::COPY_DST
    }

    fn label(self) -> &'static str {
        match self {
            BufferKind::Vertex => "VertexBuffer",
            BufferKind::Index => "IndexBuffer",
            BufferKind::Uniform => "UniformBuffer",
            BufferKind::Storage => "StorageBuffer",
        }
    }
}

/// A GPU buffer with a fixed byte capacity.  Uploads never grow the
/// allocation; writing past the end is a hard error surfaced to the caller.
pub struct GpuBuffer {
    raw: wgpu::Buffer,
    capacity: u64,
    kind: BufferKind,
}

impl GpuBuffer {
    pub fn allocate(device: &wgpu::Device, kind: BufferKind, capacity: u64) -> Self {
        let raw = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(kind.label()),
            size: capacity,
            usage: kind.usages(),
            mapped_at_creation: false,
        });
        Self {
            raw,
            capacity,
            kind,
        }
    }

    /// Create a buffer sized to, and initialized with, `contents`.
    pub fn with_data(device: &wgpu::Device, kind: BufferKind, contents: &[u8]) -> Self {
        let raw = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(kind.label()),
            contents,
            usage: kind.usages(),
        });
        Self {
            raw,
            capacity: contents.len() as u64,
            kind,
        }
    }

    /// Replace the buffer contents from the start.
    pub fn upload(&self, queue: &wgpu::Queue, data: &[u8]) -> Result<(), RenderError> {
        self.upload_at(queue, 0, data)
    }

    /// Write `data` at a byte offset.  The write must land entirely inside
    /// the fixed capacity.
    pub fn upload_at(
        &self,
        queue: &wgpu::Queue,
        offset: u64,
        data: &[u8],
    ) -> Result<(), RenderError> {
        check_capacity(self.capacity, offset, data.len() as u64)?;
        if !data.is_empty() {
            queue.write_buffer(&self.raw, offset, data);
        }
        Ok(())
    }

    pub fn raw(&self) -> &wgpu::Buffer {
        &self.raw
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }
}

pub(crate) fn check_capacity(capacity: u64, offset: u64, size: u64) -> Result<(), RenderError> {
    let end = offset.checked_add(size);
    match end {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(RenderError::BufferCapacity {
            size: offset.saturating_add(size),
            capacity,
        }),
    }
}

/// Scalar type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Float32,
    Uint32,
    Sint32,
    Unorm8,
}

/// One attribute of a vertex layout: shader location, component count,
/// scalar type, normalization flag and byte offset within the stride.
#[derive(Debug, Clone, Copy)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u8,
    pub kind: AttributeKind,
    pub normalized: bool,
    pub offset: u64,
}

impl VertexAttribute {
    fn format(&self) -> wgpu::VertexFormat {
        use wgpu::VertexFormat as F;
        match (self.kind, self.components, self.normalized) {
            (AttributeKind::Float32, 1, _) => F::Float32,
            (AttributeKind::Float32, 2, _) => F::Float32x2,
            (AttributeKind::Float32, 3, _) => F::Float32x3,
            (AttributeKind::Float32, 4, _) => F::Float32x4,
            (AttributeKind::Uint32, 1, _) => F::Uint32,
            (AttributeKind::Uint32, 2, _) => F::Uint32x2,
            (AttributeKind::Uint32, 4, _) => F::Uint32x4,
            (AttributeKind::Sint32, 1, _) => F::Sint32,
            (AttributeKind::Sint32, 2, _) => F::Sint32x2,
            (AttributeKind::Sint32, 4, _) => F::Sint32x4,
            (AttributeKind::Unorm8, 4, true) => F::Unorm8x4,
            (AttributeKind::Unorm8, 4, false) => F::Uint8x4,
            (kind, components, _) => {
                log::warn!(
                    "Unsupported vertex attribute {:?}x{}, substituting Float32",
                    kind,
                    components
                );
                F::Float32
            }
        }
    }
}

/// An attribute set bound to a vertex buffer slot.  Owns the translated
/// attribute array so the wgpu layout can borrow from it at pipeline
/// creation and bind time.
pub struct VertexLayout {
    attributes: Vec<wgpu::VertexAttribute>,
    stride: u64,
    step_mode: wgpu::VertexStepMode,
}

impl VertexLayout {
    pub fn new(attributes: &[VertexAttribute], stride: u64) -> Self {
        Self::with_step_mode(attributes, stride, wgpu::VertexStepMode::Vertex)
    }

    pub fn per_instance(attributes: &[VertexAttribute], stride: u64) -> Self {
        Self::with_step_mode(attributes, stride, wgpu::VertexStepMode::Instance)
    }

    fn with_step_mode(
        attributes: &[VertexAttribute],
        stride: u64,
        step_mode: wgpu::VertexStepMode,
    ) -> Self {
        let attributes = attributes
            .iter()
            .map(|attr| wgpu::VertexAttribute {
                format: attr.format(),
                offset: attr.offset,
                shader_location: attr.location,
            })
            .collect();
        Self {
            attributes,
            stride,
            step_mode,
        }
    }

    pub fn buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_check_accepts_exact_fit() {
        assert!(check_capacity(64, 0, 64).is_ok());
        assert!(check_capacity(64, 32, 32).is_ok());
    }

    #[test]
    fn capacity_check_rejects_overflow() {
        assert!(check_capacity(64, 0, 65).is_err());
        assert!(check_capacity(64, 33, 32).is_err());
        assert!(check_capacity(64, u64::MAX, 1).is_err());
    }

    #[test]
    fn attribute_formats_translate() {
        let attr = VertexAttribute {
            location: 0,
            components: 3,
            kind: AttributeKind::Float32,
            normalized: false,
            offset: 0,
        };
        assert_eq!(attr.format(), wgpu::VertexFormat::Float32x3);

        let color = VertexAttribute {
            location: 1,
            components: 4,
            kind: AttributeKind::Unorm8,
            normalized: true,
            offset: 12,
        };
        assert_eq!(color.format(), wgpu::VertexFormat::Unorm8x4);
    }
}

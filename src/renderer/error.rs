use thiserror::Error;

/// Failure modes of the rendering core.  Initialization errors abort
/// construction; everything else is logged by the call site and degrades the
/// frame instead of unwinding through the render loop.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no compatible GPU adapter found")]
    AdapterNotFound,

    #[error("failed to acquire GPU device: {0}")]
    DeviceRequest(String),

    #[error("failed to create render surface: {0}")]
    SurfaceCreation(String),

    #[error("upload of {size} bytes exceeds buffer capacity of {capacity} bytes")]
    BufferCapacity { size: u64, capacity: u64 },

    #[error(
        "batch of {requested} instances does not fit the instance buffer \
         ({available} of {capacity} slots free)"
    )]
    InstanceCapacity {
        requested: u32,
        available: u32,
        capacity: u32,
    },

    #[error("unrecognized cubemap atlas layout: {width}x{height}")]
    AtlasLayout { width: u32, height: u32 },

    #[error("cubemap face {face} rect at ({x},{y}) size {w}x{h} exceeds atlas bounds {width}x{height}")]
    AtlasFaceBounds {
        face: usize,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        width: u32,
        height: u32,
    },

    #[error("unsupported channel count {channels} for texture '{name}'")]
    TextureChannels { channels: u8, name: String },

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
}

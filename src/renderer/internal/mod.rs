pub(crate) mod context;
pub(crate) mod instances;
pub(crate) mod pipeline;
pub(crate) mod shadows;

pub(crate) use context::RenderContext;
pub(crate) use instances::InstanceBuffer;
pub(crate) use pipeline::{ForwardPipelines, FrameBindings, MaterialBinder};
pub(crate) use shadows::{ShadowDraw, ShadowResources};

use std::mem;
use std::num::NonZeroU64;
use std::ops::Range;

use glam::Mat4;

use crate::asset::{Assets, Handle, Mesh};
use crate::renderer::gpu::{BufferKind, GpuBuffer};
use crate::renderer::internal::instances::InstanceBuffer;
use crate::renderer::uniforms::ShadowUniform;
use crate::renderer::vertex::InstanceRaw;
use crate::renderer::Vertex;

/// One shadow batch ready to draw: its mesh and its claimed slice of the
/// shadow instance buffer.
pub(crate) struct ShadowDraw {
    pub(crate) mesh: Handle<Mesh>,
    pub(crate) range: Range<u64>,
    pub(crate) count: u32,
}

/// The fixed-resolution depth-only target, its comparison sampler, the
/// light-space uniform and the depth-only pipeline.  Created once at
/// initialization and reused every frame.
pub(crate) struct ShadowResources {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    uniform: GpuBuffer,
    uniform_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
    size: u32,
}

impl ShadowResources {
    pub(crate) fn new(device: &wgpu::Device, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ShadowMap"),
            size: wgpu::Extent3d {
                width: size.max(1),
                height: size.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("ShadowSampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ShadowUniformLayout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(mem::size_of::<ShadowUniform>() as u64),
                },
                count: None,
            }],
        });

        let uniform = GpuBuffer::allocate(
            device,
            BufferKind::Uniform,
            mem::size_of::<ShadowUniform>() as u64,
        );

        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ShadowUniformBindGroup"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.raw().as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ShadowShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shader/shadow.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ShadowPipelineLayout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = Vertex::layout();
        let instance_layout = InstanceRaw::layout();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("ShadowPipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout.buffer_layout(), instance_layout.buffer_layout()],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::info!("Shadow map target created at {0}x{0}", size.max(1));

        Self {
            _texture: texture,
            view,
            sampler,
            uniform,
            uniform_group,
            pipeline,
            size: size.max(1),
        }
    }

    pub(crate) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub(crate) fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub(crate) fn size(&self) -> u32 {
        self.size
    }

    pub(crate) fn write_light_matrix(&self, queue: &wgpu::Queue, matrix: Mat4) {
        let uniform = ShadowUniform {
            light_matrix: matrix.to_cols_array_2d(),
        };
        if let Err(err) = self.uniform.upload(queue, bytemuck::bytes_of(&uniform)) {
            log::error!("Failed to upload light-space matrix: {err}");
        }
    }

    /// Record the depth-only pass: clear, then one instanced draw per batch.
    pub(crate) fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        assets: &Assets,
        instances: &InstanceBuffer,
        draws: &[ShadowDraw],
    ) {
        let mut pass = self.begin(encoder);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_group, &[]);

        for draw in draws {
            let Some(mesh) = assets.meshes.get(draw.mesh) else {
                log::warn!("Skipping shadow batch with invalid mesh handle");
                continue;
            };

            pass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
            pass.set_vertex_buffer(1, instances.buffer().slice(draw.range.clone()));
            match mesh.index_buffer() {
                Some(index_buffer) => {
                    pass.set_index_buffer(index_buffer.slice(..), mesh.index_format());
                    pass.draw_indexed(0..mesh.index_count(), 0, 0..draw.count);
                }
                None => pass.draw(0..mesh.index_count(), 0..draw.count),
            }
        }
    }

    /// The pass still executes when nothing was recorded, leaving a cleared
    /// depth target that samples as fully lit.
    pub(crate) fn record_empty(&self, encoder: &mut wgpu::CommandEncoder) {
        let _pass = self.begin(encoder);
    }

    fn begin<'encoder>(
        &self,
        encoder: &'encoder mut wgpu::CommandEncoder,
    ) -> wgpu::RenderPass<'encoder> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ShadowPass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}

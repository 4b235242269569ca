use std::collections::HashMap;
use std::mem;
use std::num::NonZeroU64;

use crate::asset::{Assets, Handle};
use crate::renderer::gpu::{BufferKind, GpuBuffer};
use crate::renderer::internal::context::RenderContext;
use crate::renderer::internal::shadows::ShadowResources;
use crate::renderer::lights::LightsUniform;
use crate::renderer::uniforms::{GlobalsUniform, MaterialUniform, SkyUniform};
use crate::renderer::vertex::InstanceRaw;
use crate::renderer::{Depth, Material, MaterialFlags, Skybox, Texture, Vertex};

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages, size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size),
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Bind group layouts plus the forward and environment pipelines.  The
/// shadow pipeline lives with its target in [`ShadowResources`].
pub(crate) struct ForwardPipelines {
    pub(crate) globals_layout: wgpu::BindGroupLayout,
    pub(crate) lights_layout: wgpu::BindGroupLayout,
    pub(crate) material_layout: wgpu::BindGroupLayout,
    pub(crate) sky_layout: wgpu::BindGroupLayout,
    pub(crate) forward: wgpu::RenderPipeline,
    pub(crate) sky: wgpu::RenderPipeline,
}

impl ForwardPipelines {
    pub(crate) fn new(context: &RenderContext, skybox: &Skybox) -> Self {
        let device = &context.device;

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("GlobalsBindLayout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                mem::size_of::<GlobalsUniform>() as u64,
            )],
        });

        let lights_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("LightsBindLayout"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::FRAGMENT,
                    mem::size_of::<LightsUniform>() as u64,
                ),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("MaterialBindLayout"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::FRAGMENT,
                    mem::size_of::<MaterialUniform>() as u64,
                ),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_entry(2),
                texture_entry(3),
                texture_entry(4),
                texture_entry(5),
                texture_entry(6),
                texture_entry(7),
            ],
        });

        let sky_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SkyBindLayout"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    mem::size_of::<SkyUniform>() as u64,
                ),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let forward = Self::forward_pipeline(
            context,
            &globals_layout,
            &lights_layout,
            &material_layout,
        );
        let sky = Self::sky_pipeline(context, &sky_layout, skybox);

        Self {
            globals_layout,
            lights_layout,
            material_layout,
            sky_layout,
            forward,
            sky,
        }
    }

    fn forward_pipeline(
        context: &RenderContext,
        globals_layout: &wgpu::BindGroupLayout,
        lights_layout: &wgpu::BindGroupLayout,
        material_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let device = &context.device;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ForwardShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shader/forward.wgsl").into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ForwardPipelineLayout"),
            bind_group_layouts: &[globals_layout, lights_layout, material_layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = Vertex::layout();
        let instance_layout = InstanceRaw::layout();

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("ForwardPipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout.buffer_layout(), instance_layout.buffer_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Depth::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn sky_pipeline(
        context: &RenderContext,
        sky_layout: &wgpu::BindGroupLayout,
        skybox: &Skybox,
    ) -> wgpu::RenderPipeline {
        let device = &context.device;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("SkyShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shader/sky.wgsl").into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SkyPipelineLayout"),
            bind_group_layouts: &[sky_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("SkyPipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[skybox.vertex_layout().buffer_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            // Less-equal so the far-plane sky is not culled by geometry at
            // identical depth; depth writes stay off.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Depth::FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

/// Frame-global uniform buffers and the bind groups that expose them plus
/// the shadow map and environment cubemap.
pub(crate) struct FrameBindings {
    pub(crate) globals: GpuBuffer,
    pub(crate) lights: GpuBuffer,
    pub(crate) sky: GpuBuffer,
    pub(crate) globals_group: wgpu::BindGroup,
    pub(crate) lights_group: wgpu::BindGroup,
    pub(crate) sky_group: wgpu::BindGroup,
}

impl FrameBindings {
    pub(crate) fn new(
        device: &wgpu::Device,
        pipelines: &ForwardPipelines,
        shadows: &ShadowResources,
        skybox: &Skybox,
    ) -> Self {
        let globals = GpuBuffer::allocate(
            device,
            BufferKind::Uniform,
            mem::size_of::<GlobalsUniform>() as u64,
        );
        let lights = GpuBuffer::allocate(
            device,
            BufferKind::Uniform,
            mem::size_of::<LightsUniform>() as u64,
        );
        let sky = GpuBuffer::allocate(
            device,
            BufferKind::Uniform,
            mem::size_of::<SkyUniform>() as u64,
        );

        let globals_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("GlobalsBindGroup"),
            layout: &pipelines.globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.raw().as_entire_binding(),
            }],
        });

        let (lights_group, sky_group) =
            Self::environment_groups(device, pipelines, shadows, skybox, &lights, &sky);

        Self {
            globals,
            lights,
            sky,
            globals_group,
            lights_group,
            sky_group,
        }
    }

    /// Rebuild the groups that reference the environment cubemap, after
    /// `set_environment` swapped the skybox.
    pub(crate) fn rebuild_environment(
        &mut self,
        device: &wgpu::Device,
        pipelines: &ForwardPipelines,
        shadows: &ShadowResources,
        skybox: &Skybox,
    ) {
        let (lights_group, sky_group) =
            Self::environment_groups(device, pipelines, shadows, skybox, &self.lights, &self.sky);
        self.lights_group = lights_group;
        self.sky_group = sky_group;
    }

    fn environment_groups(
        device: &wgpu::Device,
        pipelines: &ForwardPipelines,
        shadows: &ShadowResources,
        skybox: &Skybox,
        lights: &GpuBuffer,
        sky: &GpuBuffer,
    ) -> (wgpu::BindGroup, wgpu::BindGroup) {
        let lights_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("LightsBindGroup"),
            layout: &pipelines.lights_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: lights.raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(shadows.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(shadows.sampler()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(skybox.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(skybox.sampler()),
                },
            ],
        });

        let sky_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SkyBindGroup"),
            layout: &pipelines.sky_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: sky.raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(skybox.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(skybox.sampler()),
                },
            ],
        });

        (lights_group, sky_group)
    }
}

struct MaterialBinding {
    _uniform: GpuBuffer,
    group: wgpu::BindGroup,
}

/// Maps material parameters and texture maps onto the material bind group.
/// Groups are memoized per material handle: the first use resolves every
/// texture by handle and builds the group, later uses hit the cache.  An
/// enabled map whose texture is missing logs a warning and binds the neutral
/// fallback instead; this is never fatal.
pub(crate) struct MaterialBinder {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    neutral: Texture,
    neutral_normal: Texture,
    cache: HashMap<Handle<Material>, MaterialBinding>,
}

impl MaterialBinder {
    pub(crate) fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: wgpu::BindGroupLayout,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("MaterialSampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let neutral = Texture::neutral(device, queue, [255, 255, 255, 255]);
        // Flat +Z tangent-space normal
        let neutral_normal = Texture::neutral(device, queue, [128, 128, 255, 255]);

        Self {
            layout,
            sampler,
            neutral,
            neutral_normal,
            cache: HashMap::new(),
        }
    }

    /// Make sure a bind group exists for the material.  Returns false when
    /// the handle is not registered (the batch is skipped by the caller).
    pub(crate) fn ensure(
        &mut self,
        device: &wgpu::Device,
        assets: &Assets,
        handle: Handle<Material>,
    ) -> bool {
        if self.cache.contains_key(&handle) {
            return true;
        }
        let Some(material) = assets.materials.get(handle) else {
            log::warn!("Skipping batch with unregistered material handle {}", handle.index());
            return false;
        };
        let binding = self.build(device, assets, handle, material);
        self.cache.insert(handle, binding);
        true
    }

    pub(crate) fn cached(&self, handle: Handle<Material>) -> Option<&wgpu::BindGroup> {
        self.cache.get(&handle).map(|binding| &binding.group)
    }

    /// Drop the cached group so the next use rebuilds it; called by the
    /// material edit API.
    pub(crate) fn invalidate(&mut self, handle: Handle<Material>) {
        self.cache.remove(&handle);
    }

    pub(crate) fn clear(&mut self) {
        self.cache.clear();
    }

    fn build(
        &self,
        device: &wgpu::Device,
        assets: &Assets,
        handle: Handle<Material>,
        material: &Material,
    ) -> MaterialBinding {
        let uniform_data = MaterialUniform::from_material(material);
        let uniform = GpuBuffer::with_data(
            device,
            BufferKind::Uniform,
            bytemuck::bytes_of(&uniform_data),
        );

        let slots = material.map_slots();
        let views: Vec<&wgpu::TextureView> = slots
            .iter()
            .map(|(flag, texture)| self.resolve_view(assets, handle, *flag, *texture))
            .collect();

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.raw().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
        ];
        for (i, view) in views.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 2 + i as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }

        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("MaterialBindGroup"),
            layout: &self.layout,
            entries: &entries,
        });

        MaterialBinding {
            _uniform: uniform,
            group,
        }
    }

    fn resolve_view<'a>(
        &'a self,
        assets: &'a Assets,
        material: Handle<Material>,
        flag: MaterialFlags,
        texture: Option<Handle<Texture>>,
    ) -> &'a wgpu::TextureView {
        let fallback = if flag == MaterialFlags::NORMAL_MAP {
            &self.neutral_normal.view
        } else {
            &self.neutral.view
        };

        let Some(texture) = texture else {
            return fallback;
        };

        match assets.textures.get(texture) {
            Some(found) => &found.view,
            None => {
                log::warn!(
                    "Material {} references missing texture {} for {:?}, using fallback",
                    material.index(),
                    texture.index(),
                    flag
                );
                fallback
            }
        }
    }
}

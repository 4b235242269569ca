use std::sync::Arc;

use glam::{Mat3, Mat4};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::asset::{Assets, Handle, Mesh};
use crate::renderer::batch::RenderBatcher;
use crate::renderer::error::RenderError;
use crate::renderer::gpu::{BufferKind, GpuBuffer, VertexAttribute, VertexLayout};
use crate::renderer::internal::{
    ForwardPipelines, FrameBindings, InstanceBuffer, MaterialBinder, RenderContext, ShadowDraw,
    ShadowResources,
};
use crate::renderer::lights::{DirectionalLight, LightsUniform, SpotLight};
use crate::renderer::skybox::{CubemapOrientation, Skybox};
use crate::renderer::texture::{expand_to_rgba, Texture};
use crate::renderer::uniforms::{GlobalsUniform, SkyUniform};
use crate::renderer::{Camera, Material, Vertex};
use crate::scene::Transform;
use crate::settings::RenderSettings;

/// Which pass is currently recording.  The orchestrating caller must follow
/// begin/render/end pairs; violations are logged and the call becomes a
/// no-op rather than corrupting the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassPhase {
    Idle,
    Shadow,
    Main,
    Environment,
}

struct FrameState {
    surface: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    clear_color: wgpu::Color,
    shadow_recorded: bool,
    main_recorded: bool,
}

struct MainDraw {
    mesh: Handle<Mesh>,
    material: Handle<Material>,
    range: std::ops::Range<u64>,
    count: u32,
}

/// The rendering core.  Owns every GPU resource, accumulates draw requests
/// into instanced batches, and records the shadow, main and environment
/// passes in that order each frame.  All methods run on the single render
/// thread; nothing here suspends.
pub struct Renderer {
    context: RenderContext,
    assets: Assets,
    batcher: RenderBatcher,
    pipelines: ForwardPipelines,
    binder: MaterialBinder,
    bindings: FrameBindings,
    shadows: ShadowResources,
    skybox: Skybox,
    render_instances: InstanceBuffer,
    shadow_instances: InstanceBuffer,
    frame: Option<FrameState>,
    phase: PassPhase,
    settings: RenderSettings,
    unnamed_textures: u64,
}

impl Renderer {
    /// Initialize against an existing window.  Fails when no adapter,
    /// device or surface can be acquired; the application must not proceed
    /// on error.
    pub fn new(
        window: Arc<Window>,
        size: PhysicalSize<u32>,
        settings: RenderSettings,
    ) -> Result<Self, RenderError> {
        let context = pollster::block_on(RenderContext::new(window, size, &settings))?;

        let shadows = ShadowResources::new(&context.device, settings.shadow_map_size);
        let skybox = Self::build_skybox(&context, &settings);
        let pipelines = ForwardPipelines::new(&context, &skybox);
        let binder = MaterialBinder::new(
            &context.device,
            &context.queue,
            pipelines.material_layout.clone(),
        );
        let bindings = FrameBindings::new(&context.device, &pipelines, &shadows, &skybox);
        let render_instances = InstanceBuffer::new(&context.device, settings.instance_capacity);
        let shadow_instances = InstanceBuffer::new(&context.device, settings.instance_capacity);

        log::info!(
            "Renderer initialized: {}x{}, shadow map {}, {} instance slots",
            context.config.width,
            context.config.height,
            shadows.size(),
            render_instances.capacity()
        );

        Ok(Self {
            context,
            assets: Assets::new(),
            batcher: RenderBatcher::new(),
            pipelines,
            binder,
            bindings,
            shadows,
            skybox,
            render_instances,
            shadow_instances,
            frame: None,
            phase: PassPhase::Idle,
            settings,
            unnamed_textures: 0,
        })
    }

    fn build_skybox(context: &RenderContext, settings: &RenderSettings) -> Skybox {
        let env = &settings.environment;
        if let Some(path) = &env.atlas_path {
            match image::open(path) {
                Ok(img) => {
                    let rgba = img.to_rgba8();
                    let (w, h) = rgba.dimensions();
                    match Skybox::from_atlas(
                        &context.device,
                        &context.queue,
                        &rgba,
                        w,
                        h,
                        env.orientation,
                        env.ambient,
                        env.ambient_intensity,
                    ) {
                        Ok(skybox) => return skybox,
                        Err(err) => {
                            log::error!("Failed to build skybox from {:?}: {err}", path)
                        }
                    }
                }
                Err(err) => log::error!("Failed to open environment atlas {:?}: {err}", path),
            }
        }
        Skybox::solid(
            &context.device,
            &context.queue,
            env.ambient,
            env.ambient_intensity,
        )
    }

    // --- resource registry -------------------------------------------------

    /// Upload geometry under a stable name; repeated registrations of the
    /// same name return the original handle.
    pub fn create_mesh(&mut self, name: &str, vertices: &[Vertex], indices: &[u32]) -> Handle<Mesh> {
        let device = &self.context.device;
        self.assets
            .meshes
            .insert_named(name, || Mesh::from_vertices(device, vertices, indices))
    }

    pub fn register_material(&mut self, material: Material) -> Handle<Material> {
        self.assets.materials.insert(material)
    }

    pub fn material(&self, handle: Handle<Material>) -> Option<&Material> {
        self.assets.materials.get(handle)
    }

    /// The only mutation path for materials.  Invalidates the cached GPU
    /// binding so the next draw rebuilds it.
    pub fn edit_material(&mut self, handle: Handle<Material>, edit: impl FnOnce(&mut Material)) {
        match self.assets.materials.get_mut(handle) {
            Some(material) => {
                edit(material);
                self.binder.invalidate(handle);
            }
            None => log::warn!("edit_material: unknown material handle {}", handle.index()),
        }
    }

    /// Swap the environment cubemap at runtime.  On failure the previous
    /// skybox stays active.
    pub fn set_environment(&mut self, path: &str, orientation: CubemapOrientation) {
        let img = match image::open(path) {
            Ok(img) => img.to_rgba8(),
            Err(err) => {
                log::error!("Failed to open environment atlas {path}: {err}");
                return;
            }
        };
        let (w, h) = img.dimensions();
        match Skybox::from_atlas(
            &self.context.device,
            &self.context.queue,
            &img,
            w,
            h,
            orientation,
            self.skybox.ambient(),
            self.skybox.ambient_intensity(),
        ) {
            Ok(skybox) => {
                self.skybox = skybox;
                self.bindings.rebuild_environment(
                    &self.context.device,
                    &self.pipelines,
                    &self.shadows,
                    &self.skybox,
                );
            }
            Err(err) => log::error!("Failed to build skybox from {path}: {err}"),
        }
    }

    pub fn allocate_buffer(&self, kind: BufferKind, capacity: u64) -> GpuBuffer {
        GpuBuffer::allocate(&self.context.device, kind, capacity)
    }

    pub fn create_vertex_layout(&self, attributes: &[VertexAttribute], stride: u64) -> VertexLayout {
        VertexLayout::new(attributes, stride)
    }

    // --- texture loading, memoized by path/name ----------------------------

    pub fn load_texture_from_file(&mut self, path: &str) -> Option<Handle<Texture>> {
        if let Some(handle) = self.assets.textures.lookup(path) {
            return Some(handle);
        }
        let img = match image::open(path) {
            Ok(img) => img.to_rgba8(),
            Err(err) => {
                log::error!("Failed to load texture {path}: {err}");
                return None;
            }
        };
        let (w, h) = img.dimensions();
        let texture = Texture::from_rgba8(&self.context.device, &self.context.queue, &img, w, h, path);
        let handle = self.assets.textures.insert_named(path, || texture);
        log::info!("Loaded texture: {path}");
        Some(handle)
    }

    pub fn load_texture_from_memory(&mut self, bytes: &[u8], name: &str) -> Option<Handle<Texture>> {
        let key = self.texture_key(name, "embedded_tex");
        if let Some(handle) = self.assets.textures.lookup(&key) {
            return Some(handle);
        }
        let img = match image::load_from_memory(bytes) {
            Ok(img) => img.to_rgba8(),
            Err(err) => {
                log::error!("Failed to decode texture {key}: {err}");
                return None;
            }
        };
        let (w, h) = img.dimensions();
        let texture =
            Texture::from_rgba8(&self.context.device, &self.context.queue, &img, w, h, &key);
        let handle = self.assets.textures.insert_named(&key, || texture);
        log::info!("Loaded embedded texture: {key}");
        Some(handle)
    }

    pub fn load_texture_from_raw_data(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u8,
        name: &str,
    ) -> Option<Handle<Texture>> {
        let key = self.texture_key(name, "raw");
        if let Some(handle) = self.assets.textures.lookup(&key) {
            return Some(handle);
        }
        let rgba = match expand_to_rgba(pixels, width, height, channels, &key) {
            Ok(rgba) => rgba,
            Err(err) => {
                log::error!("Failed to upload raw texture {key}: {err}");
                return None;
            }
        };
        let texture = Texture::from_rgba8(
            &self.context.device,
            &self.context.queue,
            &rgba,
            width,
            height,
            &key,
        );
        let handle = self.assets.textures.insert_named(&key, || texture);
        log::info!("Loaded raw texture: {key}");
        Some(handle)
    }

    fn texture_key(&mut self, name: &str, prefix: &str) -> String {
        if name.is_empty() {
            self.unnamed_textures += 1;
            format!("{prefix}_{}", self.unnamed_textures)
        } else {
            name.to_owned()
        }
    }

    // --- frame lifecycle ---------------------------------------------------

    /// Start a frame: clear every batch (keeping capacity), reset the
    /// instance cursors and acquire the surface texture.
    pub fn begin_frame(&mut self) -> Result<(), RenderError> {
        if self.frame.is_some() {
            log::warn!("begin_frame called while a frame is already open");
        }
        self.batcher.begin_frame();
        self.render_instances.begin_frame();
        self.shadow_instances.begin_frame();
        self.phase = PassPhase::Idle;

        let surface = match self.context.surface.get_current_texture() {
            Ok(surface) => surface,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.context.size;
                self.context.resize(size);
                self.context.surface.get_current_texture()?
            }
            Err(err) => return Err(err.into()),
        };
        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("FrameEncoder"),
            });

        self.frame = Some(FrameState {
            surface,
            view,
            encoder,
            clear_color: self.skybox.clear_color(),
            shadow_recorded: false,
            main_recorded: false,
        });
        Ok(())
    }

    /// Queue an entity for the main pass.  Unregistered handles are logged
    /// and dropped; the entity simply does not render this frame.
    pub fn add_to_render_batch(
        &mut self,
        transform: &Transform,
        mesh: Handle<Mesh>,
        material: Handle<Material>,
    ) {
        if self.assets.meshes.get(mesh).is_none() {
            log::warn!("add_to_render_batch: unknown mesh handle {}", mesh.index());
            return;
        }
        if self.assets.materials.get(material).is_none() {
            log::warn!(
                "add_to_render_batch: unknown material handle {}",
                material.index()
            );
            return;
        }
        self.batcher.add_to_render_batch(transform, mesh, material);
    }

    /// Queue an entity for the depth-only shadow pass, material-agnostic.
    pub fn add_to_shadow_batch(&mut self, transform: &Transform, mesh: Handle<Mesh>) {
        if self.assets.meshes.get(mesh).is_none() {
            log::warn!("add_to_shadow_batch: unknown mesh handle {}", mesh.index());
            return;
        }
        self.batcher.add_to_shadow_batch(transform, mesh);
    }

    // --- shadow pass -------------------------------------------------------

    pub fn begin_shadow_pass(&mut self) {
        if !self.expect_phase(PassPhase::Idle, "begin_shadow_pass") {
            return;
        }
        self.phase = PassPhase::Shadow;
    }

    /// Render every non-empty shadow batch from the light's point of view.
    /// Runs even with an identity matrix; the map then samples as lit.
    pub fn render_shadow_pass(&mut self, light_space_matrix: Mat4) {
        if !self.expect_phase(PassPhase::Shadow, "render_shadow_pass") {
            return;
        }
        if self.frame.is_none() {
            log::warn!("render_shadow_pass called outside a frame");
            return;
        }

        self.shadows
            .write_light_matrix(&self.context.queue, light_space_matrix);

        let mut draws = Vec::new();
        for batch in self.batcher.shadow_batches() {
            match self
                .shadow_instances
                .push(&self.context.queue, batch.instances)
            {
                Ok(range) => draws.push(ShadowDraw {
                    mesh: batch.mesh,
                    range,
                    count: batch.instances.len() as u32,
                }),
                Err(err) => log::error!("Shadow batch dropped: {err}"),
            }
        }

        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        self.shadows
            .record(&mut frame.encoder, &self.assets, &self.shadow_instances, &draws);
        frame.shadow_recorded = true;
    }

    pub fn end_shadow_pass(&mut self) {
        if !self.expect_phase(PassPhase::Shadow, "end_shadow_pass") {
            return;
        }
        if let Some(frame) = self.frame.as_mut() {
            if !frame.shadow_recorded {
                // Pass still executes so the depth target is cleared
                self.shadows.record_empty(&mut frame.encoder);
                frame.shadow_recorded = true;
            }
        }
        self.phase = PassPhase::Idle;
    }

    // --- main pass ---------------------------------------------------------

    pub fn begin_render_target(&mut self) {
        if !self.expect_phase(PassPhase::Idle, "begin_render_target") {
            return;
        }
        if let Some(frame) = self.frame.as_mut() {
            frame.clear_color = self.skybox.clear_color();
        }
        self.phase = PassPhase::Main;
    }

    /// Record the shaded pass: one instanced draw per non-empty batch, the
    /// material re-bound per batch, shadow map and environment cubemap at
    /// their reserved bindings.  Batch order is unspecified (opaque only).
    pub fn render_main_target(
        &mut self,
        camera: &Camera,
        camera_transform: &Transform,
        light_space_matrix: Mat4,
        directional_lights: &[DirectionalLight],
        spot_lights: &[(Transform, SpotLight)],
    ) {
        if !self.expect_phase(PassPhase::Main, "render_main_target") {
            return;
        }
        if self.frame.is_none() {
            log::warn!("render_main_target called outside a frame");
            return;
        }

        let view = camera.view(camera_transform);
        let proj = camera.proj(self.context.aspect_ratio());
        let globals = GlobalsUniform::new(
            view,
            proj,
            light_space_matrix,
            camera_transform.translation,
        );
        if let Err(err) = self
            .bindings
            .globals
            .upload(&self.context.queue, bytemuck::bytes_of(&globals))
        {
            log::error!("Failed to upload frame globals: {err}");
        }

        let mut lights = LightsUniform::build(directional_lights, spot_lights);
        let ambient = self.skybox.ambient() * self.skybox.ambient_intensity();
        lights.ambient = [ambient.x, ambient.y, ambient.z, 1.0];
        if let Err(err) = self
            .bindings
            .lights
            .upload(&self.context.queue, bytemuck::bytes_of(&lights))
        {
            log::error!("Failed to upload lights: {err}");
        }

        // Upload instances and resolve material bindings before the pass
        // opens; inside it everything is borrowed immutably.
        let mut draws = Vec::new();
        for batch in self.batcher.render_batches() {
            if !self
                .binder
                .ensure(&self.context.device, &self.assets, batch.material)
            {
                continue;
            }
            match self
                .render_instances
                .push(&self.context.queue, batch.instances)
            {
                Ok(range) => draws.push(MainDraw {
                    mesh: batch.mesh,
                    material: batch.material,
                    range,
                    count: batch.instances.len() as u32,
                }),
                Err(err) => log::error!("Render batch dropped: {err}"),
            }
        }

        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("MainPass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(frame.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.context.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipelines.forward);
        pass.set_bind_group(0, &self.bindings.globals_group, &[]);
        pass.set_bind_group(1, &self.bindings.lights_group, &[]);

        for draw in &draws {
            let Some(mesh) = self.assets.meshes.get(draw.mesh) else {
                log::warn!("Skipping batch with invalid mesh handle");
                continue;
            };
            let Some(material_group) = self.binder.cached(draw.material) else {
                continue;
            };

            pass.set_bind_group(2, material_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
            pass.set_vertex_buffer(1, self.render_instances.buffer().slice(draw.range.clone()));
            match mesh.index_buffer() {
                Some(index_buffer) => {
                    pass.set_index_buffer(index_buffer.slice(..), mesh.index_format());
                    pass.draw_indexed(0..mesh.index_count(), 0, 0..draw.count);
                }
                None => pass.draw(0..mesh.index_count(), 0..draw.count),
            }
        }
        drop(pass);
        frame.main_recorded = true;
    }

    pub fn end_render_target(&mut self) {
        if !self.expect_phase(PassPhase::Main, "end_render_target") {
            return;
        }
        if let Some(frame) = self.frame.as_mut() {
            if !frame.main_recorded {
                // Clear-only pass so the target is in a defined state
                let _pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("MainPassClear"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &frame.view,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(frame.clear_color),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.context.depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                frame.main_recorded = true;
            }
        }
        self.phase = PassPhase::Idle;
    }

    // --- environment pass --------------------------------------------------

    /// The pipeline bound here compares depth with less-equal so the
    /// far-plane sky survives against geometry at identical depth.
    pub fn begin_environment_pass(&mut self) {
        if !self.expect_phase(PassPhase::Idle, "begin_environment_pass") {
            return;
        }
        self.phase = PassPhase::Environment;
    }

    pub fn render_environment_pass(&mut self, camera: &Camera, camera_transform: &Transform) {
        if !self.expect_phase(PassPhase::Environment, "render_environment_pass") {
            return;
        }
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("render_environment_pass called outside a frame");
            return;
        };

        // Rotation-only view: the sky stays centered on the camera
        let rotation_only = Mat4::from_mat3(Mat3::from_mat4(camera.view(camera_transform)));
        let brightness = self.skybox.ambient_intensity();
        let uniform = SkyUniform {
            view: rotation_only.to_cols_array_2d(),
            proj: camera.proj(self.context.aspect_ratio()).to_cols_array_2d(),
            tint: [brightness, brightness, brightness, 1.0],
        };
        if let Err(err) = self
            .bindings
            .sky
            .upload(&self.context.queue, bytemuck::bytes_of(&uniform))
        {
            log::error!("Failed to upload sky uniform: {err}");
        }

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("EnvironmentPass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.context.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipelines.sky);
        pass.set_bind_group(0, &self.bindings.sky_group, &[]);
        pass.set_vertex_buffer(0, self.skybox.vertex_buffer().slice(..));
        pass.draw(0..self.skybox.vertex_count(), 0..1);
    }

    /// Standard depth comparison resumes with whatever pipeline the next
    /// pass binds.
    pub fn end_environment_pass(&mut self) {
        if !self.expect_phase(PassPhase::Environment, "end_environment_pass") {
            return;
        }
        self.phase = PassPhase::Idle;
    }

    // --- presentation ------------------------------------------------------

    /// Submit the recorded frame and present it.
    pub fn swap_chain(&mut self) {
        let Some(frame) = self.frame.take() else {
            log::warn!("swap_chain called without an open frame");
            return;
        };
        self.context.queue.submit(Some(frame.encoder.finish()));
        frame.surface.present();
        self.phase = PassPhase::Idle;
    }

    /// Synchronous viewport reconfiguration; does not abort an open frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(PhysicalSize::new(width, height));
    }

    /// Drop every registry and cached binding.  GPU objects free as their
    /// owners drop.
    pub fn cleanup(&mut self) {
        self.frame = None;
        self.binder.clear();
        self.assets.meshes.clear();
        self.assets.materials.clear();
        self.assets.textures.clear();
        log::info!("Renderer cleaned up");
    }

    // --- introspection -----------------------------------------------------

    pub fn aspect_ratio(&self) -> f32 {
        self.context.aspect_ratio()
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn batch_count(&self) -> usize {
        self.batcher.batch_count()
    }

    pub fn instance_count(&self) -> usize {
        self.batcher.instance_count()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.context.queue
    }

    fn expect_phase(&self, expected: PassPhase, operation: &str) -> bool {
        if self.phase != expected {
            log::warn!(
                "{operation} called in phase {:?} (expected {:?})",
                self.phase,
                expected
            );
            return false;
        }
        true
    }
}

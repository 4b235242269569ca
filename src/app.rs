use std::sync::Arc;
use std::time::Instant;

use glam::{Quat, Vec3};
use hecs::World;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::ActiveEventLoop,
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::renderer::{
    lights, primitives, Camera, DirectionalLight, Material, Renderer, SpotLight,
};
use crate::scene::{MainCamera, MeshRenderer, Transform};
use crate::settings::RenderSettings;

/// Marker for entities the demo keeps rotating.
struct Spinner;

/// Demo application: a hecs world of cubes and lights feeding the renderer
/// once per frame.  The world is the upstream entity source; the renderer
/// never queries it directly.
pub struct App {
    window: Option<Arc<Window>>,
    window_id: Option<WindowId>,
    renderer: Option<Renderer>,
    world: World,
    camera: Camera,
    last_frame: Instant,
    elapsed: f32,
}

impl App {
    pub fn new() -> Self {
        Self {
            window: None,
            window_id: None,
            renderer: None,
            world: World::new(),
            camera: Camera::default(),
            last_frame: Instant::now(),
            elapsed: 0.0,
        }
    }

    fn setup_scene(&mut self, renderer: &mut Renderer) {
        let (cube_vertices, cube_indices) = primitives::cube_mesh();
        let cube = renderer.create_mesh("cube", &cube_vertices, &cube_indices);

        let (plane_vertices, plane_indices) = primitives::plane_mesh(12.0);
        let plane = renderer.create_mesh("ground", &plane_vertices, &plane_indices);

        let ground = renderer.register_material(
            Material::new(Vec3::new(0.45, 0.45, 0.5)).with_roughness(0.9),
        );
        let red = renderer.register_material(
            Material::new(Vec3::new(0.8, 0.15, 0.1)).with_roughness(0.4),
        );
        let steel = renderer.register_material(
            Material::new(Vec3::new(0.7, 0.7, 0.75))
                .with_metallic(0.9)
                .with_roughness(0.2),
        );

        self.world.spawn((
            Transform::at(Vec3::new(0.0, -0.5, 0.0)),
            MeshRenderer::new(plane, ground).without_shadows(),
        ));

        for i in 0..5 {
            let x = i as f32 * 1.5 - 3.0;
            let material = if i % 2 == 0 { red } else { steel };
            self.world.spawn((
                Transform::at(Vec3::new(x, 0.5, 0.0)),
                MeshRenderer::new(cube, material),
                Spinner,
            ));
        }

        self.world.spawn((
            Transform::IDENTITY,
            DirectionalLight::new(Vec3::new(0.4, -1.0, 0.3), Vec3::ONE, 2.0).with_shadows(),
        ));
        self.world.spawn((
            Transform::at(Vec3::new(0.0, 4.0, 4.0)),
            SpotLight::new(
                Vec3::new(0.0, -0.7, -0.7),
                Vec3::new(0.2, 0.4, 1.0),
                8.0,
                12f32.to_radians(),
                20f32.to_radians(),
            ),
        ));

        self.world.spawn((
            Transform::at(Vec3::new(0.0, 3.0, 8.0)).looking_at(Vec3::ZERO, Vec3::Y),
            MainCamera,
        ));
    }

    fn update(&mut self, dt: f32) {
        self.elapsed += dt;
        let angle = self.elapsed * 0.6;
        for (_, (transform, _)) in self.world.query_mut::<(&mut Transform, &Spinner)>() {
            transform.rotation = Quat::from_rotation_y(angle);
        }
    }

    /// One frame through the fixed pass sequence: accumulate, shadow, main,
    /// environment, present.
    fn render(&mut self, renderer: &mut Renderer) {
        if let Err(err) = renderer.begin_frame() {
            log::error!("Dropped frame: {err}");
            return;
        }

        for (_, (transform, drawable)) in self.world.query::<(&Transform, &MeshRenderer)>().iter()
        {
            renderer.add_to_render_batch(transform, drawable.mesh, drawable.material);
            if drawable.cast_shadows {
                renderer.add_to_shadow_batch(transform, drawable.mesh);
            }
        }

        let directional: Vec<DirectionalLight> = self
            .world
            .query::<&DirectionalLight>()
            .iter()
            .map(|(_, light)| *light)
            .collect();
        let spots: Vec<(Transform, SpotLight)> = self
            .world
            .query::<(&Transform, &SpotLight)>()
            .iter()
            .map(|(_, (transform, light))| (*transform, *light))
            .collect();

        let camera_transform = self
            .world
            .query::<(&Transform, &MainCamera)>()
            .iter()
            .map(|(_, (transform, _))| *transform)
            .next()
            .unwrap_or(Transform::IDENTITY);

        let light_matrix = lights::light_space_matrix(&directional);

        renderer.begin_shadow_pass();
        renderer.render_shadow_pass(light_matrix);
        renderer.end_shadow_pass();

        renderer.begin_render_target();
        renderer.render_main_target(
            &self.camera,
            &camera_transform,
            light_matrix,
            &directional,
            &spots,
        );
        renderer.end_render_target();

        renderer.begin_environment_pass();
        renderer.render_environment_pass(&self.camera, &camera_transform);
        renderer.end_environment_pass();

        renderer.swap_chain();
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop
            .create_window(Window::default_attributes().with_title("wgpu-forward"))
        {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Window creation failed: {err}");
                event_loop.exit();
                return;
            }
        };
        let size = window.inner_size();

        let mut renderer =
            match Renderer::new(window.clone(), size, RenderSettings::default()) {
                Ok(renderer) => renderer,
                Err(err) => {
                    log::error!("Renderer initialization failed: {err}");
                    event_loop.exit();
                    return;
                }
            };

        self.setup_scene(&mut renderer);

        self.window_id = Some(window.id());
        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(renderer);
        self.last_frame = Instant::now();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if Some(id) != self.window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.cleanup();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = self.window.as_ref().map(|window| window.inner_size());
                if let (Some(renderer), Some(size)) = (self.renderer.as_mut(), size) {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.last_frame).as_secs_f32();
                self.last_frame = now;

                self.update(dt);
                if let Some(mut renderer) = self.renderer.take() {
                    self.render(&mut renderer);
                    self.renderer = Some(renderer);
                }

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.cleanup();
                }
                event_loop.exit();
            }
            _ => {}
        }
    }
}

//! Shadow test scene: a floor, a ring of cubes and a sphere, lit by a
//! directional, a point and a spot light.
//!
//! Usage: `cargo run --example shadows [config.json] [model.gltf]`
//!
//! WASD/Space/Shift fly, hold the right mouse button to look around,
//! Escape quits.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use umbra::gpu::{PixelFormat, Sampling, TextureDesc, TextureDimension};
use umbra::model::GltfImporter;
use umbra::prelude::*;
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const CUBE_POSITIONS: [Vec3; 9] = [
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(2.0, 5.0, -15.0),
    Vec3::new(-1.5, -2.2, -2.5),
    Vec3::new(-3.8, -2.0, -12.3),
    Vec3::new(2.4, -0.4, -3.5),
    Vec3::new(-1.7, 3.0, -7.5),
    Vec3::new(1.3, -2.0, -2.5),
    Vec3::new(1.5, 2.0, -2.5),
    Vec3::new(-1.3, 1.0, -1.5),
];

struct Scene {
    dev: WgpuDevice,
    renderer: Renderer,
    target: MainTarget,
    _cube: GeometryBuffer,
    _sphere: GeometryBuffer,
    _checker: Owned<TextureId>,
}

struct ShadowsApp {
    config: RendererConfig,
    model_path: Option<String>,
    window: Option<Arc<Window>>,
    scene: Option<Scene>,
    camera: FlyCamera,
    keys: HashSet<KeyCode>,
    looking: bool,
    last_frame: Instant,
}

fn checker_texture(dev: &mut dyn GraphicsDevice) -> TextureId {
    const SIZE: u32 = 64;
    let texels: Vec<u8> = (0..SIZE * SIZE)
        .flat_map(|i| {
            let (x, y) = (i % SIZE, i / SIZE);
            let v = if (x / 8 + y / 8) % 2 == 0 { 220 } else { 90 };
            [v, v, v, 255]
        })
        .collect();
    dev.create_texture(
        &TextureDesc {
            label: "checker".into(),
            dimension: TextureDimension::D2,
            format: PixelFormat::Rgba8Srgb,
            width: SIZE,
            height: SIZE,
            samples: 1,
            sampling: Sampling::default(),
            render_target: false,
        },
        Some(&texels),
    )
}

fn build_scene(window: Arc<Window>, config: &RendererConfig, model_path: Option<&str>) -> Result<Scene, RenderError> {
    let mut dev = WgpuDevice::new(window)?;
    let mut renderer = Renderer::new(&mut dev, config.clone())?;
    let target = MainTarget::new(&mut dev, config)?;

    let directional = renderer.create_directional_light(
        &mut dev,
        LightDesc {
            color: Vec3::splat(0.1),
            position: Vec3::new(-2.0, 4.0, -1.0),
            direction: Vec3::new(1.0, -1.0, 1.4),
            ambient_strength: 0.1,
            casts_shadow: true,
            ..Default::default()
        },
    );
    renderer.set_directional_light(directional);

    let point = renderer.create_point_light(
        &mut dev,
        LightDesc {
            position: Vec3::new(0.7, 0.2, 2.0),
            ambient_strength: 0.1,
            casts_shadow: true,
            ..Default::default()
        },
    );
    renderer.set_point_light(point);

    renderer.set_spot_light(Light::spot(LightDesc {
        position: Vec3::new(0.0, 4.0, -4.0),
        direction: Vec3::new(0.2, -1.0, 0.3),
        ambient_strength: 0.0,
        ..Default::default()
    }));

    let cube = GeometryBuffer::cube(&mut dev);
    let sphere = GeometryBuffer::sphere(&mut dev, 40, 40, 1.0);
    let checker = checker_texture(&mut dev);

    for (i, position) in CUBE_POSITIONS.iter().enumerate() {
        let rotation = Quat::from_axis_angle(Vec3::new(1.0, 0.3, 0.5).normalize(), (20.0 * i as f32).to_radians());
        let transform = Mat4::from_rotation_translation(rotation, *position);
        renderer.add_render_object(RenderObject::from_geometry(&cube, checker, transform));
    }
    let floor = Mat4::from_scale_rotation_translation(Vec3::new(20.0, 0.2, 20.0), Quat::IDENTITY, Vec3::new(0.0, -4.0, -2.0));
    renderer.add_render_object(RenderObject::from_geometry(&cube, checker, floor));
    renderer.add_render_object(RenderObject::from_geometry(
        &sphere,
        checker,
        Mat4::from_translation(Vec3::new(3.0, -1.0, 0.0)),
    ));

    if let Some(path) = model_path {
        match Model::try_load(&mut dev, &GltfImporter, path) {
            Ok(model) => renderer.add_model(model, Mat4::from_translation(Vec3::new(0.0, -3.0, -4.0))),
            Err(e) => log::error!("{e}"),
        }
    }

    let checker = Owned::new(checker, dev.release_queue());
    Ok(Scene {
        dev,
        renderer,
        target,
        _cube: cube,
        _sphere: sphere,
        _checker: checker,
    })
}

impl ShadowsApp {
    fn update_camera(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        let bindings = [
            (KeyCode::KeyW, Movement::Forward),
            (KeyCode::KeyS, Movement::Backward),
            (KeyCode::KeyA, Movement::Left),
            (KeyCode::KeyD, Movement::Right),
            (KeyCode::Space, Movement::Up),
            (KeyCode::ShiftLeft, Movement::Down),
        ];
        for (key, movement) in bindings {
            if self.keys.contains(&key) {
                self.camera.process_movement(movement, dt);
            }
        }
    }

    fn render(&mut self) {
        let Some(scene) = &mut self.scene else {
            return;
        };
        if let Err(e) = scene.dev.begin_frame() {
            log::warn!("skipping frame: {e}");
            return;
        }
        scene.target.resize(&mut scene.dev);
        scene.target.begin(&mut scene.dev);
        scene
            .renderer
            .render_frame(&mut scene.dev, &self.camera, scene.target.target());
        scene.target.present(&mut scene.dev);
        scene.dev.end_frame();
    }
}

impl ApplicationHandler for ShadowsApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("umbra shadows")
            .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 720.0));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        match build_scene(window.clone(), &self.config, self.model_path.as_deref()) {
            Ok(scene) => self.scene = Some(scene),
            Err(e) => {
                log::error!("failed to set up renderer: {e}");
                event_loop.exit();
                return;
            }
        }
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("window close requested, exiting");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(scene) = &mut self.scene {
                    scene.dev.resize(size.width, size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if code == KeyCode::Escape {
                        event_loop.exit();
                    }
                    match event.state {
                        ElementState::Pressed => self.keys.insert(code),
                        ElementState::Released => self.keys.remove(&code),
                    };
                }
            }

            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state,
                ..
            } => {
                self.looking = state == ElementState::Pressed;
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 20.0,
                };
                self.camera.process_scroll(amount);
            }

            WindowEvent::RedrawRequested => {
                self.update_camera();
                self.render();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event
            && self.looking
        {
            self.camera.process_mouse(dx as f32, dy as f32);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default());

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => RendererConfig::from_json_file(path)?,
        None => RendererConfig::default(),
    };

    let mut app = ShadowsApp {
        config,
        model_path: args.next(),
        window: None,
        scene: None,
        camera: FlyCamera {
            far: 5000.0,
            ..FlyCamera::at(Vec3::new(0.0, 0.0, 6.0))
        },
        keys: HashSet::new(),
        looking: false,
        last_frame: Instant::now(),
    };

    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    Ok(())
}

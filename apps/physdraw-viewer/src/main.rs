mod obj;
mod scene;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use egui::Context as EguiContext;
use physdraw_render::{DrawContext, FrameInputs, FrameStats, RenderConfig, RenderError};
use physdraw_render_wgpu::{MouseMode, Viewpoint, WgpuRenderer, projection_matrix};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::obj::ObjMesh;
use crate::scene::{Scene, SceneKind};

#[derive(Parser)]
#[command(name = "physdraw-viewer", about = "Interactive viewer for the physdraw debug renderer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON render configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Demo scene to show
    #[arg(long, value_enum, default_value = "stack")]
    scene: SceneKind,

    /// Wavefront OBJ file for the mesh scene
    #[arg(long)]
    mesh: Option<PathBuf>,

    /// Start with textures off
    #[arg(long)]
    notex: bool,

    /// Start with shadows off
    #[arg(long)]
    noshadow: bool,

    /// Start paused
    #[arg(long)]
    pause: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct Buttons {
    left: bool,
    middle: bool,
    right: bool,
}

/// Application state.
struct AppState {
    ctx: DrawContext,
    scene: Scene,
    viewpoint: Viewpoint,
    use_textures: bool,
    use_shadows: bool,
    paused: bool,
    single_step: bool,
    show_hud: bool,
    // Input state
    ctrl_held: bool,
    buttons: Buttons,
    cursor: Option<(f64, f64)>,
    // Frame timing
    last_frame: Instant,
    fps: f32,
    stats: FrameStats,
    resident_meshes: usize,
}

impl AppState {
    fn new(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => RenderConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
            None => RenderConfig::default(),
        };
        let use_textures = config.use_textures && !cli.notex;
        let use_shadows = config.use_shadows && !cli.noshadow;

        let mut ctx = DrawContext::new(config)?;
        let mesh = cli.mesh.as_deref().map(ObjMesh::load).transpose()?;
        let scene = Scene::new(cli.scene, mesh.as_ref(), &mut ctx)?;
        tracing::info!(scene = ?cli.scene, "scene ready");

        Ok(Self {
            viewpoint: scene.viewpoint(),
            ctx,
            scene,
            use_textures,
            use_shadows,
            paused: cli.pause,
            single_step: false,
            show_hud: true,
            ctrl_held: false,
            buttons: Buttons::default(),
            cursor: None,
            last_frame: Instant::now(),
            fps: 0.0,
            stats: FrameStats::default(),
            resident_meshes: 0,
        })
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        if dt > 0.0 {
            self.fps = 0.9 * self.fps + 0.1 / dt;
        }

        if !self.paused || self.single_step {
            self.scene.step();
            self.single_step = false;
        }
    }

    /// Returns false when the viewer should quit.
    fn handle_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::KeyT if self.ctrl_held => {
                self.use_textures = !self.use_textures;
                tracing::info!(textures = self.use_textures, "toggled textures");
            }
            KeyCode::KeyS if self.ctrl_held => {
                self.use_shadows = !self.use_shadows;
                tracing::info!(shadows = self.use_shadows, "toggled shadows");
            }
            KeyCode::KeyP if self.ctrl_held => {
                self.paused = !self.paused;
                tracing::info!(paused = self.paused, "toggled pause");
            }
            KeyCode::KeyO if self.ctrl_held => {
                if self.paused {
                    self.single_step = true;
                }
            }
            KeyCode::KeyV if self.ctrl_held => {
                println!("Viewpoint = {}", self.viewpoint.describe());
            }
            KeyCode::KeyX if self.ctrl_held => return false,
            KeyCode::F1 => self.show_hud = !self.show_hud,
            _ if !self.ctrl_held => {
                if let Some(c) = scene_key(key) {
                    self.scene.command(c);
                }
            }
            _ => {}
        }
        true
    }

    fn cursor_moved(&mut self, x: f64, y: f64) {
        if let Some((px, py)) = self.cursor {
            let b = self.buttons;
            if let Some(mode) = MouseMode::from_buttons(b.left, b.middle, b.right) {
                self.viewpoint.motion(mode, (x - px) as f32, (y - py) as f32);
            }
        }
        self.cursor = Some((x, y));
    }

    fn render(
        &mut self,
        renderer: &mut WgpuRenderer,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        size: (u32, u32),
    ) -> Result<(), RenderError> {
        let inputs = FrameInputs {
            view: self.viewpoint.view_matrix(),
            projection: projection_matrix(size.0, size.1),
            use_textures: self.use_textures,
            use_shadows: self.use_shadows,
        };
        let scene = &self.scene;
        {
            let mut backend = renderer.frame(device, queue, target);
            self.stats = self.ctx.render_frame(&inputs, &mut backend, |f| scene.draw(f))?;
        }
        self.resident_meshes = renderer.resident_meshes();
        Ok(())
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        if !self.show_hud {
            return;
        }

        egui::Window::new("physdraw")
            .default_pos([10.0, 10.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!("Scene: {:?}  FPS: {:.1}", self.scene.kind(), self.fps));
                ui.label(format!(
                    "Draw calls: {} lit / {} shadow",
                    self.stats.lit_draws, self.stats.shadow_draws
                ));
                ui.label(format!(
                    "Instances: {}  Transient meshes: {}  GPU meshes: {}",
                    self.stats.instances, self.stats.transient_meshes, self.resident_meshes
                ));
                if let Some(status) = self.scene.status() {
                    ui.label(status);
                }
                ui.label(format!(
                    "Frame: {} ({:.2} ms)  Step: {}",
                    self.stats.frame,
                    self.stats.frame_time.as_secs_f64() * 1000.0,
                    self.scene.steps()
                ));
                ui.separator();

                ui.checkbox(&mut self.use_textures, "Textures (Ctrl+T)");
                ui.checkbox(&mut self.use_shadows, "Shadows (Ctrl+S)");
                ui.horizontal(|ui| {
                    ui.checkbox(&mut self.paused, "Pause (Ctrl+P)");
                    if ui.add_enabled(self.paused, egui::Button::new("Step")).clicked() {
                        self.single_step = true;
                    }
                });
                ui.separator();

                ui.heading("Quality");
                let mut sphere = self.ctx.sphere_quality();
                let mut cylinder = self.ctx.cylinder_quality();
                let mut capsule = self.ctx.capsule_quality();
                ui.add(egui::Slider::new(&mut sphere, 1..=3).text("sphere"));
                ui.add(egui::Slider::new(&mut cylinder, 1..=3).text("cylinder"));
                ui.add(egui::Slider::new(&mut capsule, 1..=3).text("capsule"));
                for result in [
                    self.ctx.set_sphere_quality(sphere),
                    self.ctx.set_cylinder_quality(cylinder),
                    self.ctx.set_capsule_quality(capsule),
                ] {
                    if let Err(e) = result {
                        tracing::warn!("quality not applied: {e}");
                    }
                }
                ui.separator();

                let v = self.viewpoint;
                ui.label(format!("xyz: ({:.2}, {:.2}, {:.2})", v.xyz.x, v.xyz.y, v.xyz.z));
                ui.label(format!("hpr: ({:.1}, {:.1}, {:.1})", v.hpr.x, v.hpr.y, v.hpr.z));
                if ui.button("Reset view").clicked() {
                    self.viewpoint = self.scene.viewpoint();
                }
                ui.small("F1: HUD | LMB: rotate | RMB: pan | LMB+RMB: lift | Ctrl+X: quit");
                ui.small("Space/W/S/+/-: scene keys");
            });
    }
}

/// Unmodified keys forwarded to the scene.
fn scene_key(key: KeyCode) -> Option<char> {
    match key {
        KeyCode::Space => Some(' '),
        KeyCode::KeyW => Some('w'),
        KeyCode::KeyS => Some('s'),
        KeyCode::Equal | KeyCode::NumpadAdd => Some('+'),
        KeyCode::Minus | KeyCode::NumpadSubtract => Some('-'),
        _ => None,
    }
}

struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    state: AppState,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
    error: Option<anyhow::Error>,
}

impl GpuApp {
    fn new(state: AppState) -> Self {
        Self {
            state,
            gpu: None,
            egui_ctx: EguiContext::default(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn init_gpu(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title("physdraw")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no compatible GPU adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("physdraw_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = WgpuRenderer::new(&device, surface_format, config.width, config.height);

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Gpu {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn redraw(&mut self) -> Result<()> {
        self.state.update();

        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return Ok(());
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.state.render(
            &mut gpu.renderer,
            &gpu.device,
            &gpu.queue,
            &view,
            (gpu.config.width, gpu.config.height),
        )?;

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.state.draw_ui(ctx);
        });
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
        gpu.window.request_redraw();
        Ok(())
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.config.width = new_size.width.max(1);
                    gpu.config.height = new_size.height.max(1);
                    gpu.surface.configure(&gpu.device, &gpu.config);
                    gpu.renderer
                        .resize(&gpu.device, gpu.config.width, gpu.config.height);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.state.ctrl_held = modifiers.state().control_key();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if !self.state.handle_key(key) {
                    event_loop.exit();
                }
            }
            WindowEvent::MouseInput { button, state, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.state.buttons.left = pressed,
                    MouseButton::Middle => self.state.buttons.middle = pressed,
                    MouseButton::Right => self.state.buttons.right = pressed,
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.state.cursor_moved(position.x, position.y);
            }
            WindowEvent::CursorLeft { .. } => {
                self.state.cursor = None;
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("physdraw-viewer starting");

    let state = AppState::new(&cli)?;
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(state);
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_keys_map_to_commands() {
        assert_eq!(scene_key(KeyCode::Space), Some(' '));
        assert_eq!(scene_key(KeyCode::NumpadAdd), Some('+'));
        assert_eq!(scene_key(KeyCode::Minus), Some('-'));
        assert_eq!(scene_key(KeyCode::KeyT), None);
    }

    #[test]
    fn mesh_flag_parses() {
        let cli = Cli::try_parse_from(["physdraw-viewer", "--scene", "mesh", "--mesh", "bunny.obj"]).unwrap();
        assert_eq!(cli.scene, SceneKind::Mesh);
        assert_eq!(cli.mesh, Some(PathBuf::from("bunny.obj")));
    }
}

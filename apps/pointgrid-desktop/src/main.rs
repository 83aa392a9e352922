use anyhow::{Context, Result};
use clap::Parser;
use pointgrid_common::{SketchResult, Viewport};
use pointgrid_render_wgpu::{WgpuSurface, shaders};
use pointgrid_runtime::{
    FrameScheduler, Host, Sketch, SketchConfig, StepOutcome, StopSignal, SurfaceOptions,
};
use pointgrid_scene::{OrbitInput, ShaderSources};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "pointgrid-desktop", about = "Animated point grid with orbit controls")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON sketch configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid side length (overrides the config file)
    #[arg(long)]
    grid_size: Option<u32>,

    /// WGSL file replacing the bundled vertex shader
    #[arg(long)]
    vertex_shader: Option<PathBuf>,

    /// WGSL file replacing the bundled fragment shader
    #[arg(long)]
    fragment_shader: Option<PathBuf>,

    /// Draw without multisampling
    #[arg(long)]
    no_antialias: bool,
}

/// The desktop window, registered as the sketch's single container.
struct DesktopHost {
    window: Arc<Window>,
    container_id: String,
}

impl FrameScheduler for DesktopHost {
    fn request_frame(&mut self) {
        self.window.request_redraw();
    }
}

impl Host for DesktopHost {
    type Surface = WgpuSurface;

    fn viewport(&self) -> Viewport {
        let size = self.window.inner_size();
        Viewport::new(size.width, size.height)
    }

    fn has_container(&self, id: &str) -> bool {
        id == self.container_id
    }

    fn create_surface(
        &mut self,
        _container_id: &str,
        options: SurfaceOptions,
    ) -> SketchResult<WgpuSurface> {
        let surface = WgpuSurface::new(self.window.clone(), options)?;
        tracing::info!("GPU initialized with {} backend", surface.backend());
        Ok(surface)
    }
}

/// Turns mouse drags into orbit gestures: left rotates, right/middle pans.
#[derive(Debug, Default)]
struct PointerTracker {
    rotating: bool,
    panning: bool,
    last: Option<PhysicalPosition<f64>>,
}

impl PointerTracker {
    fn button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.rotating = pressed,
            MouseButton::Right | MouseButton::Middle => self.panning = pressed,
            _ => {}
        }
    }

    fn moved(&mut self, position: PhysicalPosition<f64>) -> Option<OrbitInput> {
        let last = self.last.replace(position)?;
        let dx = (position.x - last.x) as f32;
        let dy = (position.y - last.y) as f32;
        if self.rotating {
            Some(OrbitInput::Rotate { dx, dy })
        } else if self.panning {
            Some(OrbitInput::Pan { dx, dy })
        } else {
            None
        }
    }

    fn left(&mut self) {
        self.last = None;
    }
}

fn wheel_steps(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
    }
}

struct PointgridApp {
    config: SketchConfig,
    shaders: ShaderSources,
    stop: StopSignal,
    sketch: Option<Sketch<DesktopHost>>,
    pointer: PointerTracker,
    error: Option<anyhow::Error>,
}

impl PointgridApp {
    fn new(config: SketchConfig, shaders: ShaderSources) -> Self {
        Self {
            config,
            shaders,
            stop: StopSignal::new(),
            sketch: None,
            pointer: PointerTracker::default(),
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("pointgrid")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let host = DesktopHost {
            window,
            container_id: self.config.container_id.clone(),
        };
        let sketch = Sketch::new(host, &self.config, self.shaders.clone(), self.stop.clone())
            .context("failed to start sketch")?;
        self.sketch = Some(sketch);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.error = Some(err);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.stop.stop();
        if let Some(sketch) = self.sketch.take() {
            sketch.dispose();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for PointgridApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.sketch.is_some() || self.stop.is_stopped() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(sketch) = self.sketch.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(_) => {
                sketch.on_resize(Instant::now());
            }
            WindowEvent::RedrawRequested => match sketch.on_frame() {
                Ok(StepOutcome::Rendered(_)) => {}
                Ok(StepOutcome::Halted) => self.shutdown(event_loop),
                Err(err) => self.fail(event_loop, err.into()),
            },
            WindowEvent::MouseInput { button, state, .. } => {
                self.pointer.button(button, state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(input) = self.pointer.moved(position) {
                    sketch.handle_input(input);
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer.left();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                sketch.handle_input(OrbitInput::Dolly(wheel_steps(delta)));
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(sketch) = self.sketch.as_mut() else {
            return;
        };
        sketch.poll(Instant::now());
        match sketch.next_deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("pointgrid-desktop starting");

    let mut config = match &cli.config {
        Some(path) => SketchConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SketchConfig::default(),
    };
    if let Some(side) = cli.grid_size {
        config.grid_side = side;
    }
    if cli.no_antialias {
        config.antialias = false;
    }
    let shaders = shaders::load(cli.vertex_shader.as_deref(), cli.fragment_shader.as_deref())?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = PointgridApp::new(config, shaders);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.error.take() {
        return Err(err);
    }
    tracing::info!("pointgrid-desktop exited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_move_only_records_position() {
        let mut pointer = PointerTracker::default();
        pointer.button(MouseButton::Left, true);
        assert_eq!(pointer.moved(PhysicalPosition::new(10.0, 10.0)), None);
        assert_eq!(
            pointer.moved(PhysicalPosition::new(15.0, 8.0)),
            Some(OrbitInput::Rotate { dx: 5.0, dy: -2.0 })
        );
    }

    #[test]
    fn right_drag_pans_and_release_stops() {
        let mut pointer = PointerTracker::default();
        pointer.moved(PhysicalPosition::new(0.0, 0.0));
        pointer.button(MouseButton::Right, true);
        assert_eq!(
            pointer.moved(PhysicalPosition::new(3.0, 4.0)),
            Some(OrbitInput::Pan { dx: 3.0, dy: 4.0 })
        );
        pointer.button(MouseButton::Right, false);
        assert_eq!(pointer.moved(PhysicalPosition::new(6.0, 8.0)), None);
    }

    #[test]
    fn leaving_the_window_resets_drag_origin() {
        let mut pointer = PointerTracker::default();
        pointer.button(MouseButton::Left, true);
        pointer.moved(PhysicalPosition::new(0.0, 0.0));
        pointer.left();
        assert_eq!(pointer.moved(PhysicalPosition::new(500.0, 500.0)), None);
    }

    #[test]
    fn wheel_lines_and_pixels_become_steps() {
        assert_eq!(wheel_steps(MouseScrollDelta::LineDelta(0.0, 2.0)), 2.0);
        assert_eq!(
            wheel_steps(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -100.0))),
            -2.0
        );
    }

    #[test]
    fn cli_parses_overrides() {
        let cli = Cli::parse_from([
            "pointgrid-desktop",
            "--verbose",
            "--grid-size",
            "128",
            "--fragment-shader",
            "fx.wgsl",
            "--no-antialias",
        ]);
        assert!(cli.no_antialias);
        assert!(cli.verbose);
        assert_eq!(cli.grid_size, Some(128));
        assert_eq!(cli.fragment_shader, Some(PathBuf::from("fx.wgsl")));
        assert!(cli.vertex_shader.is_none());
    }
}

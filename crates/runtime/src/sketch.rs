use std::time::Instant;

use glam::Vec3;
use pointgrid_common::{SketchError, SketchResult, Viewport};
use pointgrid_scene::{
    BufferGeometry, GRID_SIDE_UNIFORM, MeshId, OrbitControls, OrbitInput, PROGRESS_UNIFORM,
    PerspectiveCamera, Points, Scene, ShaderMaterial, ShaderSources, UniformValue, build_grid,
};

use crate::config::SketchConfig;
use crate::frame::{AnimationLoop, LoopState, StepOutcome, StopSignal};
use crate::host::{Host, RenderSurface, SurfaceOptions};
use crate::resize::ResizeCoordinator;

/// A running point-grid scene embedded in a host.
///
/// Owns the rendering surface, camera, scene root and orbit controller for
/// its whole lifetime. Nothing is global: the host drives it by calling
/// [`on_frame`](Sketch::on_frame), [`on_resize`](Sketch::on_resize) and
/// [`poll`](Sketch::poll) from its event loop.
pub struct Sketch<H: Host> {
    host: H,
    surface: H::Surface,
    camera: PerspectiveCamera,
    scene: Scene,
    controls: OrbitControls,
    mesh: MeshId,
    animation: AnimationLoop,
    resize: ResizeCoordinator,
    released: bool,
}

impl<H: Host> Sketch<H> {
    /// Build the scene and render the first frame.
    ///
    /// Fails with `Configuration` when the container is missing or the grid
    /// size is out of range, `Resource` when no surface can be created and
    /// `Asset` when a shader source is empty or rejected by the surface.
    pub fn new(
        mut host: H,
        config: &SketchConfig,
        shaders: ShaderSources,
        stop: StopSignal,
    ) -> SketchResult<Self> {
        config.validate()?;

        if !host.has_container(&config.container_id) {
            return Err(SketchError::configuration(format!(
                "host container `{}` does not exist",
                config.container_id
            )));
        }
        if shaders.vertex.trim().is_empty() {
            return Err(SketchError::asset("vertex shader source is empty"));
        }
        if shaders.fragment.trim().is_empty() {
            return Err(SketchError::asset("fragment shader source is empty"));
        }

        let viewport = host.viewport();
        let options = SurfaceOptions {
            viewport: viewport.clamped(),
            antialias: config.antialias,
        };
        let mut surface = host.create_surface(&config.container_id, options)?;
        tracing::info!(
            container = %config.container_id,
            width = viewport.width,
            height = viewport.height,
            antialias = config.antialias,
            "rendering surface attached"
        );

        let cam = &config.camera;
        let mut camera = PerspectiveCamera::new(cam.fov_degrees, viewport.aspect(), cam.near, cam.far);
        camera.position = Vec3::new(0.0, 0.0, cam.distance);

        let mut scene = Scene::new();
        let controls = OrbitControls::new();

        let grid = build_grid(config.grid_side)?;
        let material = ShaderMaterial::new(shaders)
            .with_uniform(PROGRESS_UNIFORM, UniformValue::Float(config.progress))
            .with_uniform(GRID_SIDE_UNIFORM, UniformValue::Float(config.grid_side as f32));
        let points = Points::new(BufferGeometry::from(grid), material);
        let point_count = points.point_count();

        let mesh = scene.add(points);
        if let Some(points) = scene.get(mesh) {
            surface.upload(mesh, points)?;
        }
        tracing::info!(points = point_count, "point grid uploaded");

        let mut sketch = Self {
            host,
            surface,
            camera,
            scene,
            controls,
            mesh,
            animation: AnimationLoop::new(stop),
            resize: ResizeCoordinator::new(config.resize_debounce(), viewport),
            released: false,
        };

        let Self {
            host,
            surface,
            scene,
            camera,
            animation,
            ..
        } = &mut sketch;
        animation.start(host, || surface.render(scene, camera))?;

        Ok(sketch)
    }

    /// Frame callback: draw one frame and schedule the next.
    ///
    /// Once the stop signal is raised this releases the surface, detaches the
    /// resize listener and returns [`StepOutcome::Halted`] forever after.
    pub fn on_frame(&mut self) -> SketchResult<StepOutcome> {
        let outcome = self
            .animation
            .step(&mut self.host, || self.surface.render(&self.scene, &self.camera))?;
        if outcome == StepOutcome::Halted && self.animation.state() == LoopState::Stopped {
            self.release();
        }
        Ok(outcome)
    }

    /// Raw viewport resize signal from the host.
    pub fn on_resize(&mut self, now: Instant) {
        if self.resize.signal(now) {
            self.apply_resize();
        }
    }

    /// Apply a settled resize if its quiet period is over. Returns whether one was applied.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.resize.poll(now) {
            self.apply_resize();
            true
        } else {
            false
        }
    }

    /// Earliest instant at which [`poll`](Sketch::poll) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.resize.deadline()
    }

    /// Forward an orbit gesture to the controller.
    pub fn handle_input(&mut self, input: OrbitInput) {
        if self.released {
            return;
        }
        self.controls
            .apply(&mut self.camera, input, self.resize.viewport());
    }

    /// Update the `progress` uniform of the grid mesh.
    pub fn set_progress(&mut self, value: f32) {
        if let Some(points) = self.scene.get_mut(self.mesh) {
            points
                .material
                .uniforms
                .insert(PROGRESS_UNIFORM.to_string(), UniformValue::Float(value));
        }
    }

    /// Stop the loop, release the surface and detach listeners, returning the host.
    pub fn dispose(mut self) -> H {
        self.animation.halt();
        self.release();
        tracing::info!(frames = self.animation.frames(), "sketch disposed");
        self.host
    }

    pub fn frames(&self) -> u64 {
        self.animation.frames()
    }

    pub fn state(&self) -> LoopState {
        self.animation.state()
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    pub fn viewport(&self) -> Viewport {
        self.resize.viewport()
    }

    pub fn resize_settles(&self) -> u64 {
        self.resize.settles()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn surface(&self) -> &H::Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut H::Surface {
        &mut self.surface
    }

    fn apply_resize(&mut self) {
        let viewport = self.host.viewport();
        self.resize
            .settle(viewport, &mut self.camera, &mut self.surface);
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.resize.detach();
        self.surface.release();
        self.released = true;
        tracing::debug!("rendering surface released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessHost;
    use std::time::Duration;

    fn shaders() -> ShaderSources {
        ShaderSources {
            vertex: "@vertex fn vs_main() {}".into(),
            fragment: "@fragment fn fs_main() {}".into(),
        }
    }

    fn host(width: u32, height: u32) -> HeadlessHost {
        HeadlessHost::new(Viewport::new(width, height)).with_container("container")
    }

    fn sketch(width: u32, height: u32) -> Sketch<HeadlessHost> {
        Sketch::new(host(width, height), &SketchConfig::default(), shaders(), StopSignal::new())
            .unwrap()
    }

    #[test]
    fn bootstrap_builds_reference_scene() {
        let sketch = sketch(1280, 720);

        assert_eq!(sketch.scene().len(), 1);
        let points = sketch.scene().get(sketch.mesh()).unwrap();
        assert_eq!(points.point_count(), 262_144);
        assert_eq!(points.material.float(PROGRESS_UNIFORM), Some(0.0));
        assert_eq!(points.material.side, pointgrid_scene::Side::Double);

        let cam = sketch.camera();
        assert_eq!(cam.aspect, 1280.0 / 720.0);
        assert_eq!(cam.fov_degrees, 70.0);
        assert_eq!(cam.near, 0.1);
        assert_eq!(cam.far, 3000.0);
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, 1000.0));

        assert_eq!(sketch.host().attached("container"), 1);
        assert_eq!(sketch.surface().uploads().get(&sketch.mesh()), Some(&262_144));
        assert!(sketch.surface().antialias());
    }

    #[test]
    fn grid_side_uniform_follows_configured_size() {
        let config = SketchConfig {
            grid_side: 128,
            antialias: false,
            ..SketchConfig::default()
        };
        let sketch = Sketch::new(host(800, 600), &config, shaders(), StopSignal::new()).unwrap();

        let points = sketch.scene().get(sketch.mesh()).unwrap();
        assert_eq!(points.point_count(), 128 * 128);
        assert_eq!(points.material.float(GRID_SIDE_UNIFORM), Some(128.0));
        assert!(!sketch.surface().antialias());
    }

    #[test]
    fn first_frame_renders_during_construction() {
        let sketch = sketch(800, 600);
        assert_eq!(sketch.state(), LoopState::Running);
        assert_eq!(sketch.frames(), 1);
        assert_eq!(sketch.surface().frames_drawn(), 1);
        assert_eq!(sketch.host().frame_requests(), 1);
    }

    #[test]
    fn frame_clock_equals_frame_callbacks() {
        let mut sketch = sketch(800, 600);
        for _ in 0..41 {
            assert!(matches!(sketch.on_frame().unwrap(), StepOutcome::Rendered(_)));
        }
        assert_eq!(sketch.frames(), 42);
        assert_eq!(sketch.surface().frames_drawn(), 42);
        assert_eq!(sketch.host().frame_requests(), 42);
    }

    #[test]
    fn missing_container_is_a_configuration_error() {
        let host = HeadlessHost::new(Viewport::new(800, 600));
        let err = Sketch::new(host, &SketchConfig::default(), shaders(), StopSignal::new())
            .err()
            .unwrap();
        assert!(matches!(err, SketchError::Configuration(_)));
    }

    #[test]
    fn invalid_grid_side_is_rejected() {
        let config = SketchConfig {
            grid_side: 0,
            ..SketchConfig::default()
        };
        let err = Sketch::new(host(800, 600), &config, shaders(), StopSignal::new())
            .err()
            .unwrap();
        assert!(matches!(err, SketchError::Configuration(_)));
    }

    #[test]
    fn empty_shader_is_an_asset_error() {
        let empty = ShaderSources {
            vertex: shaders().vertex,
            fragment: "   ".into(),
        };
        let err = Sketch::new(host(800, 600), &SketchConfig::default(), empty, StopSignal::new())
            .err()
            .unwrap();
        assert!(matches!(err, SketchError::Asset(_)));
    }

    #[test]
    fn surface_failure_is_a_resource_error() {
        let host = host(800, 600).without_gpu();
        let err = Sketch::new(host, &SketchConfig::default(), shaders(), StopSignal::new())
            .err()
            .unwrap();
        assert!(matches!(err, SketchError::Resource(_)));
    }

    #[test]
    fn resize_burst_updates_aspect_once_after_quiet_period() {
        let mut sketch = sketch(800, 600);
        let t0 = Instant::now();

        sketch.host_mut().set_viewport(Viewport::new(1024, 768));
        sketch.on_resize(t0);
        sketch.host_mut().set_viewport(Viewport::new(1200, 600));
        sketch.on_resize(t0 + Duration::from_millis(100));

        // Frames keep rendering with the stale size until the burst settles.
        sketch.on_frame().unwrap();
        assert_eq!(sketch.surface().last_aspect(), Some(800.0 / 600.0));

        assert!(!sketch.poll(t0 + Duration::from_millis(599)));
        assert_eq!(sketch.camera().aspect, 800.0 / 600.0);
        assert_eq!(sketch.next_deadline(), Some(t0 + Duration::from_millis(600)));

        assert!(sketch.poll(t0 + Duration::from_millis(600)));
        assert_eq!(sketch.camera().aspect, 2.0);
        assert_eq!(sketch.surface().size(), Viewport::new(1200, 600));
        assert_eq!(sketch.viewport(), Viewport::new(1200, 600));

        assert!(!sketch.poll(t0 + Duration::from_millis(5_000)));
        assert_eq!(sketch.resize_settles(), 1);
    }

    #[test]
    fn stop_signal_releases_surface_and_detaches_resize() {
        let stop = StopSignal::new();
        let mut sketch =
            Sketch::new(host(800, 600), &SketchConfig::default(), shaders(), stop.clone()).unwrap();
        sketch.on_frame().unwrap();

        stop.stop();
        assert_eq!(sketch.on_frame().unwrap(), StepOutcome::Halted);
        assert_eq!(sketch.state(), LoopState::Stopped);
        assert!(sketch.surface().is_released());
        assert_eq!(sketch.frames(), 2);
        assert_eq!(sketch.host().frame_requests(), 2);

        let t0 = Instant::now();
        sketch.on_resize(t0);
        assert_eq!(sketch.next_deadline(), None);
        assert!(!sketch.poll(t0 + Duration::from_secs(1)));
        assert_eq!(sketch.on_frame().unwrap(), StepOutcome::Halted);
    }

    #[test]
    fn dispose_returns_host_and_raises_stop() {
        let stop = StopSignal::new();
        let sketch =
            Sketch::new(host(800, 600), &SketchConfig::default(), shaders(), stop.clone()).unwrap();
        let host = sketch.dispose();
        assert!(stop.is_stopped());
        assert_eq!(host.frame_requests(), 1);
    }

    #[test]
    fn surface_lost_propagates_without_ticking() {
        let mut sketch = sketch(800, 600);
        sketch.surface_mut().fail_next_render(SketchError::SurfaceLost);

        assert_eq!(sketch.on_frame().unwrap_err(), SketchError::SurfaceLost);
        assert_eq!(sketch.frames(), 1);
        assert_eq!(sketch.on_frame().unwrap(), StepOutcome::Rendered(2));
    }

    #[test]
    fn orbit_input_moves_camera_but_not_projection() {
        let mut sketch = sketch(800, 600);
        let projection = sketch.camera().projection_matrix();

        sketch.handle_input(OrbitInput::Rotate { dx: 40.0, dy: 10.0 });
        sketch.handle_input(OrbitInput::Dolly(2.0));

        assert_ne!(sketch.camera().position, Vec3::new(0.0, 0.0, 1000.0));
        assert_eq!(sketch.camera().projection_matrix(), projection);
    }

    #[test]
    fn progress_uniform_reaches_the_surface() {
        let mut sketch = sketch(800, 600);
        sketch.set_progress(0.5);
        sketch.on_frame().unwrap();
        assert_eq!(sketch.surface().last_progress(), Some(0.5));
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use pointgrid_common::{SketchError, SketchResult, Viewport};
use pointgrid_scene::{MeshId, PROGRESS_UNIFORM, PerspectiveCamera, Points, Scene};

use crate::frame::FrameScheduler;
use crate::host::{Host, RenderSurface, SurfaceOptions};

/// Surface without a GPU: records what it was asked to draw.
///
/// Used by the CLI for dry runs and by tests to observe the render loop.
#[derive(Debug)]
pub struct HeadlessSurface {
    size: Viewport,
    antialias: bool,
    uploads: BTreeMap<MeshId, usize>,
    frames_drawn: u64,
    points_drawn: u64,
    last_aspect: Option<f32>,
    last_progress: Option<f32>,
    released: bool,
    fail_next_render: Option<SketchError>,
}

impl HeadlessSurface {
    pub fn new(size: Viewport) -> Self {
        Self {
            size,
            antialias: false,
            uploads: BTreeMap::new(),
            frames_drawn: 0,
            points_drawn: 0,
            last_aspect: None,
            last_progress: None,
            released: false,
            fail_next_render: None,
        }
    }

    pub fn size(&self) -> Viewport {
        self.size
    }

    pub fn antialias(&self) -> bool {
        self.antialias
    }

    /// Point count of each uploaded mesh.
    pub fn uploads(&self) -> &BTreeMap<MeshId, usize> {
        &self.uploads
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn points_drawn(&self) -> u64 {
        self.points_drawn
    }

    /// Camera aspect seen by the most recent draw.
    pub fn last_aspect(&self) -> Option<f32> {
        self.last_aspect
    }

    pub fn last_progress(&self) -> Option<f32> {
        self.last_progress
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Make the next `render` call fail with `err`.
    pub fn fail_next_render(&mut self, err: SketchError) {
        self.fail_next_render = Some(err);
    }

    /// Human-readable summary of the surface state.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Headless Surface ({}x{}) ===",
            self.size.width, self.size.height
        );
        let _ = writeln!(out, "Antialias: {}", self.antialias);
        let _ = writeln!(out, "Frames drawn: {}", self.frames_drawn);
        let _ = writeln!(out, "Points drawn: {}", self.points_drawn);
        if let Some(aspect) = self.last_aspect {
            let _ = writeln!(out, "Camera aspect: {aspect:.4}");
        }
        for (id, count) in &self.uploads {
            let _ = writeln!(out, "  mesh[{}] points={}", id.0, count);
        }
        if self.released {
            out.push_str("Released\n");
        }
        out
    }
}

impl RenderSurface for HeadlessSurface {
    fn upload(&mut self, id: MeshId, points: &Points) -> SketchResult<()> {
        if self.released {
            return Err(SketchError::resource("surface already released"));
        }
        self.uploads.insert(id, points.point_count());
        Ok(())
    }

    fn set_size(&mut self, viewport: Viewport) {
        self.size = viewport;
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> SketchResult<()> {
        if let Some(err) = self.fail_next_render.take() {
            return Err(err);
        }
        if self.released {
            return Ok(());
        }
        for (id, points) in scene.children() {
            if self.uploads.contains_key(&id) {
                self.points_drawn += points.point_count() as u64;
                self.last_progress = points.material.float(PROGRESS_UNIFORM);
            }
        }
        self.last_aspect = Some(camera.aspect);
        self.frames_drawn += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.uploads.clear();
        self.released = true;
    }
}

/// In-memory host with named containers and a settable viewport.
#[derive(Debug)]
pub struct HeadlessHost {
    containers: BTreeSet<String>,
    attached: BTreeMap<String, usize>,
    viewport: Viewport,
    frame_requests: u64,
    fail_surface: bool,
}

impl HeadlessHost {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            containers: BTreeSet::new(),
            attached: BTreeMap::new(),
            viewport,
            frame_requests: 0,
            fail_surface: false,
        }
    }

    pub fn with_container(mut self, id: impl Into<String>) -> Self {
        self.containers.insert(id.into());
        self
    }

    /// Make surface creation fail, as if no GPU context were available.
    pub fn without_gpu(mut self) -> Self {
        self.fail_surface = true;
        self
    }

    /// Change the reported viewport, as a window manager would.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn frame_requests(&self) -> u64 {
        self.frame_requests
    }

    /// Number of surfaces attached to a container.
    pub fn attached(&self, id: &str) -> usize {
        self.attached.get(id).copied().unwrap_or(0)
    }
}

impl FrameScheduler for HeadlessHost {
    fn request_frame(&mut self) {
        self.frame_requests += 1;
    }
}

impl Host for HeadlessHost {
    type Surface = HeadlessSurface;

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn has_container(&self, id: &str) -> bool {
        self.containers.contains(id)
    }

    fn create_surface(
        &mut self,
        container_id: &str,
        options: SurfaceOptions,
    ) -> SketchResult<HeadlessSurface> {
        if self.fail_surface {
            return Err(SketchError::resource("no GPU context available"));
        }
        *self.attached.entry(container_id.to_string()).or_default() += 1;
        let mut surface = HeadlessSurface::new(options.viewport);
        surface.antialias = options.antialias;
        Ok(surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointgrid_scene::{BufferGeometry, ShaderMaterial, ShaderSources, UniformValue, build_grid};

    fn points(side: u32) -> Points {
        Points::new(
            BufferGeometry::from(build_grid(side).unwrap()),
            ShaderMaterial::new(ShaderSources {
                vertex: "vs".into(),
                fragment: "fs".into(),
            })
            .with_uniform(PROGRESS_UNIFORM, UniformValue::Float(0.25)),
        )
    }

    #[test]
    fn surface_draws_only_uploaded_meshes() {
        let mut scene = Scene::new();
        let uploaded = scene.add(points(4));
        scene.add(points(2));

        let mut surface = HeadlessSurface::new(Viewport::default());
        surface.upload(uploaded, scene.get(uploaded).unwrap()).unwrap();

        let camera = PerspectiveCamera::new(70.0, 1.5, 0.1, 3000.0);
        surface.render(&scene, &camera).unwrap();

        assert_eq!(surface.frames_drawn(), 1);
        assert_eq!(surface.points_drawn(), 16);
        assert_eq!(surface.last_aspect(), Some(1.5));
        assert_eq!(surface.last_progress(), Some(0.25));
    }

    #[test]
    fn describe_lists_meshes() {
        let mut surface = HeadlessSurface::new(Viewport::new(640, 480));
        surface.upload(MeshId(0), &points(3)).unwrap();
        let text = surface.describe();
        assert!(text.contains("640x480"));
        assert!(text.contains("mesh[0] points=9"));
    }

    #[test]
    fn released_surface_draws_nothing() {
        let mut surface = HeadlessSurface::new(Viewport::default());
        surface.release();
        let camera = PerspectiveCamera::new(70.0, 1.0, 0.1, 3000.0);
        surface.render(&Scene::new(), &camera).unwrap();
        assert_eq!(surface.frames_drawn(), 0);
        assert!(surface.upload(MeshId(0), &points(1)).is_err());
    }

    #[test]
    fn host_tracks_containers_and_requests() {
        let mut host = HeadlessHost::new(Viewport::new(800, 600)).with_container("container");
        assert!(host.has_container("container"));
        assert!(!host.has_container("missing"));

        let options = SurfaceOptions {
            viewport: host.viewport(),
            antialias: true,
        };
        let surface = host.create_surface("container", options).unwrap();
        host.request_frame();
        assert!(surface.antialias());
        assert_eq!(surface.size(), Viewport::new(800, 600));
        assert_eq!(host.attached("container"), 1);
        assert_eq!(host.frame_requests(), 1);

        let mut gpuless = HeadlessHost::new(Viewport::default()).without_gpu();
        assert!(matches!(
            gpuless.create_surface(
                "container",
                SurfaceOptions {
                    viewport: Viewport::default(),
                    antialias: false,
                }
            ),
            Err(SketchError::Resource(_))
        ));
    }
}

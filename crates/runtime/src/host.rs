use pointgrid_common::{SketchResult, Viewport};
use pointgrid_scene::{MeshId, PerspectiveCamera, Points, Scene};

use crate::frame::FrameScheduler;

/// GPU-backed drawable target presented to the viewport.
///
/// Implementations never mutate the scene or camera they draw.
pub trait RenderSurface {
    /// Create GPU resources for a mesh before it is first drawn.
    ///
    /// Shader sources are compiled here, so a bad source is reported at
    /// startup instead of in the middle of the render loop.
    fn upload(&mut self, id: MeshId, points: &Points) -> SketchResult<()>;

    /// Match the drawable size to the viewport.
    fn set_size(&mut self, viewport: Viewport);

    /// Draw every mesh in `scene` through `camera`.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> SketchResult<()>;

    /// Drop GPU resources. Rendering after release draws nothing.
    fn release(&mut self);
}

/// What a sketch asks of a new rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceOptions {
    pub viewport: Viewport,
    /// Multisample the drawable when the GPU supports it.
    pub antialias: bool,
}

/// Environment a sketch is embedded in: containers, viewport and frame pacing.
pub trait Host: FrameScheduler {
    type Surface: RenderSurface;

    /// Current viewport size, read synchronously.
    fn viewport(&self) -> Viewport;

    /// Whether a container with this identifier exists.
    fn has_container(&self, id: &str) -> bool;

    /// Create a surface as described by `options` and attach its output to the container.
    fn create_surface(
        &mut self,
        container_id: &str,
        options: SurfaceOptions,
    ) -> SketchResult<Self::Surface>;
}

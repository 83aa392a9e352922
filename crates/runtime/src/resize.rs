use std::time::{Duration, Instant};

use pointgrid_common::Viewport;
use pointgrid_scene::PerspectiveCamera;

use crate::debounce::Debounce;
use crate::host::RenderSurface;

/// Turns bursts of viewport resize signals into a single camera/surface update.
///
/// The coordinator is the only writer of the current [`Viewport`].
#[derive(Debug)]
pub struct ResizeCoordinator {
    debounce: Debounce<()>,
    viewport: Viewport,
    attached: bool,
    settles: u64,
}

impl ResizeCoordinator {
    pub fn new(delay: Duration, initial: Viewport) -> Self {
        Self {
            debounce: Debounce::new(delay),
            viewport: initial,
            attached: true,
            settles: 0,
        }
    }

    /// Feed one raw resize signal.
    ///
    /// Returns `true` when a previous burst had already settled and must be
    /// applied before this signal starts a new quiet period.
    pub fn signal(&mut self, now: Instant) -> bool {
        if !self.attached {
            return false;
        }
        tracing::trace!("resize signal");
        self.debounce.call(now, ()).is_some()
    }

    /// Whether the pending burst has been quiet for the full delay.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.attached && self.debounce.poll(now).is_some()
    }

    /// Apply a settled viewport size to the camera and surface.
    pub fn settle<S: RenderSurface>(
        &mut self,
        viewport: Viewport,
        camera: &mut PerspectiveCamera,
        surface: &mut S,
    ) {
        self.viewport = viewport;
        self.settles += 1;
        camera.aspect = viewport.aspect();
        camera.update_projection_matrix();
        surface.set_size(viewport.clamped());
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            aspect = camera.aspect,
            "viewport resized"
        );
    }

    /// Stop listening: the pending settle is dropped and later signals are ignored.
    pub fn detach(&mut self) {
        self.debounce.cancel();
        self.attached = false;
    }

    pub fn deadline(&self) -> Option<Instant> {
        if self.attached {
            self.debounce.deadline()
        } else {
            None
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Number of settles applied so far.
    pub fn settles(&self) -> u64 {
        self.settles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessSurface;

    const D: Duration = Duration::from_millis(500);

    #[test]
    fn burst_settles_once() {
        let t0 = Instant::now();
        let mut resize = ResizeCoordinator::new(D, Viewport::new(800, 600));

        assert!(!resize.signal(t0));
        assert!(!resize.signal(t0 + Duration::from_millis(100)));
        assert!(!resize.poll(t0 + Duration::from_millis(599)));
        assert!(resize.poll(t0 + Duration::from_millis(600)));
        assert!(!resize.poll(t0 + Duration::from_millis(2_000)));
    }

    #[test]
    fn settle_updates_camera_and_surface() {
        let mut resize = ResizeCoordinator::new(D, Viewport::new(800, 600));
        let mut camera = PerspectiveCamera::new(70.0, 800.0 / 600.0, 0.1, 3000.0);
        let mut surface = HeadlessSurface::new(Viewport::new(800, 600));
        let before = camera.projection_matrix();

        resize.settle(Viewport::new(1000, 500), &mut camera, &mut surface);

        assert_eq!(camera.aspect, 2.0);
        assert_ne!(camera.projection_matrix(), before);
        assert_eq!(surface.size(), Viewport::new(1000, 500));
        assert_eq!(resize.viewport(), Viewport::new(1000, 500));
        assert_eq!(resize.settles(), 1);
    }

    #[test]
    fn detached_coordinator_ignores_signals() {
        let t0 = Instant::now();
        let mut resize = ResizeCoordinator::new(D, Viewport::default());
        resize.signal(t0);
        assert!(resize.is_attached());
        resize.detach();

        assert!(!resize.is_attached());
        assert_eq!(resize.deadline(), None);
        assert!(!resize.poll(t0 + Duration::from_secs(5)));
        assert!(!resize.signal(t0 + Duration::from_secs(6)));
        assert!(!resize.poll(t0 + Duration::from_secs(10)));
    }
}

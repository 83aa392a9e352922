use glam::Vec3;
use pointgrid_common::Viewport;

use crate::camera::PerspectiveCamera;

/// Input gestures understood by [`OrbitControls`], in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbitInput {
    /// Drag that orbits the camera around its target.
    Rotate { dx: f32, dy: f32 },
    /// Drag that slides camera and target across the view plane.
    Pan { dx: f32, dy: f32 },
    /// Wheel steps; positive moves towards the target.
    Dolly(f32),
}

/// Orbit-style camera controller.
///
/// The camera position is kept on a sphere around `camera.target`. Only the
/// view transform changes; the projection is left to the owner of the camera.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub enabled: bool,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Polar angle limits, in radians from the +Y axis.
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            enabled: true,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 1.0,
            max_distance: 2900.0,
            min_polar_angle: 0.01,
            max_polar_angle: std::f32::consts::PI - 0.01,
        }
    }
}

impl OrbitControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one gesture to `camera`.
    pub fn apply(&self, camera: &mut PerspectiveCamera, input: OrbitInput, viewport: Viewport) {
        if !self.enabled {
            return;
        }
        let height = viewport.height.max(1) as f32;
        match input {
            OrbitInput::Rotate { dx, dy } => {
                let tau = std::f32::consts::TAU;
                self.rotate(
                    camera,
                    -tau * dx / height * self.rotate_speed,
                    -tau * dy / height * self.rotate_speed,
                );
            }
            OrbitInput::Pan { dx, dy } => self.pan(camera, dx, dy, height),
            OrbitInput::Dolly(steps) => self.dolly(camera, steps),
        }
    }

    fn rotate(&self, camera: &mut PerspectiveCamera, d_azimuth: f32, d_polar: f32) {
        let mut s = Spherical::from_offset(camera.position - camera.target);
        s.azimuth += d_azimuth;
        s.polar = (s.polar + d_polar).clamp(self.min_polar_angle, self.max_polar_angle);
        camera.position = camera.target + s.to_offset();
    }

    fn pan(&self, camera: &mut PerspectiveCamera, dx: f32, dy: f32, height: f32) {
        let offset = camera.position - camera.target;
        // World units covered by one pixel at the target's depth.
        let half_fov = camera.fov_degrees.to_radians() * 0.5;
        let units_per_px = 2.0 * offset.length() * half_fov.tan() / height;

        let forward = (-offset).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);

        let shift = (-right * dx + up * dy) * units_per_px * self.pan_speed;
        camera.position += shift;
        camera.target += shift;
    }

    fn dolly(&self, camera: &mut PerspectiveCamera, steps: f32) {
        let offset = camera.position - camera.target;
        let scale = 0.95f32.powf(steps * self.zoom_speed);
        let distance = (offset.length() * scale).clamp(self.min_distance, self.max_distance);
        camera.position = camera.target + offset.try_normalize().unwrap_or(Vec3::Z) * distance;
    }
}

#[derive(Debug, Clone, Copy)]
struct Spherical {
    radius: f32,
    polar: f32,
    azimuth: f32,
}

impl Spherical {
    fn from_offset(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self {
                radius,
                polar: 0.0,
                azimuth: 0.0,
            };
        }
        Self {
            radius,
            polar: (v.y / radius).clamp(-1.0, 1.0).acos(),
            azimuth: v.x.atan2(v.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_polar = self.polar.sin();
        Vec3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        let mut cam = PerspectiveCamera::new(70.0, 1.0, 0.1, 3000.0);
        cam.position = Vec3::new(0.0, 0.0, 1000.0);
        cam
    }

    #[test]
    fn rotation_keeps_distance() {
        let controls = OrbitControls::new();
        let mut cam = camera();
        let vp = Viewport::new(800, 600);

        controls.apply(&mut cam, OrbitInput::Rotate { dx: 120.0, dy: -45.0 }, vp);
        assert_ne!(cam.position, Vec3::new(0.0, 0.0, 1000.0));
        assert!((cam.distance_to_target() - 1000.0).abs() < 1e-2);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let controls = OrbitControls::new();
        let mut cam = camera();
        let vp = Viewport::new(800, 600);

        // A huge vertical drag would flip over the pole without clamping.
        controls.apply(&mut cam, OrbitInput::Rotate { dx: 0.0, dy: 10_000.0 }, vp);
        let polar = Spherical::from_offset(cam.position - cam.target).polar;
        assert!(polar >= controls.min_polar_angle - 1e-4);
        assert!(polar <= controls.max_polar_angle + 1e-4);
    }

    #[test]
    fn dolly_moves_closer_and_clamps() {
        let controls = OrbitControls::new();
        let mut cam = camera();
        let vp = Viewport::default();

        controls.apply(&mut cam, OrbitInput::Dolly(1.0), vp);
        assert!(cam.distance_to_target() < 1000.0);

        controls.apply(&mut cam, OrbitInput::Dolly(10_000.0), vp);
        assert!((cam.distance_to_target() - controls.min_distance).abs() < 1e-3);

        controls.apply(&mut cam, OrbitInput::Dolly(-10_000.0), vp);
        assert!((cam.distance_to_target() - controls.max_distance).abs() < 1e-1);
    }

    #[test]
    fn pan_moves_target_with_camera() {
        let controls = OrbitControls::new();
        let mut cam = camera();
        controls.apply(&mut cam, OrbitInput::Pan { dx: 50.0, dy: 0.0 }, Viewport::new(800, 600));

        assert_ne!(cam.target, Vec3::ZERO);
        assert!((cam.distance_to_target() - 1000.0).abs() < 1e-2);
        // Dragging right moves the view to the left.
        assert!(cam.target.x < 0.0);
    }

    #[test]
    fn disabled_controls_ignore_input() {
        let controls = OrbitControls {
            enabled: false,
            ..OrbitControls::default()
        };
        let mut cam = camera();
        controls.apply(&mut cam, OrbitInput::Dolly(5.0), Viewport::default());
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, 1000.0));
    }
}

use std::path::Path;
use std::time::Duration;

use pointgrid_common::{SketchError, SketchResult};
use pointgrid_scene::DEFAULT_GRID_SIDE;
use serde::{Deserialize, Serialize};

/// Perspective camera parameters used at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Initial distance from the origin along +Z.
    pub distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 70.0,
            near: 0.1,
            far: 3000.0,
            distance: 1000.0,
        }
    }
}

/// Startup configuration of a sketch. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    /// Host container the rendering surface is attached to.
    pub container_id: String,
    pub grid_side: u32,
    pub camera: CameraConfig,
    pub resize_debounce_ms: u64,
    /// Initial value of the `progress` uniform.
    pub progress: f32,
    /// Multisampled rendering of the points.
    pub antialias: bool,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            container_id: "container".to_string(),
            grid_side: DEFAULT_GRID_SIDE,
            camera: CameraConfig::default(),
            resize_debounce_ms: 500,
            progress: 0.0,
            antialias: true,
        }
    }
}

impl SketchConfig {
    pub fn from_json_str(json: &str) -> SketchResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SketchError::configuration(format!("invalid sketch config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SketchResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SketchError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Checks that do not depend on the host. Grid bounds are checked by the builder.
    pub fn validate(&self) -> SketchResult<()> {
        if self.container_id.is_empty() {
            return Err(SketchError::configuration("container id must not be empty"));
        }
        let cam = &self.camera;
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return Err(SketchError::configuration(format!(
                "field of view {} is outside (0, 180)",
                cam.fov_degrees
            )));
        }
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return Err(SketchError::configuration(format!(
                "clip planes near={} far={} are invalid",
                cam.near, cam.far
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_scene() {
        let config = SketchConfig::default();
        assert_eq!(config.container_id, "container");
        assert_eq!(config.grid_side, 512);
        assert_eq!(config.camera.fov_degrees, 70.0);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.camera.far, 3000.0);
        assert_eq!(config.camera.distance, 1000.0);
        assert_eq!(config.resize_debounce(), Duration::from_millis(500));
        assert!(config.antialias);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SketchConfig::from_json_str(r#"{ "grid_side": 64, "camera": { "fov_degrees": 45 } }"#)
            .unwrap();
        assert_eq!(config.grid_side, 64);
        assert_eq!(config.camera.fov_degrees, 45.0);
        assert_eq!(config.camera.far, 3000.0);
        assert_eq!(config.container_id, "container");
    }

    #[test]
    fn antialias_can_be_turned_off() {
        let config = SketchConfig::from_json_str(r#"{ "antialias": false }"#).unwrap();
        assert!(!config.antialias);
        assert_eq!(config.grid_side, 512);

        let config = SketchConfig::from_json_str(r#"{ "antialias": true, "grid_side": 32 }"#).unwrap();
        assert!(config.antialias);
    }

    #[test]
    fn bad_values_are_configuration_errors() {
        for json in [
            r#"{ "container_id": "" }"#,
            r#"{ "camera": { "fov_degrees": 0 } }"#,
            r#"{ "camera": { "near": 10, "far": 5 } }"#,
            r#"{ "grid_side": "big" }"#,
            r#"{ "antialias": "yes" }"#,
        ] {
            assert!(
                matches!(SketchConfig::from_json_str(json), Err(SketchError::Configuration(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "resize_debounce_ms": 250 }}"#).unwrap();

        let config = SketchConfig::load(file.path()).unwrap();
        assert_eq!(config.resize_debounce(), Duration::from_millis(250));

        let missing = SketchConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(SketchError::Configuration(_))));
    }
}

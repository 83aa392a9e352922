use std::path::Path;

use pointgrid_common::{SketchError, SketchResult};
use pointgrid_scene::ShaderSources;

/// Bundled WGSL vertex stage. Entry point `vs_main`.
pub const VERTEX_SHADER: &str = include_str!("../shaders/vertex.wgsl");

/// Bundled WGSL fragment stage. Entry point `fs_main`.
pub const FRAGMENT_SHADER: &str = include_str!("../shaders/fragment.wgsl");

/// Entry point the pipeline calls in the vertex module.
pub const VERTEX_ENTRY: &str = "vs_main";
/// Entry point the pipeline calls in the fragment module.
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Shader sources compiled into the binary.
pub fn bundled() -> ShaderSources {
    ShaderSources {
        vertex: VERTEX_SHADER.to_string(),
        fragment: FRAGMENT_SHADER.to_string(),
    }
}

/// Bundled sources, with either stage replaced by the contents of a file.
pub fn load(vertex: Option<&Path>, fragment: Option<&Path>) -> SketchResult<ShaderSources> {
    let mut sources = bundled();
    if let Some(path) = vertex {
        sources.vertex = read(path)?;
    }
    if let Some(path) = fragment {
        sources.fragment = read(path)?;
    }
    Ok(sources)
}

fn read(path: &Path) -> SketchResult<String> {
    tracing::debug!(path = %path.display(), "loading shader source");
    std::fs::read_to_string(path)
        .map_err(|e| SketchError::asset(format!("cannot read shader {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_sources_declare_entry_points() {
        let sources = bundled();
        assert!(sources.vertex.contains(&format!("fn {VERTEX_ENTRY}")));
        assert!(sources.fragment.contains(&format!("fn {FRAGMENT_ENTRY}")));
        assert!(sources.vertex.contains("progress"));
    }

    #[test]
    fn bundled_gradient_scales_with_grid_side() {
        let sources = bundled();
        assert!(sources.vertex.contains("uniforms.grid_side"));
        assert!(!sources.vertex.contains("512"));
        for stage in [&sources.vertex, &sources.fragment] {
            assert!(stage.contains("progress: f32,\n    grid_side: f32,"));
        }
    }

    #[test]
    fn file_overrides_one_stage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.wgsl");
        std::fs::write(&path, "// custom fragment").unwrap();

        let sources = load(None, Some(&path)).unwrap();
        assert_eq!(sources.vertex, VERTEX_SHADER);
        assert_eq!(sources.fragment, "// custom fragment");
    }

    #[test]
    fn missing_file_is_an_asset_error() {
        let err = load(Some(Path::new("/nonexistent/vertex.wgsl")), None).unwrap_err();
        assert!(matches!(err, SketchError::Asset(_)));
    }
}

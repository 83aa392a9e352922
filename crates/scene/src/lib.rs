//! Scene data for the point grid: attribute buffers, the scene root, shader
//! materials, the perspective camera and orbit controls.
//!
//! # Invariants
//! - Grid buffers hold exactly `3 * side^2` floats, vertex `k` = `(k / side, k % side)`.
//! - Shader sources are opaque here; nothing in this crate inspects them.
//! - Camera projection only changes on an explicit update.

mod camera;
mod controls;
mod grid;
mod scene;

pub use camera::PerspectiveCamera;
pub use controls::{OrbitControls, OrbitInput};
pub use grid::{
    AttributeBuffer, DEFAULT_GRID_SIDE, GRID_SPACING, GridBuffers, MAX_GRID_SIDE, build_grid,
};
pub use scene::{
    BufferGeometry, COORDINATES_ATTRIBUTE, GRID_SIDE_UNIFORM, MeshId, POSITION_ATTRIBUTE,
    PROGRESS_UNIFORM, Points, Scene, ShaderMaterial, ShaderSources, Side, UniformValue,
};

pub fn crate_info() -> &'static str {
    "pointgrid-scene v0.1.0"
}

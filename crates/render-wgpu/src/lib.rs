//! wgpu rendering surface for the point grid.
//!
//! Draws every uploaded mesh as a point list with its own shader material.
//! Each mesh binds two vertex buffers (`position` at slot 0, `coordinates`
//! at slot 1) and one uniform block holding the view-projection matrix and
//! the `progress` uniform.
//!
//! # Invariants
//! - Renderer never mutates the scene or the camera.
//! - Shader sources reach wgpu unmodified; compile errors surface as `Asset` errors.
//! - A lost surface is reported as `SurfaceLost`, never silently retried.

mod gpu;
pub mod shaders;
mod surface;

pub use gpu::PointsRenderer;
pub use surface::WgpuSurface;

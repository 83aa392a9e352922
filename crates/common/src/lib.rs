//! Shared types for the pointgrid workspace.
//!
//! # Invariants
//! - Every fallible operation in the workspace reports a [`SketchError`].
//! - A [`Viewport`] never reports a zero-height aspect ratio.

mod error;
mod types;

pub use error::{SketchError, SketchResult};
pub use types::Viewport;

pub fn crate_info() -> &'static str {
    "pointgrid-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}

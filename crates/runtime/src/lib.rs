//! Runtime for the point grid: scene bootstrap, the animation loop and
//! debounced resize handling.
//!
//! # Invariants
//! - One frame callback draws at most one frame; draws never overlap.
//! - The frame clock advances by exactly one per rendered frame.
//! - Only the resize coordinator writes the viewport; it settles at most
//!   once per burst of signals.
//! - A stopped sketch never schedules another frame.
//!
//! Everything here is single-threaded and driven by the host's event loop.
//! Time is passed in explicitly so tests can step it deterministically.

mod config;
mod debounce;
mod frame;
mod headless;
mod host;
mod resize;
mod sketch;

pub use config::{CameraConfig, SketchConfig};
pub use debounce::{Debounce, Debounced};
pub use frame::{AnimationLoop, FrameClock, FrameScheduler, LoopState, StepOutcome, StopSignal};
pub use headless::{HeadlessHost, HeadlessSurface};
pub use host::{Host, RenderSurface, SurfaceOptions};
pub use resize::ResizeCoordinator;
pub use sketch::Sketch;

pub fn crate_info() -> &'static str {
    "pointgrid-runtime v0.1.0"
}

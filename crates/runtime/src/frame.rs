use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pointgrid_common::SketchResult;

/// Host hook that invokes the frame callback once before the next repaint.
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

/// Count of rendered frames. Starts at zero, never decreases, never resets.
#[derive(Debug, Default)]
pub struct FrameClock {
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one rendered frame and return the new count.
    pub fn tick(&mut self) -> u64 {
        self.frames += 1;
        self.frames
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Shared cancellation flag for the animation loop.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of an [`AnimationLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Result of driving one frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A frame was drawn; carries the clock value after the tick.
    Rendered(u64),
    /// The loop is not running; nothing was drawn or scheduled.
    Halted,
}

/// Self-perpetuating render loop: tick, draw, schedule the next frame.
///
/// Steps are strictly sequential because each one is driven by the single
/// frame callback it scheduled. Once stopped, the loop never schedules again.
#[derive(Debug)]
pub struct AnimationLoop {
    state: LoopState,
    clock: FrameClock,
    stop: StopSignal,
}

impl AnimationLoop {
    pub fn new(stop: StopSignal) -> Self {
        Self {
            state: LoopState::Idle,
            clock: FrameClock::new(),
            stop,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.clock.frames()
    }

    /// Move from `Idle` to `Running` and run the first step synchronously.
    ///
    /// Calling `start` on a loop that already left `Idle` is a no-op.
    pub fn start<D>(&mut self, scheduler: &mut dyn FrameScheduler, draw: D) -> SketchResult<StepOutcome>
    where
        D: FnOnce() -> SketchResult<()>,
    {
        if self.state != LoopState::Idle {
            return Ok(StepOutcome::Halted);
        }
        self.state = LoopState::Running;
        tracing::debug!("animation loop running");
        self.step(scheduler, draw)
    }

    /// Run one frame.
    ///
    /// The clock only advances once `draw` succeeds. A failed draw is returned
    /// to the caller and no further frame is requested; the loop stays
    /// `Running` so the caller may retry.
    pub fn step<D>(&mut self, scheduler: &mut dyn FrameScheduler, draw: D) -> SketchResult<StepOutcome>
    where
        D: FnOnce() -> SketchResult<()>,
    {
        if self.state == LoopState::Running && self.stop.is_stopped() {
            self.halt();
        }
        if self.state != LoopState::Running {
            return Ok(StepOutcome::Halted);
        }

        draw()?;
        let frame = self.clock.tick();
        scheduler.request_frame();
        tracing::trace!(frame, "frame rendered");
        Ok(StepOutcome::Rendered(frame))
    }

    /// Enter the terminal `Stopped` state.
    pub fn halt(&mut self) {
        if self.state != LoopState::Stopped {
            tracing::debug!(frames = self.clock.frames(), "animation loop stopped");
        }
        self.stop.stop();
        self.state = LoopState::Stopped;
    }
}

use std::time::{Duration, Instant};

#[derive(Debug)]
struct Pending<A> {
    deadline: Instant,
    args: A,
}

/// Trailing-edge debounce driven by explicit timestamps.
///
/// Every [`call`](Debounce::call) replaces the pending invocation and pushes
/// the deadline to `now + delay`. [`poll`](Debounce::poll) hands back the
/// arguments of the most recent call once the deadline has passed. Leading
/// edges never fire.
#[derive(Debug)]
pub struct Debounce<A> {
    delay: Duration,
    pending: Option<Pending<A>>,
}

impl<A> Debounce<A> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `args` to fire `delay` after `now`, discarding any pending call.
    ///
    /// If the pending call was already due at `now` it is not discarded: its
    /// arguments are returned so the caller can deliver the settle it missed.
    pub fn call(&mut self, now: Instant, args: A) -> Option<A> {
        let overdue = self.poll(now);
        self.pending = Some(Pending {
            deadline: now + self.delay,
            args,
        });
        overdue
    }

    /// Take the pending arguments if their deadline is at or before `now`.
    pub fn poll(&mut self, now: Instant) -> Option<A> {
        if self.pending.as_ref().is_some_and(|p| p.deadline <= now) {
            self.pending.take().map(|p| p.args)
        } else {
            None
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending call without firing it. Returns whether one existed.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

/// A callback wrapped in a [`Debounce`].
pub struct Debounced<A, F>
where
    F: FnMut(A),
{
    inner: Debounce<A>,
    callback: F,
}

impl<A, F> Debounced<A, F>
where
    F: FnMut(A),
{
    pub fn new(delay: Duration, callback: F) -> Self {
        Self {
            inner: Debounce::new(delay),
            callback,
        }
    }

    /// Fire-and-forget trigger.
    pub fn call(&mut self, now: Instant, args: A) {
        if let Some(overdue) = self.inner.call(now, args) {
            (self.callback)(overdue);
        }
    }

    /// Run the callback if the quiet period has elapsed. Returns whether it ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.inner.poll(now) {
            Some(args) => {
                (self.callback)(args);
                true
            }
            None => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline()
    }

    pub fn cancel(&mut self) -> bool {
        self.inner.cancel()
    }
}

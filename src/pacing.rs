use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

/// Time source for pacing, swappable in tests.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Enforces a minimum interval between successive send attempts.
pub struct Pacer<C: Clock = SystemClock> {
    min_interval: Duration,
    last_attempt: Cell<Option<Instant>>,
    clock: C,
}

impl Pacer<SystemClock> {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, SystemClock)
    }
}

impl<C: Clock> Pacer<C> {
    pub fn with_clock(min_interval: Duration, clock: C) -> Self {
        Self {
            min_interval,
            last_attempt: Cell::new(None),
            clock,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Block until the next attempt is allowed, then mark it as started.
    /// The first attempt never waits.
    pub fn wait_turn(&self) {
        if let Some(last) = self.last_attempt.get() {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if let Some(remaining) = self.min_interval.checked_sub(elapsed)
                && !remaining.is_zero()
            {
                trace!(remaining_ms = remaining.as_millis() as u64, "pacing send");
                self.clock.sleep(remaining);
            }
        }
        self.last_attempt.set(Some(self.clock.now()));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Manual clock: time only moves on `advance` or `sleep`.
    pub struct ManualClock {
        origin: Instant,
        offset: Cell<Duration>,
        pub sleeps: RefCell<Vec<Duration>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Cell::new(Duration::ZERO),
                sleeps: RefCell::new(Vec::new()),
            }
        }

        pub fn advance(&self, by: Duration) {
            self.offset.set(self.offset.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + self.offset.get()
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
            self.advance(duration);
        }
    }
}

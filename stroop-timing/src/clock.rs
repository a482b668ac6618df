use crate::timer::Timer;
use std::time::Duration;

/// Resettable stopwatch used to measure time since stimulus onset.
#[derive(Debug, Clone)]
pub struct Clock<T: Timer<Timestamp = u64>> {
    timer: T,
    origin: u64,
}

impl<T: Timer<Timestamp = u64>> Clock<T> {
    pub fn new(timer: T) -> Self {
        let origin = timer.now();
        Self { timer, origin }
    }

    pub fn reset(&mut self) {
        self.origin = self.timer.now();
    }

    pub fn elapsed(&self) -> Duration {
        self.timer.elapsed(self.origin)
    }

    /// Nanoseconds on the underlying timer at the last reset.
    pub fn origin(&self) -> u64 {
        self.origin
    }
}

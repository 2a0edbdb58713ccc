//! Time source for latency measurement.
//!
//! Latency is the only wall-clock quantity in a `DecisionRecord`. Injecting
//! the clock lets a run be replayed byte for byte with `StepClock`.

use std::cell::Cell;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;
}

/// Real monotonic time.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic clock: every reading advances time by `step`.
#[derive(Debug)]
pub struct StepClock {
    step: Duration,
    readings: Cell<u32>,
}

impl StepClock {
    pub fn new(step: Duration) -> Self {
        Self { step, readings: Cell::new(0) }
    }
}

impl Clock for StepClock {
    fn now(&self) -> Duration {
        let n = self.readings.get().saturating_add(1);
        self.readings.set(n);
        self.step * n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_clock_advances_per_reading() {
        let clock = StepClock::new(Duration::from_micros(10));
        let a = clock.now();
        let b = clock.now();
        assert_eq!(b - a, Duration::from_micros(10));
    }
}

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Result of checking the clock. `elapsed` is measured from the previous
/// due cycle so callbacks see real time even when the host lags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CycleTick {
    pub due: bool,
    pub elapsed: Duration,
    pub skipped: u32,
}

#[derive(Debug)]
pub struct FrameClock {
    fps: f32,
    cycle_count: u64,
    last_cycle: Instant,
    accumulator: Duration,
    last_check: Instant,
    intervals: VecDeque<Duration>,
    max_intervals: usize,
}

impl FrameClock {
    pub fn new(fps: f32) -> Self {
        Self::with_start(fps, Instant::now())
    }

    pub fn with_start(fps: f32, now: Instant) -> Self {
        Self {
            fps: fps.max(1.0),
            cycle_count: 0,
            last_cycle: now,
            accumulator: Duration::ZERO,
            last_check: now,
            intervals: VecDeque::new(),
            max_intervals: 90,
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn set_fps(&mut self, fps: f32) {
        self.fps = fps.max(1.0);
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn cycle_duration(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.fps)
    }

    pub fn next_deadline(&self) -> Instant {
        let remaining = self
            .cycle_duration()
            .checked_sub(self.accumulator)
            .unwrap_or_default();
        self.last_check + remaining
    }

    pub fn average_fps(&self) -> f32 {
        if self.intervals.is_empty() {
            return 0.0;
        }

        let sum: Duration = self.intervals.iter().copied().sum();
        let avg = sum / self.intervals.len() as u32;

        if avg.is_zero() {
            return 0.0;
        }

        1.0 / avg.as_secs_f32()
    }

    /// A lagging host gets a single due cycle; whole periods it missed are
    /// reported as `skipped` rather than replayed.
    pub fn tick(&mut self, now: Instant) -> CycleTick {
        self.accumulator += now.saturating_duration_since(self.last_check);
        self.last_check = now;

        let period = self.cycle_duration();
        if self.accumulator < period {
            return CycleTick::default();
        }

        let mut periods = 0u32;
        while self.accumulator >= period {
            self.accumulator -= period;
            periods += 1;
        }

        let elapsed = now.saturating_duration_since(self.last_cycle);
        self.last_cycle = now;
        self.cycle_count += 1;
        self.intervals.push_back(elapsed);
        if self.intervals.len() > self.max_intervals {
            self.intervals.pop_front();
        }

        CycleTick {
            due: true,
            elapsed,
            skipped: periods - 1,
        }
    }
}

use std::time::{Duration, Instant};

use crate::core::prelude::*;

pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimitState {
    pub last_accepted_at: Instant,
    /// `None` once the value has been forgotten; the timestamp still gates.
    pub last_accepted_value: Option<f32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Gate {
    Accept,
    RateLimited,
    Unchanged,
}

/// Per-control acceptance gate: a value gets through only when the interval
/// has elapsed since the last accepted value and it differs from that value.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    states: HashMap<String, RateLimitState>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT)
    }
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            states: HashMap::default(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn check(
        &self,
        control_id: &str,
        value: f32,
        now: Instant,
        allow_unchanged: bool,
    ) -> Gate {
        let Some(state) = self.states.get(control_id) else {
            return Gate::Accept;
        };

        if now.saturating_duration_since(state.last_accepted_at)
            < self.interval
        {
            return Gate::RateLimited;
        }

        if !allow_unchanged && state.last_accepted_value == Some(value) {
            return Gate::Unchanged;
        }

        Gate::Accept
    }

    pub fn accept(&mut self, control_id: &str, value: f32, now: Instant) {
        self.states.insert(
            control_id.to_string(),
            RateLimitState {
                last_accepted_at: now,
                last_accepted_value: Some(value),
            },
        );
    }

    /// Drops the cached value but keeps `last_accepted_at`, so the next
    /// sample is never suppressed as unchanged yet still waits out the
    /// interval.
    pub fn forget_value(&mut self, control_id: &str) {
        if let Some(state) = self.states.get_mut(control_id) {
            state.last_accepted_value = None;
        }
    }

    /// The last accepted raw value, used to re-emit cached samples.
    pub fn previous_value(&self, control_id: &str) -> Option<f32> {
        self.states
            .get(control_id)
            .and_then(|s| s.last_accepted_value)
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

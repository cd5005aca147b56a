use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use super::frame_clock::FrameClock;
use super::scheduler::CycleScheduler;
use crate::core::prelude::*;

/// Anything that can pace a host loop. Returns the elapsed time since the
/// previous cycle, or `None` once the source has stopped.
pub trait CycleSource {
    fn wait_for_cycle(&mut self) -> Option<Duration>;
}

/// Fixed-rate cycle source backed by a [`FrameClock`]. Sleeps the calling
/// thread until the next deadline.
#[derive(Debug)]
pub struct ClockSource {
    clock: FrameClock,
    stopped: Arc<AtomicBool>,
}

impl ClockSource {
    pub fn new(fps: f32) -> Self {
        Self {
            clock: FrameClock::new(fps),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the returned flag ends the loop before its next cycle.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stopped.clone()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }
}

impl CycleSource for ClockSource {
    fn wait_for_cycle(&mut self) -> Option<Duration> {
        loop {
            if self.stopped.load(Ordering::SeqCst) {
                return None;
            }

            let now = Instant::now();
            let tick = self.clock.tick(now);
            if tick.due {
                if tick.skipped > 0 {
                    trace!("Host lagged, skipped {} cycle(s)", tick.skipped);
                }
                return Some(tick.elapsed);
            }

            let deadline = self.clock.next_deadline();
            thread::sleep(deadline.saturating_duration_since(now));
        }
    }
}

/// Drives `scheduler` from `source` until the registration retires or the
/// source stops. Returns the number of cycles stepped.
pub fn run_until_idle<C, S>(
    source: &mut S,
    scheduler: &mut CycleScheduler<C>,
    ctx: &mut C,
) -> u64
where
    S: CycleSource + ?Sized,
{
    let mut cycles = 0;

    while scheduler.is_active() {
        let Some(delta) = source.wait_for_cycle() else {
            info!("Cycle source stopped after {} cycle(s)", cycles);
            break;
        };
        scheduler.step(ctx, delta);
        cycles += 1;
    }

    cycles
}

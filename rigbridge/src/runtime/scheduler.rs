//! Holds the single repeating callback a host drives once per cycle.
//!
//! A registration is either indefinite, counting down to an automatic
//! unregister (optionally firing a final callback on its last cycle), or
//! waiting a number of cycles before firing once. The scheduler never owns
//! the state its callbacks operate on; the host passes a context into
//! [`CycleScheduler::step`] every cycle.

use std::fmt;
use std::time::Duration;

use crate::core::prelude::*;

pub type CycleCallback<C> = Box<dyn FnMut(&mut C, Duration)>;
pub type FinalCallback<C> = Box<dyn FnOnce(&mut C, Duration)>;
pub type DeferredCallback<C> = Box<dyn FnOnce(&mut C, Duration)>;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RegistrationHandle(u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Idle,
    Indefinite,
    Counting(u32),
    Waiting(u32),
}

enum Registration<C> {
    Indefinite {
        callback: CycleCallback<C>,
    },
    Counting {
        callback: CycleCallback<C>,
        remaining: u32,
        on_complete: Option<FinalCallback<C>>,
    },
    Waiting {
        callback: Option<DeferredCallback<C>>,
        remaining: u32,
    },
}

impl<C> Registration<C> {
    fn phase(&self) -> Phase {
        match self {
            Self::Indefinite { .. } => Phase::Indefinite,
            Self::Counting { remaining, .. } => Phase::Counting(*remaining),
            Self::Waiting { remaining, .. } => Phase::Waiting(*remaining),
        }
    }
}

pub struct CycleScheduler<C> {
    active: Option<(RegistrationHandle, Registration<C>)>,
    next_handle: u64,
}

impl<C> Default for CycleScheduler<C> {
    fn default() -> Self {
        Self {
            active: None,
            next_handle: 0,
        }
    }
}

impl<C> fmt::Debug for CycleScheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleScheduler")
            .field("handle", &self.handle())
            .field("phase", &self.phase())
            .finish()
    }
}

impl<C> CycleScheduler<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `callback` every cycle until unregistered.
    pub fn register<F>(&mut self, callback: F) -> RegistrationHandle
    where
        F: FnMut(&mut C, Duration) + 'static,
    {
        self.install(Registration::Indefinite {
            callback: Box::new(callback),
        })
    }

    /// Runs `callback` on each of the next `n` cycles. On the last one
    /// `on_complete` fires right after it and the registration retires.
    pub fn register_for_n_cycles<F>(
        &mut self,
        callback: F,
        n: u32,
        on_complete: Option<FinalCallback<C>>,
    ) -> Result<RegistrationHandle, SchedulerError>
    where
        F: FnMut(&mut C, Duration) + 'static,
    {
        validate_count(n)?;
        Ok(self.install(Registration::Counting {
            callback: Box::new(callback),
            remaining: n,
            on_complete,
        }))
    }

    /// Lets `n` cycles pass, firing `callback` once on the `n`th.
    pub fn wait_n_cycles_then_run<F>(
        &mut self,
        callback: F,
        n: u32,
    ) -> Result<RegistrationHandle, SchedulerError>
    where
        F: FnOnce(&mut C, Duration) + 'static,
    {
        validate_count(n)?;
        Ok(self.install(Registration::Waiting {
            callback: Some(Box::new(callback)),
            remaining: n,
        }))
    }

    pub fn unregister(&mut self) {
        match self.active.take() {
            Some((handle, _)) => {
                info!("Unregistered cycle callback {:?}", handle)
            }
            None => info!("No active cycle callback to unregister"),
        }
    }

    /// Retires the active registration only if it is still `handle`.
    pub fn unregister_handle(&mut self, handle: RegistrationHandle) -> bool {
        if self.handle() == Some(handle) {
            self.unregister();
            true
        } else {
            info!("Cycle callback {:?} is no longer active", handle);
            false
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn handle(&self) -> Option<RegistrationHandle> {
        self.active.as_ref().map(|(handle, _)| *handle)
    }

    pub fn phase(&self) -> Phase {
        self.active
            .as_ref()
            .map_or(Phase::Idle, |(_, registration)| registration.phase())
    }

    /// Advances the active registration by one cycle. Returns whether a
    /// registration is still active afterwards.
    pub fn step(&mut self, ctx: &mut C, delta: Duration) -> bool {
        let Some((handle, registration)) = self.active.as_mut() else {
            return false;
        };
        let handle = *handle;

        let finished = match registration {
            Registration::Indefinite { callback } => {
                callback(ctx, delta);
                false
            }
            Registration::Counting {
                callback,
                remaining,
                on_complete,
            } => {
                callback(ctx, delta);
                *remaining -= 1;
                if *remaining == 0 {
                    if let Some(on_complete) = on_complete.take() {
                        on_complete(ctx, delta);
                    }
                    true
                } else {
                    false
                }
            }
            Registration::Waiting {
                callback,
                remaining,
            } => {
                *remaining -= 1;
                if *remaining == 0 {
                    if let Some(callback) = callback.take() {
                        callback(ctx, delta);
                    }
                    true
                } else {
                    false
                }
            }
        };

        if finished {
            debug!("Cycle callback {:?} completed", handle);
            self.active = None;
        }

        self.is_active()
    }

    fn install(&mut self, registration: Registration<C>) -> RegistrationHandle {
        if let Some((previous, _)) = self.active.take() {
            info!("Retiring cycle callback {:?}", previous);
        }
        let handle = RegistrationHandle(self.next_handle);
        self.next_handle += 1;
        self.active = Some((handle, registration));
        handle
    }
}

fn validate_count(n: u32) -> Result<(), SchedulerError> {
    if n == 0 {
        return Err(SchedulerError::InvalidArgument {
            argument: "n",
            value: i64::from(n),
        });
    }
    Ok(())
}

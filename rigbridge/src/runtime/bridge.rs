//! The context a [`CycleScheduler`](super::scheduler::CycleScheduler)
//! drives: transport, dispatcher and timeline owned together so one cycle
//! is a single `&mut` call.

use std::path::PathBuf;
use std::time::Instant;

use crate::control::{BridgeDispatcher, CycleReport, MappingWatcher};
use crate::core::prelude::*;
use crate::io::TransportAdapter;
use crate::timeline::TimelineBackend;

#[derive(Debug)]
pub struct Bridge<T, B> {
    transport: T,
    timeline: B,
    dispatcher: BridgeDispatcher,
    watcher: Option<MappingWatcher>,
    cycles: u64,
}

impl<T, B> Bridge<T, B>
where
    T: TransportAdapter,
    B: TimelineBackend,
{
    pub fn new(
        transport: T,
        timeline: B,
        dispatcher: BridgeDispatcher,
    ) -> Self {
        Self {
            transport,
            timeline,
            dispatcher,
            watcher: None,
            cycles: 0,
        }
    }

    pub fn with_watcher(mut self, watcher: MappingWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn cycle(&mut self) -> CycleReport {
        self.cycle_at(Instant::now())
    }

    /// One full pass: pick up a reloaded mapping, drain the transport,
    /// dispatch, then let the transport drop values that were consumed.
    pub fn cycle_at(&mut self, now: Instant) -> CycleReport {
        self.cycles += 1;

        if let Some(mapping) =
            self.watcher.as_ref().and_then(MappingWatcher::take_update)
        {
            self.dispatcher.replace_mapping(mapping);
        }

        let samples = match self.transport.poll() {
            Ok(samples) => samples,
            Err(e) => {
                error!("{}", e);
                vec![]
            }
        };

        let report =
            self.dispatcher.update(&samples, now, &mut self.timeline);

        for control_id in &report.consumed {
            self.transport.forget(control_id);
        }

        if !report.failed.is_empty() {
            trace!("Cycle {} failures: {:?}", self.cycles, report.failed);
        }

        report
    }

    /// Exports to the dispatcher's configured target.
    pub fn export(&mut self) -> BackendResult<PathBuf> {
        let target = self.dispatcher.export_target().clone();
        self.timeline.export(&target)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn timeline(&self) -> &B {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut B {
        &mut self.timeline
    }

    pub fn dispatcher(&self) -> &BridgeDispatcher {
        &self.dispatcher
    }
}

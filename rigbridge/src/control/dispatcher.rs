//! The per-cycle loop that turns control samples into timeline mutations.
//!
//! For each sample, in control id order:
//!
//! 1. skip if the sample has no value or its id has no mapping
//! 2. skip if the id's rate-limit interval hasn't elapsed
//! 3. skip if the value equals the last accepted one, unless it's the time
//!    knob sitting at either bound
//! 4. record the value, convert it and dispatch by action kind. The time knob
//!    then forgets its cached value (its timestamp stays) so a pinned value
//!    keeps re-triggering once per interval.

use std::time::{Duration, Instant};

use super::conversion::{
    is_at_bound, is_lower_bound, is_upper_bound, to_canonical,
};
use super::mapping::{ActionDescriptor, MappingTable, NamedAction, Target};
use super::rate_limit::{Gate, RateLimiter};
use super::remove_keys::RemoveKeysCapture;
use super::time_knob::{StepSize, StepSizes, TimeKnobState};
use crate::core::prelude::*;
use crate::io::transport::ControlSample;
use crate::timeline::{ExportTarget, Modus, TimelineBackend};

#[derive(Clone, Debug)]
pub struct DispatcherSettings {
    pub rate_limit: Duration,
    pub step_sizes: StepSizes,
    pub export_target: ExportTarget,
    /// Controls zeroed by `KeyframeAllZero`.
    pub zero_all: Vec<String>,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            rate_limit: super::rate_limit::DEFAULT_RATE_LIMIT,
            step_sizes: StepSizes::default(),
            export_target: ExportTarget::new("file_name_test", "exports"),
            zero_all: vec![],
        }
    }
}

/// What happened during one [`BridgeDispatcher::update`].
#[derive(Debug, Default, PartialEq)]
pub struct CycleReport {
    /// Control ids whose dispatch ran, in dispatch order.
    pub dispatched: Vec<String>,
    /// Control ids whose dispatch failed against the backend.
    pub failed: Vec<String>,
    /// Control ids the transport should forget.
    pub consumed: Vec<String>,
}

#[derive(Debug)]
pub struct BridgeDispatcher {
    mapping: MappingTable,
    rate_limiter: RateLimiter,
    time_knob: TimeKnobState,
    remove_keys: RemoveKeysCapture,
    export_target: ExportTarget,
    zero_all: Vec<String>,
}

impl BridgeDispatcher {
    pub fn new(mapping: MappingTable, settings: DispatcherSettings) -> Self {
        Self {
            mapping,
            rate_limiter: RateLimiter::new(settings.rate_limit),
            time_knob: TimeKnobState::new(settings.step_sizes),
            remove_keys: RemoveKeysCapture::default(),
            export_target: settings.export_target,
            zero_all: settings.zero_all,
        }
    }

    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    pub fn time_knob(&self) -> &TimeKnobState {
        &self.time_knob
    }

    pub fn remove_keys(&self) -> &RemoveKeysCapture {
        &self.remove_keys
    }

    pub fn export_target(&self) -> &ExportTarget {
        &self.export_target
    }

    /// Swaps in a freshly loaded table. Cached values and open remove-keys
    /// intervals belong to the old table and are dropped.
    pub fn replace_mapping(&mut self, mapping: MappingTable) {
        info!("Replacing control mapping ({} entries)", mapping.len());
        self.mapping = mapping;
        self.rate_limiter.clear();
        self.remove_keys.clear();
    }

    pub fn update<B>(
        &mut self,
        samples: &[ControlSample],
        now: Instant,
        timeline: &mut B,
    ) -> CycleReport
    where
        B: TimelineBackend + ?Sized,
    {
        let mut report = CycleReport::default();

        let mut ordered: Vec<&ControlSample> = samples.iter().collect();
        ordered.sort_by(|a, b| a.control_id.cmp(&b.control_id));
        // At most one sample per id; the last one reported wins.
        ordered.reverse();
        ordered.dedup_by(|a, b| a.control_id == b.control_id);
        ordered.reverse();

        for sample in ordered {
            let control_id = sample.control_id.as_str();

            let Some(raw) = sample.value else {
                continue;
            };

            let Some(action) = self.mapping.get(control_id).cloned() else {
                continue;
            };

            let converted = to_canonical(raw);
            let bypass_unchanged =
                action.is_time_knob() && is_at_bound(converted);

            let gate =
                self.rate_limiter.check(control_id, raw, now, bypass_unchanged);
            match gate {
                Gate::Accept => {}
                Gate::RateLimited => {
                    trace!("{} rate limited", control_id);
                    continue;
                }
                Gate::Unchanged => {
                    trace!("{} unchanged at {}", control_id, raw);
                    continue;
                }
            }

            self.rate_limiter.accept(control_id, raw, now);

            match self.dispatch(control_id, &action, converted, timeline) {
                Ok(()) => {
                    debug!(
                        "Updated {} to {} with mapping {:?}",
                        control_id, converted, action
                    );
                }
                Err(e) => {
                    warn!("{}: {}", control_id, e);
                    report.failed.push(control_id.to_string());
                }
            }
            report.dispatched.push(control_id.to_string());

            if action.is_time_knob() {
                self.rate_limiter.forget_value(control_id);
                report.consumed.push(control_id.to_string());
            }
        }

        report
    }

    fn dispatch<B>(
        &mut self,
        control_id: &str,
        action: &ActionDescriptor,
        value: f32,
        timeline: &mut B,
    ) -> BackendResult<()>
    where
        B: TimelineBackend + ?Sized,
    {
        match action {
            ActionDescriptor::Named(named) => {
                self.dispatch_named(control_id, named, value, timeline)
            }
            ActionDescriptor::Target(target) => {
                set_key_at_current_frame(timeline, target, value)
            }
            ActionDescriptor::Composite { refs } => {
                self.dispatch_composite(refs, timeline)
            }
        }
    }

    fn dispatch_named<B>(
        &mut self,
        control_id: &str,
        action: &NamedAction,
        value: f32,
        timeline: &mut B,
    ) -> BackendResult<()>
    where
        B: TimelineBackend + ?Sized,
    {
        // One-shot buttons fire on press and ignore their release.
        let released = is_lower_bound(value);

        match action {
            NamedAction::TimeKnob => {
                let step = self.time_knob.advance(value);
                let frame = timeline.jump_frames(step.delta())?;
                trace!("time knob {:?} -> frame {}", step, frame);
            }
            NamedAction::TimeKnobSlow => {
                self.time_knob.apply_speed_button(StepSize::Slow, value);
            }
            NamedAction::TimeKnobFast => {
                self.time_knob.apply_speed_button(StepSize::Fast, value);
            }
            NamedAction::SaveSequence if !released => {
                timeline.export(&self.export_target)?;
            }
            NamedAction::FrameForward if !released => {
                timeline.step_forward()?;
            }
            NamedAction::FrameBackward if !released => {
                timeline.step_backward()?;
            }
            NamedAction::PlayPause if !released => {
                let playing = timeline.toggle_playback()?;
                info!("{}", crate::ternary!(playing, "Playing", "Paused"));
            }
            NamedAction::KeyframeAllZero if !released => {
                self.zero_all_controls(timeline)?;
            }
            NamedAction::RemoveKeys { target } => {
                self.capture_remove_keys(control_id, target, value, timeline)?;
            }
            _ => {
                trace!("{} released", control_id);
            }
        }

        Ok(())
    }

    fn zero_all_controls<B>(&self, timeline: &mut B) -> BackendResult<()>
    where
        B: TimelineBackend + ?Sized,
    {
        let frame = timeline.current_frame()?;
        for name in &self.zero_all {
            if let Err(e) = timeline.set_key(name, frame, 0.0, Modus::Float) {
                warn!("Unable to zero {}: {}", name, e);
            }
        }
        Ok(())
    }

    fn capture_remove_keys<B>(
        &mut self,
        control_id: &str,
        target: &str,
        value: f32,
        timeline: &mut B,
    ) -> BackendResult<()>
    where
        B: TimelineBackend + ?Sized,
    {
        if is_upper_bound(value) {
            let frame = timeline.current_frame()?;
            self.remove_keys.press(control_id, frame);
            debug!("{} recording {} from frame {}", control_id, target, frame);
        } else if is_lower_bound(value) {
            if self.remove_keys.recorded_start(control_id).is_none() {
                return Ok(());
            }
            let frame = timeline.current_frame()?;
            if let Some((start, end)) =
                self.remove_keys.release(control_id, frame)
            {
                let removed =
                    timeline.delete_keys_in_range(target, start, end)?;
                info!(
                    "Removed {} keys from {} in [{}, {}]",
                    removed, target, start, end
                );
            }
        }
        Ok(())
    }

    fn dispatch_composite<B>(
        &self,
        refs: &[String],
        timeline: &mut B,
    ) -> BackendResult<()>
    where
        B: TimelineBackend + ?Sized,
    {
        for reference in refs {
            let Some(previous) = self.rate_limiter.previous_value(reference)
            else {
                continue;
            };
            let Some(target) = self.mapping.target(reference) else {
                continue;
            };
            let value = to_canonical(previous);
            if let Err(e) = set_key_at_current_frame(timeline, target, value) {
                warn!(
                    "Unable to re-emit {} to {}: {}",
                    reference, target.name, e
                );
            }
        }
        Ok(())
    }
}

fn set_key_at_current_frame<B>(
    timeline: &mut B,
    target: &Target,
    value: f32,
) -> BackendResult<()>
where
    B: TimelineBackend + ?Sized,
{
    let frame = timeline.current_frame()?;
    timeline.set_key(&target.name, frame, value, target.modus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::config::parse_json;
    use crate::control::time_knob::StepSize;
    use crate::timeline::{Frame, MemoryTimeline};

    const MAPPING: &str = r#"{
        "knob": "TimeKnob",
        "knob/slow": "TimeKnobSlow",
        "knob/fast": "TimeKnobFast",
        "fwd": "FrameForward",
        "play": "PlayPause",
        "zero": "KeyframeAllZero",
        "rk": "RemoveKeysX",
        "fader": ["X", "Float"],
        "rot": ["Y", "RotatorZ"],
        "recall": { "set_prev": ["fader", "rot"] }
    }"#;

    fn dispatcher() -> BridgeDispatcher {
        let file = parse_json(MAPPING).unwrap();
        let (table, errors) = MappingTable::resolve(&file);
        assert!(errors.is_empty());
        BridgeDispatcher::new(
            table,
            DispatcherSettings {
                zero_all: vec!["X".into(), "Y".into()],
                ..DispatcherSettings::default()
            },
        )
    }

    fn timeline() -> MemoryTimeline {
        MemoryTimeline::new("test", (0, 240), 24)
    }

    fn at(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    fn sample(id: &str, value: f32, now: Instant) -> Vec<ControlSample> {
        vec![ControlSample::new(id, value, now)]
    }

    #[test]
    fn test_unchanged_sample_is_dispatched_once() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();

        let first = d.update(&sample("fader", 0.75, start), start, &mut t);
        let second =
            d.update(&sample("fader", 0.75, start), at(start, 10), &mut t);
        let third =
            d.update(&sample("fader", 0.75, start), at(start, 100), &mut t);

        assert_eq!(first.dispatched, vec!["fader"]);
        assert!(second.dispatched.is_empty());
        assert!(third.dispatched.is_empty());
        assert_eq!(t.keys("X", Modus::Float), vec![(0, 50.0)]);
    }

    #[test]
    fn test_rate_limit_interval() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();

        d.update(&sample("fader", 0.2, start), start, &mut t);
        let within =
            d.update(&sample("fader", 0.4, start), at(start, 10), &mut t);
        assert!(within.dispatched.is_empty());

        let mut d = dispatcher();
        d.update(&sample("fader", 0.2, start), start, &mut t);
        let after =
            d.update(&sample("fader", 0.4, start), at(start, 60), &mut t);
        assert_eq!(after.dispatched, vec!["fader"]);
    }

    #[test]
    fn test_time_knob_pinned_at_bound_keeps_stepping() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();
        t.jump_to_frame(100).unwrap();

        let mut frames = vec![];
        for (i, raw) in [0.5, 1.0, 1.0].into_iter().enumerate() {
            let now = at(start, i as u64 * 60);
            let report = d.update(&sample("knob", raw, now), now, &mut t);
            assert_eq!(report.dispatched, vec!["knob"]);
            assert_eq!(report.consumed, vec!["knob"]);
            frames.push(t.current_frame().unwrap());
        }

        // 0 ties with the initial position and steps back, then two forward.
        assert_eq!(frames, vec![95, 100, 105]);
    }

    #[test]
    fn test_pinned_time_knob_respects_rate_limit() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();

        let first = d.update(&sample("knob", 1.0, start), start, &mut t);
        let within =
            d.update(&sample("knob", 1.0, start), at(start, 10), &mut t);

        assert_eq!(first.dispatched, vec!["knob"]);
        assert!(within.dispatched.is_empty());
        assert!(within.consumed.is_empty());
        assert_eq!(t.current_frame().unwrap(), 5);

        d.update(&sample("knob", 1.0, start), at(start, 60), &mut t);
        assert_eq!(t.current_frame().unwrap(), 10);
    }

    #[test]
    fn test_time_knob_speed_buttons() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();

        d.update(&sample("knob/fast", 1.0, start), start, &mut t);
        assert_eq!(d.time_knob().step_size(), StepSize::Fast);
        d.update(&sample("knob", 0.75, start), start, &mut t);
        assert_eq!(t.current_frame().unwrap(), 10);

        d.update(&sample("knob/fast", 0.0, start), at(start, 60), &mut t);
        assert_eq!(d.time_knob().step_size(), StepSize::Normal);
    }

    #[test]
    fn test_same_cycle_order_is_by_control_id() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();

        let samples = vec![
            ControlSample::new("knob/slow", 1.0, start),
            ControlSample::new("knob/fast", 1.0, start),
        ];
        let report = d.update(&samples, start, &mut t);

        assert_eq!(report.dispatched, vec!["knob/fast", "knob/slow"]);
        assert_eq!(d.time_knob().step_size(), StepSize::Slow);
    }

    #[test]
    fn test_duplicate_ids_keep_last_sample() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();

        let samples = vec![
            ControlSample::new("fader", 0.0, start),
            ControlSample::new("fader", 1.0, start),
        ];
        let report = d.update(&samples, start, &mut t);

        assert_eq!(report.dispatched, vec!["fader"]);
        assert_eq!(t.keys("X", Modus::Float), vec![(0, 100.0)]);
    }

    #[test]
    fn test_absent_and_unmapped_samples_are_skipped() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();

        let samples = vec![
            ControlSample::empty("fader", start),
            ControlSample::new("unmapped", 0.3, start),
        ];
        let report = d.update(&samples, start, &mut t);

        assert!(report.dispatched.is_empty());
        assert_eq!(t.key_count("X"), 0);
    }

    fn seed_keys(t: &mut MemoryTimeline, frames: &[Frame]) {
        for frame in frames {
            t.set_key("X", *frame, 1.0, Modus::Float).unwrap();
        }
    }

    #[test]
    fn test_remove_keys_press_release() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();
        seed_keys(&mut t, &[5, 10, 20, 40, 50]);

        t.jump_to_frame(10).unwrap();
        d.update(&sample("rk", 1.0, start), start, &mut t);
        assert_eq!(d.remove_keys().recorded_start("rk"), Some(10));

        t.jump_to_frame(40).unwrap();
        d.update(&sample("rk", 0.0, start), at(start, 60), &mut t);

        let remaining: Vec<Frame> =
            t.keys("X", Modus::Float).into_iter().map(|(f, _)| f).collect();
        assert_eq!(remaining, vec![5, 50]);
    }

    #[test]
    fn test_remove_keys_release_alone_is_noop() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();
        seed_keys(&mut t, &[5, 10]);

        let report = d.update(&sample("rk", 0.0, start), start, &mut t);

        assert!(report.failed.is_empty());
        assert_eq!(t.key_count("X"), 2);
    }

    #[test]
    fn test_replace_mapping_drops_open_intervals() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();
        seed_keys(&mut t, &[5, 10]);

        d.update(&sample("rk", 1.0, start), start, &mut t);
        let table = d.mapping().clone();
        d.replace_mapping(table);
        d.update(&sample("rk", 0.0, start), at(start, 60), &mut t);

        assert_eq!(t.key_count("X"), 2);
    }

    #[test]
    fn test_composite_ignores_referenced_rate_limit() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();

        d.update(&sample("fader", 0.75, start), start, &mut t);
        t.jump_to_frame(12).unwrap();

        // The fader is still inside its own window here.
        let report =
            d.update(&sample("recall", 1.0, start), at(start, 5), &mut t);

        assert_eq!(report.dispatched, vec!["recall"]);
        assert_eq!(t.keys("X", Modus::Float), vec![(0, 50.0), (12, 50.0)]);
        // `rot` was never seen, so there's nothing to re-emit for it.
        assert_eq!(t.key_count("Y"), 0);
    }

    #[test]
    fn test_composite_continues_past_failed_target() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();

        let samples = vec![
            ControlSample::new("fader", 0.75, start),
            ControlSample::new("rot", 0.25, start),
        ];
        d.update(&samples, start, &mut t);

        let mut t = timeline().with_bound_controls(["Y"]);
        t.jump_to_frame(4).unwrap();
        let report =
            d.update(&sample("recall", 1.0, start), at(start, 5), &mut t);

        assert_eq!(report.dispatched, vec!["recall"]);
        assert!(report.failed.is_empty());
        assert_eq!(t.key_count("X"), 0);
        assert_eq!(t.keys("Y", Modus::RotatorZ), vec![(4, -50.0)]);
    }

    #[test]
    fn test_direct_target_uses_modus() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();
        t.jump_to_frame(3).unwrap();

        d.update(&sample("rot", 0.25, start), start, &mut t);

        assert_eq!(t.keys("Y", Modus::RotatorZ), vec![(3, -50.0)]);
    }

    #[test]
    fn test_one_shot_buttons_ignore_release() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();

        d.update(&sample("fwd", 1.0, start), start, &mut t);
        d.update(&sample("fwd", 0.0, start), at(start, 60), &mut t);
        d.update(&sample("fwd", 1.0, start), at(start, 120), &mut t);
        assert_eq!(t.current_frame().unwrap(), 2);

        d.update(&sample("play", 1.0, start), start, &mut t);
        d.update(&sample("play", 0.0, start), at(start, 60), &mut t);
        assert!(t.is_playing().unwrap());
    }

    #[test]
    fn test_keyframe_all_zero() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline();
        t.jump_to_frame(7).unwrap();

        d.update(&sample("zero", 1.0, start), start, &mut t);

        assert_eq!(t.keys("X", Modus::Float), vec![(7, 0.0)]);
        assert_eq!(t.keys("Y", Modus::Float), vec![(7, 0.0)]);
    }

    #[test]
    fn test_backend_failure_only_affects_its_control() {
        let start = Instant::now();
        let mut d = dispatcher();
        let mut t = timeline().with_bound_controls(["X"]);

        let samples = vec![
            ControlSample::new("fader", 1.0, start),
            ControlSample::new("rot", 1.0, start),
        ];
        let report = d.update(&samples, start, &mut t);

        assert_eq!(report.dispatched, vec!["fader", "rot"]);
        assert_eq!(report.failed, vec!["rot"]);
        assert_eq!(t.key_count("X"), 1);
    }
}

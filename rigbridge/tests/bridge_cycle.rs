mod support;

use std::fs;

use rigbridge::prelude::*;
use support::{RecordingTimeline, ScriptedTransport, Step, at};
use tempfile::TempDir;

const MAPPING: &str = r#"{
    "knob": "TimeKnob",
    "knob_slow": "TimeKnobSlow",
    "fader": ["X", "Float"],
    "erase": "RemoveKeysX",
    "save": "SaveSequence",
    "play": "PlayPause"
}"#;

type TestBridge = Bridge<ScriptedTransport, RecordingTimeline>;

/// The returned guard owns the export directory; keep it alive.
fn bridge(script: Vec<Step>) -> (TempDir, TestBridge) {
    let dir = support::temp_dir();
    let bridge = Bridge::new(
        ScriptedTransport::new(script),
        RecordingTimeline::new(),
        support::dispatcher(MAPPING, dir.path().to_path_buf()),
    );
    (dir, bridge)
}

#[test]
fn test_time_knob_is_forgotten_after_dispatch() {
    let (_dir, mut bridge) = bridge(
        vec![
            Step::Values(vec![("knob", 1.0)]),
            Step::Values(vec![]),
            Step::Values(vec![("knob", 1.0)]),
        ],
    );
    let start = std::time::Instant::now();

    let first = bridge.cycle_at(start);
    assert_eq!(first.consumed, vec!["knob"]);
    assert_eq!(bridge.timeline().current_frame().unwrap(), 5);
    assert_eq!(bridge.transport().forgotten, vec!["knob"]);

    // Nothing new arrived, so the knob does not step again.
    let idle = bridge.cycle_at(at(start, 100));
    assert!(idle.dispatched.is_empty());
    assert_eq!(bridge.timeline().current_frame().unwrap(), 5);

    // Pinned at the top, a repeat still steps forward.
    bridge.cycle_at(at(start, 110));
    assert_eq!(bridge.timeline().current_frame().unwrap(), 10);
}

#[test]
fn test_speed_button_changes_knob_step() {
    let (_dir, mut bridge) = bridge(
        vec![
            Step::Values(vec![("knob_slow", 1.0)]),
            Step::Values(vec![("knob", 1.0)]),
            Step::Values(vec![("knob_slow", 0.0)]),
            Step::Values(vec![("knob", 0.0)]),
        ],
    );
    let start = std::time::Instant::now();

    bridge.cycle_at(start);
    bridge.cycle_at(at(start, 100));
    assert_eq!(bridge.timeline().current_frame().unwrap(), 1);

    bridge.cycle_at(at(start, 200));
    bridge.cycle_at(at(start, 300));
    // Back to the normal step, moving backward and clamped at the start.
    assert_eq!(bridge.timeline().current_frame().unwrap(), 0);
    assert_eq!(bridge.dispatcher().time_knob().step_size(), StepSize::Normal);
}

#[test]
fn test_remove_keys_across_cycles() {
    let (_dir, mut bridge) = bridge(
        vec![
            Step::Values(vec![("fader", 0.25)]),
            Step::Values(vec![("erase", 1.0)]),
            Step::Values(vec![("fader", 0.5)]),
            Step::Values(vec![("erase", 0.0)]),
        ],
    );
    let start = std::time::Instant::now();

    bridge.timeline_mut().jump_to_frame(10).unwrap();
    bridge.cycle_at(start);
    bridge.cycle_at(at(start, 100));
    bridge.timeline_mut().jump_to_frame(40).unwrap();
    bridge.cycle_at(at(start, 200));
    bridge.cycle_at(at(start, 300));

    let timeline = bridge.timeline();
    assert_eq!(timeline.deletions, vec![("X".to_string(), 10, 40)]);
    assert_eq!(timeline.inner.key_count("X"), 0);
}

#[test]
fn test_transport_failure_is_an_empty_cycle() {
    let (_dir, mut bridge) = bridge(
        vec![Step::Fail, Step::Values(vec![("fader", 1.0)])],
    );
    let start = std::time::Instant::now();

    let failed = bridge.cycle_at(start);
    assert_eq!(failed, CycleReport::default());

    let next = bridge.cycle_at(at(start, 100));
    assert_eq!(next.dispatched, vec!["fader"]);
    assert_eq!(bridge.cycles(), 2);
}

#[test]
fn test_save_button_exports_once() {
    let (_dir, mut bridge) = bridge(
        vec![
            Step::Values(vec![("fader", 1.0)]),
            Step::Values(vec![("save", 1.0)]),
            Step::Values(vec![("save", 0.0)]),
        ],
    );
    let start = std::time::Instant::now();

    for i in 0..3 {
        bridge.cycle_at(at(start, i * 100));
    }

    let exports = &bridge.timeline().exports;
    assert_eq!(exports.len(), 1);
    let exported = fs::read_to_string(&exports[0]).unwrap();
    assert!(exported.contains("\"X\""));
}

#[test]
fn test_scheduler_drives_bridge_for_n_cycles() {
    let (_dir, mut bridge) = bridge(
        vec![
            Step::Values(vec![("play", 1.0)]),
            Step::Values(vec![("play", 0.0)]),
            Step::Values(vec![("fader", 0.75)]),
        ],
    );
    type Ctx = TestBridge;
    let mut scheduler = CycleScheduler::<Ctx>::new();
    scheduler
        .register_for_n_cycles(
            |bridge: &mut Ctx, _| {
                bridge.cycle();
            },
            3,
            Some(Box::new(|bridge: &mut Ctx, _| {
                bridge.export().unwrap();
            })),
        )
        .unwrap();

    let mut steps = 0;
    while scheduler.step(&mut bridge, std::time::Duration::from_millis(60)) {
        steps += 1;
        std::thread::sleep(std::time::Duration::from_millis(60));
    }

    assert_eq!(steps, 2);
    assert_eq!(bridge.cycles(), 3);
    assert!(bridge.timeline().is_playing().unwrap());
    assert_eq!(bridge.timeline().exports.len(), 1);
    assert_eq!(bridge.timeline().keys_set, 1);
}

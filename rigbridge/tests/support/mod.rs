#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use rigbridge::prelude::*;
use tempfile::TempDir;

/// One poll's worth of device activity: values that arrived since the last
/// poll, or a read failure.
pub enum Step {
    Values(Vec<(&'static str, f32)>),
    Fail,
}

/// Behaves like the real transports: values stick around until the device
/// sends a new one or the bridge asks for them to be forgotten.
pub struct ScriptedTransport {
    script: VecDeque<Step>,
    latest: LatestValues,
    pub forgotten: Vec<String>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: script.into(),
            latest: LatestValues::default(),
            forgotten: vec![],
        }
    }
}

impl TransportAdapter for ScriptedTransport {
    fn poll(&mut self) -> Result<Vec<ControlSample>, TransportError> {
        match self.script.pop_front() {
            Some(Step::Values(values)) => {
                let now = Instant::now();
                for (id, value) in values {
                    self.latest.set(id, Some(value), now);
                }
            }
            Some(Step::Fail) => {
                return Err(TransportError::Read("scripted failure".into()));
            }
            None => {}
        }
        Ok(self.latest.samples())
    }

    fn forget(&mut self, control_id: &str) {
        self.forgotten.push(control_id.to_string());
        self.latest.remove(control_id);
    }
}

/// Wraps a [`MemoryTimeline`] and records the calls tests care about.
pub struct RecordingTimeline {
    pub inner: MemoryTimeline,
    pub deletions: Vec<(String, Frame, Frame)>,
    pub exports: Vec<PathBuf>,
    pub keys_set: usize,
}

impl RecordingTimeline {
    pub fn new() -> Self {
        Self {
            inner: MemoryTimeline::new("test", (0, 100), 24),
            deletions: vec![],
            exports: vec![],
            keys_set: 0,
        }
    }
}

impl TimelineBackend for RecordingTimeline {
    fn current_frame(&self) -> BackendResult<Frame> {
        self.inner.current_frame()
    }

    fn set_current_frame(&mut self, frame: Frame) -> BackendResult<()> {
        self.inner.set_current_frame(frame)
    }

    fn playback_range(&self) -> BackendResult<(Frame, Frame)> {
        self.inner.playback_range()
    }

    fn set_playback_range(
        &mut self,
        start: Frame,
        end: Frame,
    ) -> BackendResult<()> {
        self.inner.set_playback_range(start, end)
    }

    fn initial_playback_range(&self) -> BackendResult<(Frame, Frame)> {
        self.inner.initial_playback_range()
    }

    fn is_playing(&self) -> BackendResult<bool> {
        self.inner.is_playing()
    }

    fn play(&mut self) -> BackendResult<()> {
        self.inner.play()
    }

    fn pause(&mut self) -> BackendResult<()> {
        self.inner.pause()
    }

    fn set_key(
        &mut self,
        control: &str,
        frame: Frame,
        value: f32,
        modus: Modus,
    ) -> BackendResult<()> {
        self.keys_set += 1;
        self.inner.set_key(control, frame, value, modus)
    }

    fn value_at(
        &self,
        control: &str,
        frame: Frame,
        modus: Modus,
    ) -> BackendResult<Option<f32>> {
        self.inner.value_at(control, frame, modus)
    }

    fn delete_keys_in_range(
        &mut self,
        control: &str,
        start: Frame,
        end: Frame,
    ) -> BackendResult<usize> {
        self.deletions.push((control.to_string(), start, end));
        self.inner.delete_keys_in_range(control, start, end)
    }

    fn export(&mut self, target: &ExportTarget) -> BackendResult<PathBuf> {
        let path = self.inner.export(target)?;
        self.exports.push(path.clone());
        Ok(path)
    }
}

/// Scratch directory removed when the guard drops.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("create temp dir")
}

pub fn mapping(json: &str) -> MappingTable {
    let file = parse_json_mapping(json);
    let (table, errors) = MappingTable::resolve(&file);
    assert!(errors.is_empty(), "{:?}", errors);
    table
}

fn parse_json_mapping(json: &str) -> MappingFile {
    rigbridge::control::config::parse_json(json).expect("parse mapping")
}

pub fn dispatcher(json: &str, export_dir: PathBuf) -> BridgeDispatcher {
    BridgeDispatcher::new(
        mapping(json),
        DispatcherSettings {
            export_target: ExportTarget::new("take", export_dir),
            ..Default::default()
        },
    )
}

/// `start + ms`, for spacing cycles past the rate limit.
pub fn at(start: Instant, ms: u64) -> Instant {
    start + Duration::from_millis(ms)
}

//! The keyframe timeline the bridge writes into. The real timeline lives in
//! a host application; [`TimelineBackend`] is the seam, and
//! [`MemoryTimeline`] is a self-contained implementation used by the CLI and
//! the tests.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::core::prelude::*;

mod memory;

pub use memory::MemoryTimeline;

pub type Frame = i64;

/// How a value is applied to a keyframe target.
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Modus {
    Float,
    RotatorX,
    RotatorY,
    RotatorZ,
    EulerRotationX,
    EulerRotationY,
    EulerRotationZ,
    EulerTransformX,
    EulerTransformY,
    EulerTransformZ,
}

impl Modus {
    pub const ALL: [Modus; 10] = [
        Modus::Float,
        Modus::RotatorX,
        Modus::RotatorY,
        Modus::RotatorZ,
        Modus::EulerRotationX,
        Modus::EulerRotationY,
        Modus::EulerRotationZ,
        Modus::EulerTransformX,
        Modus::EulerTransformY,
        Modus::EulerTransformZ,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modus::Float => "Float",
            Modus::RotatorX => "RotatorX",
            Modus::RotatorY => "RotatorY",
            Modus::RotatorZ => "RotatorZ",
            Modus::EulerRotationX => "EulerRotationX",
            Modus::EulerRotationY => "EulerRotationY",
            Modus::EulerRotationZ => "EulerRotationZ",
            Modus::EulerTransformX => "EulerTransformX",
            Modus::EulerTransformY => "EulerTransformY",
            Modus::EulerTransformZ => "EulerTransformZ",
        }
    }
}

impl fmt::Display for Modus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Modus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Modus::ALL
            .iter()
            .find(|modus| modus.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown modus: {}", s))
    }
}

/// Where [`TimelineBackend::export`] writes its baked result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportTarget {
    pub name: String,
    pub dir: PathBuf,
}

impl ExportTarget {
    pub fn new(name: &str, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            dir: dir.into(),
        }
    }
}

pub trait TimelineBackend {
    fn current_frame(&self) -> BackendResult<Frame>;
    fn set_current_frame(&mut self, frame: Frame) -> BackendResult<()>;

    fn playback_range(&self) -> BackendResult<(Frame, Frame)>;
    fn set_playback_range(
        &mut self,
        start: Frame,
        end: Frame,
    ) -> BackendResult<()>;

    /// The playback range captured when the timeline was opened.
    fn initial_playback_range(&self) -> BackendResult<(Frame, Frame)>;

    fn is_playing(&self) -> BackendResult<bool>;
    fn play(&mut self) -> BackendResult<()>;
    fn pause(&mut self) -> BackendResult<()>;

    fn set_key(
        &mut self,
        control: &str,
        frame: Frame,
        value: f32,
        modus: Modus,
    ) -> BackendResult<()>;

    /// The value `control` holds at `frame` under `modus`, if any key at or
    /// before `frame` exists.
    fn value_at(
        &self,
        control: &str,
        frame: Frame,
        modus: Modus,
    ) -> BackendResult<Option<f32>>;

    /// Deletes every key of `control` (all modi) within `[start, end]`
    /// inclusive and returns how many were removed.
    fn delete_keys_in_range(
        &mut self,
        control: &str,
        start: Frame,
        end: Frame,
    ) -> BackendResult<usize>;

    fn export(&mut self, target: &ExportTarget) -> BackendResult<PathBuf>;

    /// Returns the new playback state.
    fn toggle_playback(&mut self) -> BackendResult<bool> {
        if self.is_playing()? {
            self.pause()?;
            Ok(false)
        } else {
            self.play()?;
            Ok(true)
        }
    }

    fn jump_to_frame(&mut self, frame: Frame) -> BackendResult<Frame> {
        self.set_current_frame(frame)?;
        self.current_frame()
    }

    /// Moves the playhead by a signed number of frames and returns where it
    /// landed.
    fn jump_frames(&mut self, delta: Frame) -> BackendResult<Frame> {
        let current = self.current_frame()?;
        self.jump_to_frame(current.saturating_add(delta))
    }

    fn step_forward(&mut self) -> BackendResult<Frame> {
        self.jump_frames(1)
    }

    fn step_backward(&mut self) -> BackendResult<Frame> {
        self.jump_frames(-1)
    }

    /// `percent` is in `[0, 100]` of the current playback range.
    fn jump_to_percent(&mut self, percent: f32) -> BackendResult<Frame> {
        let (start, end) = self.playback_range()?;
        let t = clamp(percent, 0.0, 100.0) / 100.0;
        let frame = start + ((end - start) as f32 * t).round() as Frame;
        self.jump_to_frame(frame)
    }

    fn reset_playback_range(&mut self) -> BackendResult<(Frame, Frame)> {
        let (start, end) = self.initial_playback_range()?;
        self.set_playback_range(start, end)?;
        Ok((start, end))
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use super::{ExportTarget, Frame, Modus, TimelineBackend};
use crate::core::prelude::*;

type Channel = BTreeMap<Frame, f32>;
type Track = BTreeMap<Modus, Channel>;

/// A keyframe store that lives entirely in memory. The playhead is kept
/// inside the playback range.
#[derive(Debug)]
pub struct MemoryTimeline {
    name: String,
    frame_rate: u32,
    active: bool,
    playing: bool,
    current_frame: Frame,
    range: (Frame, Frame),
    initial_range: (Frame, Frame),
    tracks: BTreeMap<String, Track>,

    /// When set, only these control names accept keys.
    bound_controls: Option<HashSet<String>>,
}

#[derive(Serialize)]
struct BakedTimeline<'a> {
    name: &'a str,
    frame_rate: u32,
    start: Frame,
    end: Frame,
    tracks: BTreeMap<&'a str, BTreeMap<&'static str, Vec<(Frame, f32)>>>,
}

impl MemoryTimeline {
    pub fn new(name: &str, range: (Frame, Frame), frame_rate: u32) -> Self {
        let range = ordered(range.0, range.1);
        Self {
            name: name.to_string(),
            frame_rate,
            active: true,
            playing: false,
            current_frame: range.0,
            range,
            initial_range: range,
            tracks: BTreeMap::new(),
            bound_controls: None,
        }
    }

    pub fn with_bound_controls<I, S>(mut self, controls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bound_controls =
            Some(controls.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Detaches the timeline; every subsequent call fails with
    /// [`BackendError::NoActiveTimeline`].
    pub fn close(&mut self) {
        self.active = false;
        self.playing = false;
    }

    pub fn key_count(&self, control: &str) -> usize {
        self.tracks
            .get(control)
            .map(|track| track.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    pub fn keys(&self, control: &str, modus: Modus) -> Vec<(Frame, f32)> {
        self.tracks
            .get(control)
            .and_then(|track| track.get(&modus))
            .map(|channel| channel.iter().map(|(f, v)| (*f, *v)).collect())
            .unwrap_or_default()
    }

    fn ensure_active(&self) -> BackendResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(BackendError::NoActiveTimeline)
        }
    }

    fn ensure_bound(&self, control: &str) -> BackendResult<()> {
        match &self.bound_controls {
            Some(bound) if !bound.contains(control) => {
                Err(BackendError::NoBoundTarget(control.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn bake(&self) -> BakedTimeline<'_> {
        let tracks = self
            .tracks
            .iter()
            .map(|(name, track)| {
                let channels = track
                    .iter()
                    .map(|(modus, channel)| {
                        let keys =
                            channel.iter().map(|(f, v)| (*f, *v)).collect();
                        (modus.as_str(), keys)
                    })
                    .collect();
                (name.as_str(), channels)
            })
            .collect();

        BakedTimeline {
            name: &self.name,
            frame_rate: self.frame_rate,
            start: self.range.0,
            end: self.range.1,
            tracks,
        }
    }
}

impl TimelineBackend for MemoryTimeline {
    fn current_frame(&self) -> BackendResult<Frame> {
        self.ensure_active()?;
        Ok(self.current_frame)
    }

    fn set_current_frame(&mut self, frame: Frame) -> BackendResult<()> {
        self.ensure_active()?;
        self.current_frame = frame.clamp(self.range.0, self.range.1);
        trace!("current frame -> {}", self.current_frame);
        Ok(())
    }

    fn playback_range(&self) -> BackendResult<(Frame, Frame)> {
        self.ensure_active()?;
        Ok(self.range)
    }

    fn set_playback_range(
        &mut self,
        start: Frame,
        end: Frame,
    ) -> BackendResult<()> {
        self.ensure_active()?;
        self.range = ordered(start, end);
        self.current_frame =
            self.current_frame.clamp(self.range.0, self.range.1);
        debug!("playback range -> {:?}", self.range);
        Ok(())
    }

    fn initial_playback_range(&self) -> BackendResult<(Frame, Frame)> {
        self.ensure_active()?;
        Ok(self.initial_range)
    }

    fn is_playing(&self) -> BackendResult<bool> {
        self.ensure_active()?;
        Ok(self.playing)
    }

    fn play(&mut self) -> BackendResult<()> {
        self.ensure_active()?;
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> BackendResult<()> {
        self.ensure_active()?;
        self.playing = false;
        Ok(())
    }

    fn set_key(
        &mut self,
        control: &str,
        frame: Frame,
        value: f32,
        modus: Modus,
    ) -> BackendResult<()> {
        self.ensure_active()?;
        self.ensure_bound(control)?;
        self.tracks
            .entry(control.to_string())
            .or_default()
            .entry(modus)
            .or_default()
            .insert(frame, value);
        trace!("key {}[{}] @{} = {}", control, modus, frame, value);
        Ok(())
    }

    fn value_at(
        &self,
        control: &str,
        frame: Frame,
        modus: Modus,
    ) -> BackendResult<Option<f32>> {
        self.ensure_active()?;
        self.ensure_bound(control)?;
        let value = self
            .tracks
            .get(control)
            .and_then(|track| track.get(&modus))
            .and_then(|channel| channel.range(..=frame).next_back())
            .map(|(_, value)| *value);
        Ok(value)
    }

    fn delete_keys_in_range(
        &mut self,
        control: &str,
        start: Frame,
        end: Frame,
    ) -> BackendResult<usize> {
        self.ensure_active()?;
        self.ensure_bound(control)?;
        let (start, end) = ordered(start, end);

        let Some(track) = self.tracks.get_mut(control) else {
            return Ok(0);
        };

        let mut removed = 0;
        for channel in track.values_mut() {
            let doomed: Vec<Frame> =
                channel.range(start..=end).map(|(f, _)| *f).collect();
            removed += doomed.len();
            for frame in doomed {
                channel.remove(&frame);
            }
        }
        track.retain(|_, channel| !channel.is_empty());
        if track.is_empty() {
            self.tracks.remove(control);
        }

        Ok(removed)
    }

    fn export(&mut self, target: &ExportTarget) -> BackendResult<PathBuf> {
        self.ensure_active()?;
        let json = serde_json::to_string_pretty(&self.bake())
            .map_err(|e| BackendError::Export(e.to_string()))?;
        fs::create_dir_all(&target.dir)?;
        let path = target.dir.join(format!("{}.json", target.name));
        fs::write(&path, json)?;
        info!("Exported timeline '{}' to {}", self.name, path.display());
        Ok(path)
    }
}

fn ordered(a: Frame, b: Frame) -> (Frame, Frame) {
    if a <= b { (a, b) } else { (b, a) }
}

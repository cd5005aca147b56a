//! Turns a bounded knob position into jog-wheel style timeline steps: moving
//! the knob up steps forward, moving it down steps backward, and holding it
//! pinned at the top keeps stepping forward.

use serde::Deserialize;

use super::conversion::{CANONICAL_MAX, is_lower_bound, is_upper_bound};
use crate::timeline::Frame;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StepSize {
    Slow,
    #[default]
    Normal,
    Fast,
}

/// Frames per step for each [`StepSize`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct StepSizes {
    pub slow: Frame,
    pub normal: Frame,
    pub fast: Frame,
}

impl Default for StepSizes {
    fn default() -> Self {
        Self {
            slow: 1,
            normal: 5,
            fast: 10,
        }
    }
}

impl StepSizes {
    pub fn frames(&self, size: StepSize) -> Frame {
        match size {
            StepSize::Slow => self.slow,
            StepSize::Normal => self.normal,
            StepSize::Fast => self.fast,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Step {
    pub direction: Direction,
    pub frames: Frame,
}

impl Step {
    pub fn delta(&self) -> Frame {
        match self.direction {
            Direction::Forward => self.frames,
            Direction::Backward => -self.frames,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TimeKnobState {
    previous_position: f32,
    step_size: StepSize,
    step_sizes: StepSizes,
}

impl Default for TimeKnobState {
    fn default() -> Self {
        Self::new(StepSizes::default())
    }
}

impl TimeKnobState {
    pub fn new(step_sizes: StepSizes) -> Self {
        Self {
            previous_position: 0.0,
            step_size: StepSize::default(),
            step_sizes,
        }
    }

    pub fn previous_position(&self) -> f32 {
        self.previous_position
    }

    pub fn step_size(&self) -> StepSize {
        self.step_size
    }

    pub fn set_step_size(&mut self, step_size: StepSize) {
        self.step_size = step_size;
    }

    /// Consumes a canonical position and returns the step to apply. A tie
    /// with the previous position steps forward only when pinned at the top.
    pub fn advance(&mut self, position: f32) -> Step {
        let direction = if position > self.previous_position {
            Direction::Forward
        } else if position < self.previous_position {
            Direction::Backward
        } else if position == CANONICAL_MAX {
            Direction::Forward
        } else {
            Direction::Backward
        };

        self.previous_position = position;

        Step {
            direction,
            frames: self.step_sizes.frames(self.step_size),
        }
    }

    /// Speed buttons: pressed selects `size`, released restores the default.
    /// Returns whether the step size changed.
    pub fn apply_speed_button(
        &mut self,
        size: StepSize,
        position: f32,
    ) -> bool {
        let next = if is_upper_bound(position) {
            size
        } else if is_lower_bound(position) {
            StepSize::default()
        } else {
            return false;
        };

        let changed = self.step_size != next;
        self.step_size = next;
        changed
    }
}

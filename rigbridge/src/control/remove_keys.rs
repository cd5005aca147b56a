use crate::core::prelude::*;
use crate::timeline::Frame;

/// Pairs a button press with its release into one ranged deletion. Each
/// triggering control id has at most one open interval; pressing again
/// before releasing restarts it.
#[derive(Debug, Default)]
pub struct RemoveKeysCapture {
    open: HashMap<String, Frame>,
}

impl RemoveKeysCapture {
    pub fn press(&mut self, control_id: &str, frame: Frame) {
        if let Some(previous) = self.open.insert(control_id.to_string(), frame)
        {
            debug!(
                "{} pressed again; discarding open start frame {}",
                control_id, previous
            );
        }
    }

    /// Closes the open interval for `control_id`, returning it ordered
    /// `(start, end)`. Returns `None` if nothing was pressed.
    pub fn release(
        &mut self,
        control_id: &str,
        frame: Frame,
    ) -> Option<(Frame, Frame)> {
        let start = self.open.remove(control_id)?;
        Some(if start > frame {
            (frame, start)
        } else {
            (start, frame)
        })
    }

    pub fn recorded_start(&self, control_id: &str) -> Option<Frame> {
        self.open.get(control_id).copied()
    }

    pub fn clear(&mut self) {
        self.open.clear();
    }
}

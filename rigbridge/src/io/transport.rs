use std::time::Instant;

use crate::core::prelude::*;

/// One control's most recent value as reported for a cycle. `value` is
/// `None` when the control was seen without a usable number.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlSample {
    pub control_id: String,
    pub value: Option<f32>,
    pub observed_at: Instant,
}

impl ControlSample {
    pub fn new(control_id: &str, value: f32, observed_at: Instant) -> Self {
        Self {
            control_id: control_id.to_string(),
            value: Some(value),
            observed_at,
        }
    }

    pub fn empty(control_id: &str, observed_at: Instant) -> Self {
        Self {
            control_id: control_id.to_string(),
            value: None,
            observed_at,
        }
    }
}

/// Source of control samples. Implementations drain whatever arrived since
/// the last poll and report at most one sample per control id.
pub trait TransportAdapter {
    fn poll(&mut self) -> Result<Vec<ControlSample>, TransportError>;

    /// Drops the remembered value for `control_id` so it's only reported
    /// again once the device sends it again.
    fn forget(&mut self, control_id: &str);
}

impl<T: TransportAdapter + ?Sized> TransportAdapter for Box<T> {
    fn poll(&mut self) -> Result<Vec<ControlSample>, TransportError> {
        (**self).poll()
    }

    fn forget(&mut self, control_id: &str) {
        (**self).forget(control_id)
    }
}

/// Several transports read as one. A failing transport contributes no
/// samples that cycle while the others are still read.
impl TransportAdapter for Vec<Box<dyn TransportAdapter>> {
    fn poll(&mut self) -> Result<Vec<ControlSample>, TransportError> {
        let mut samples = vec![];
        for transport in self.iter_mut() {
            match transport.poll() {
                Ok(polled) => samples.extend(polled),
                Err(e) => error!("{}", e),
            }
        }
        Ok(samples)
    }

    fn forget(&mut self, control_id: &str) {
        for transport in self.iter_mut() {
            transport.forget(control_id);
        }
    }
}

/// Latest value per control id, shared by the concrete transports.
#[derive(Debug, Default)]
pub struct LatestValues {
    values: HashMap<String, (Option<f32>, Instant)>,
}

impl LatestValues {
    pub fn set(&mut self, control_id: &str, value: Option<f32>, at: Instant) {
        self.values.insert(control_id.to_string(), (value, at));
    }

    pub fn remove(&mut self, control_id: &str) {
        self.values.remove(control_id);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Snapshot sorted by control id.
    pub fn samples(&self) -> Vec<ControlSample> {
        let mut samples: Vec<ControlSample> = self
            .values
            .iter()
            .map(|(id, (value, at))| ControlSample {
                control_id: id.clone(),
                value: *value,
                observed_at: *at,
            })
            .collect();
        samples.sort_by(|a, b| a.control_id.cmp(&b.control_id));
        samples
    }
}

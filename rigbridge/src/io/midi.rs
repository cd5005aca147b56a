//! MIDI control change input. midir delivers messages on its own thread, so
//! values land in a shared map that the bridge drains once per cycle.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use midir::{Ignore, MidiInput, MidiInputConnection};

use super::transport::{ControlSample, LatestValues, TransportAdapter};
use crate::control::conversion::normalize_midi;
use crate::core::prelude::*;

pub type PortIndexAndName = (usize, String);

pub struct MidiTransport {
    port: String,
    latest: Arc<Mutex<LatestValues>>,
    #[allow(dead_code)]
    connection: MidiInputConnection<()>,
}

impl std::fmt::Debug for MidiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MidiTransport({})", self.port)
    }
}

impl MidiTransport {
    pub fn connect(port: &str) -> Result<Self, TransportError> {
        let mut midi_in = MidiInput::new("rigbridge")
            .map_err(|e| TransportError::Midi(e.to_string()))?;
        midi_in.ignore(Ignore::All);

        let in_ports = midi_in.ports();
        let in_port = in_ports
            .iter()
            .find(|p| midi_in.port_name(p).unwrap_or_default() == port)
            .ok_or_else(|| {
                TransportError::Midi(format!(
                    "Unable to find input port: {}",
                    port
                ))
            })?
            .clone();

        let latest = Arc::new(Mutex::new(LatestValues::default()));
        let latest_clone = latest.clone();

        let connection = midi_in
            .connect(
                &in_port,
                "rigbridge-control",
                move |stamp, message, _| {
                    trace!("MIDI message: {}, {:?}", stamp, message);
                    let Some((control_id, value)) = control_change(message)
                    else {
                        return;
                    };
                    match latest_clone.lock() {
                        Ok(mut latest) => {
                            latest.set(&control_id, Some(value), Instant::now())
                        }
                        Err(_) => error!("MIDI state lock was poisoned"),
                    }
                },
                (),
            )
            .map_err(|e| TransportError::Midi(e.to_string()))?;

        info!("Connected MIDI input: {}", port);

        Ok(Self {
            port: port.to_string(),
            latest,
            connection,
        })
    }

    pub fn port(&self) -> &str {
        &self.port
    }
}

impl TransportAdapter for MidiTransport {
    fn poll(&mut self) -> Result<Vec<ControlSample>, TransportError> {
        let latest = self.latest.lock().map_err(|_| TransportError::Poisoned)?;
        Ok(latest.samples())
    }

    fn forget(&mut self, control_id: &str) {
        match self.latest.lock() {
            Ok(mut latest) => latest.remove(control_id),
            Err(_) => error!("MIDI state lock was poisoned"),
        }
    }
}

pub fn is_control_change(status: u8) -> bool {
    status & 0xF0 == 0xB0
}

pub fn control_id(channel: u8, cc: u8) -> String {
    format!("midi/{}/{}", channel, cc)
}

/// Maps a raw control change message to `(control_id, normalized value)`.
pub fn control_change(message: &[u8]) -> Option<(String, f32)> {
    if message.len() < 3 || !is_control_change(message[0]) {
        return None;
    }
    let channel = message[0] & 0x0F;
    Some((control_id(channel, message[1]), normalize_midi(message[2])))
}

pub fn list_input_ports() -> Result<Vec<PortIndexAndName>, TransportError> {
    let midi_in = MidiInput::new("rigbridge_list_input")
        .map_err(|e| TransportError::Midi(e.to_string()))?;
    let mut ports = vec![];
    for (i, p) in midi_in.ports().iter().enumerate() {
        let name = midi_in
            .port_name(p)
            .map_err(|e| TransportError::Midi(e.to_string()))?;
        ports.push((i, name));
    }
    Ok(ports)
}

use std::time::Instant;

use nannou_osc as osc;

use super::transport::{ControlSample, LatestValues, TransportAdapter};
use crate::core::prelude::*;

pub const DEFAULT_OSC_PORT: u16 = 5501;

/// Listens for OSC messages on a UDP port. Every poll drains all pending
/// packets into a latest-value map keyed by address without its leading
/// `/`, then reports the whole map.
pub struct OscTransport {
    port: u16,
    receiver: osc::Receiver,
    latest: LatestValues,
}

impl std::fmt::Debug for OscTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OscTransport({})", self.port)
    }
}

impl OscTransport {
    pub fn bind(port: u16) -> Result<Self, TransportError> {
        let receiver = osc::Receiver::bind(port)
            .map_err(|e| TransportError::Bind(e.to_string()))?;
        info!("OSC receiver listening on port {}", port);
        Ok(Self {
            port,
            receiver,
            latest: LatestValues::default(),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn drain(&mut self) {
        let now = Instant::now();
        let packets: Vec<osc::Packet> =
            self.receiver.try_iter().map(|(packet, _)| packet).collect();
        for packet in packets {
            self.handle_packet(packet, now);
        }
    }

    /// Bundles are unfolded into their messages.
    fn handle_packet(&mut self, packet: osc::Packet, now: Instant) {
        for msg in packet.into_msgs() {
            let address = control_id_from_address(&msg.addr);
            let value = msg.args.iter().rev().find_map(numeric_value);
            trace!("OSC {} -> {:?}", address, value);
            self.latest.set(address, value, now);
        }
    }
}

impl TransportAdapter for OscTransport {
    fn poll(&mut self) -> Result<Vec<ControlSample>, TransportError> {
        self.drain();
        Ok(self.latest.samples())
    }

    fn forget(&mut self, control_id: &str) {
        self.latest.remove(control_id);
    }
}

pub fn control_id_from_address(address: &str) -> &str {
    address.trim_matches('/')
}

fn numeric_value(arg: &osc::Type) -> Option<f32> {
    match arg {
        osc::Type::Float(value) => Some(*value),
        osc::Type::Double(value) => Some(*value as f32),
        osc::Type::Int(value) => Some(*value as f32),
        osc::Type::Long(value) => Some(*value as f32),
        osc::Type::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
        _ => None,
    }
}

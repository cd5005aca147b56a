#[cfg(feature = "midi")]
pub mod midi;
pub mod osc;
pub mod transport;

pub use transport::{ControlSample, TransportAdapter};

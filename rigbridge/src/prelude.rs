pub use crate::control::config::{MappingFile, RawMappingEntry};
pub use crate::control::*;
pub use crate::core::prelude::*;
#[cfg(feature = "midi")]
pub use crate::io::midi::MidiTransport;
pub use crate::io::osc::OscTransport;
pub use crate::io::transport::{ControlSample, LatestValues, TransportAdapter};
pub use crate::runtime::scheduler::{
    DeferredCallback, FinalCallback, RegistrationHandle,
};
pub use crate::runtime::*;
pub use crate::timeline::*;

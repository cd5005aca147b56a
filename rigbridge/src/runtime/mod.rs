pub mod bridge;
pub mod cycle_source;
pub mod frame_clock;
pub mod scheduler;
pub mod settings;
pub mod storage;

pub use bridge::Bridge;
pub use cycle_source::{ClockSource, CycleSource, run_until_idle};
pub use scheduler::{CycleScheduler, Phase, RegistrationHandle};
pub use settings::BridgeSettings;

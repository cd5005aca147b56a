pub mod config;
pub mod conversion;
pub mod dispatcher;
pub mod mapping;
pub mod rate_limit;
pub mod remove_keys;
pub mod time_knob;
pub mod watcher;

pub use dispatcher::*;
pub use mapping::*;
pub use time_knob::*;
pub use watcher::MappingWatcher;

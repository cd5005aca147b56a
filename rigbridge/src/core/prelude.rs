pub use crate::core::error::{
    BackendError, BackendResult, ConfigError, SchedulerError, TransportError,
};
pub use crate::core::logging::init_logger;
pub use crate::core::logging::{debug, error, info, trace, warn};
pub use crate::core::util::HashMap;
pub use crate::core::util::HashSet;
pub use crate::core::util::clamp;

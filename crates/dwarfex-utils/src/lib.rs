//! # dwarfex Utilities
//!
//! Logging setup shared by the dwarfex workspace, built on `tracing`.

pub mod logging;

pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};

//! Shared utilities for the quorum validator core.

pub mod logging;
pub mod stats;
pub mod throttled_log;

pub use logging::{init_logging, LogFormat};
pub use stats::StatsCounter;
pub use throttled_log::ThrottledLog;

//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use log_guard_manager::prelude::*;
//! ```

// Core
pub use crate::core::config::Snapshot;
pub use crate::core::errors::{LgmError, Result};

// Platform
pub use crate::platform::pal::{FsStats, MockPlatform, Platform, detect_platform};

// Logger
pub use crate::logger::global::get as logger_by_name;
pub use crate::logger::handle::Logger;
pub use crate::logger::level::Severity;
pub use crate::logger::memory::{MemorySink, MemorySinkFactory};
pub use crate::logger::registry::SinkKind;
pub use crate::logger::sink::{SinkFactory, StdSinkFactory};

pub use crate::{lgm_critical, lgm_debug, lgm_error, lgm_info, lgm_log, lgm_trace, lgm_warn};

// Daemon
pub use crate::daemon::alerts::{AlertTransport, RecordingTransport, UdpTransport};
pub use crate::daemon::manager::{
    Collaborators, ConfigCheck, InitOptions, LoggerManager, TickReport,
};

// Monitor
pub use crate::monitor::disk_guard::GuardOutcome;

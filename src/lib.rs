#![forbid(unsafe_code)]

//! Log Guard Manager (lgm): a runtime-reconfigurable logging backend.
//!
//! One named logger fans out to up to three sinks (console, "all" rotating
//! file, "alerts" rotating file) whose configuration lives in an INI file:
//! 1. **Hot reload**: the config file is polled by modification time; level,
//!    pattern and flush changes apply in place, path or rotation changes
//!    rebuild the affected sink without losing records
//! 2. **Disk guard**: file sinks are detached while free space on a watched
//!    root is below a threshold, and reattached once it recovers
//! 3. **Alerts**: low-space events send one throttled UDP datagram
//!
//! # Library usage
//!
//! ```rust,no_run
//! use log_guard_manager::prelude::*;
//!
//! let manager = LoggerManager::init(&InitOptions::default())?;
//! manager.logger().info("service started");
//! # Ok::<(), LgmError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod daemon;
pub mod logger;
pub mod monitor;
pub mod platform;

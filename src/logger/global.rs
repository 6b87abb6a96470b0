//! Process-wide lookup of managed loggers by name, and the level macros that
//! log through it.
//!
//! `LoggerManager::init` registers its logger here and removes it again on
//! drop, so any code in the process can log without holding the manager:
//!
//! ```rust,no_run
//! log_guard_manager::lgm_warn!("lgm", "disk at {}%", 93);
//! ```
//!
//! Logging to a name nobody registered is a silent no-op.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::logger::handle::Logger;

static LOGGERS: OnceLock<RwLock<HashMap<String, Arc<Logger>>>> = OnceLock::new();

fn loggers() -> &'static RwLock<HashMap<String, Arc<Logger>>> {
    LOGGERS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register `logger` under its name, returning the logger it replaced.
pub fn register(logger: Arc<Logger>) -> Option<Arc<Logger>> {
    loggers().write().insert(logger.name().to_string(), logger)
}

/// Logger registered under `name`, if any.
#[must_use]
pub fn get(name: &str) -> Option<Arc<Logger>> {
    loggers().read().get(name).cloned()
}

/// Remove whatever is registered under `name`.
pub fn unregister(name: &str) -> Option<Arc<Logger>> {
    loggers().write().remove(name)
}

/// Remove `logger` only if it is still the registered instance for its name.
/// A newer logger registered under the same name stays.
pub fn unregister_instance(logger: &Arc<Logger>) -> bool {
    let mut map = loggers().write();
    match map.get(logger.name()) {
        Some(current) if Arc::ptr_eq(current, logger) => {
            map.remove(logger.name());
            true
        }
        _ => false,
    }
}

/// Log a format-style message at `level` to the logger registered as `name`.
#[macro_export]
macro_rules! lgm_log {
    ($name:expr, $level:expr, $($arg:tt)+) => {
        if let Some(logger) = $crate::logger::global::get($name) {
            let level = $level;
            if logger.should_log(level) {
                logger.log(level, format_args!($($arg)+));
            }
        }
    };
}

/// [`lgm_log!`] at `trace`.
#[macro_export]
macro_rules! lgm_trace {
    ($name:expr, $($arg:tt)+) => {
        $crate::lgm_log!($name, $crate::logger::level::Severity::Trace, $($arg)+)
    };
}

/// [`lgm_log!`] at `debug`.
#[macro_export]
macro_rules! lgm_debug {
    ($name:expr, $($arg:tt)+) => {
        $crate::lgm_log!($name, $crate::logger::level::Severity::Debug, $($arg)+)
    };
}

/// [`lgm_log!`] at `info`.
#[macro_export]
macro_rules! lgm_info {
    ($name:expr, $($arg:tt)+) => {
        $crate::lgm_log!($name, $crate::logger::level::Severity::Info, $($arg)+)
    };
}

/// [`lgm_log!`] at `warn`.
#[macro_export]
macro_rules! lgm_warn {
    ($name:expr, $($arg:tt)+) => {
        $crate::lgm_log!($name, $crate::logger::level::Severity::Warn, $($arg)+)
    };
}

/// [`lgm_log!`] at `error`.
#[macro_export]
macro_rules! lgm_error {
    ($name:expr, $($arg:tt)+) => {
        $crate::lgm_log!($name, $crate::logger::level::Severity::Error, $($arg)+)
    };
}

/// [`lgm_log!`] at `critical`.
#[macro_export]
macro_rules! lgm_critical {
    ($name:expr, $($arg:tt)+) => {
        $crate::lgm_log!($name, $crate::logger::level::Severity::Critical, $($arg)+)
    };
}

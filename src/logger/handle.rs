//! The named logger handed to callers.
//!
//! Emitting never takes the manager lock: levels are atomics and the fan-out
//! guards its membership with its own `RwLock`.

use std::fmt::Display;
use std::sync::Arc;

use crate::logger::fanout::FanoutSink;
use crate::logger::level::{AtomicSeverity, Severity};
use crate::logger::sink::Record;

/// Named logger writing through a shared [`FanoutSink`].
pub struct Logger {
    name: Arc<str>,
    level: AtomicSeverity,
    flush_on: AtomicSeverity,
    fanout: Arc<FanoutSink>,
}

impl Logger {
    /// Logger named `name` at `trace` with flush-on disabled.
    #[must_use]
    pub fn new(name: &str, fanout: Arc<FanoutSink>) -> Self {
        Self {
            name: Arc::from(name),
            level: AtomicSeverity::new(Severity::Trace),
            flush_on: AtomicSeverity::new(Severity::Off),
            fanout,
        }
    }

    /// Name rendered by the `%n` pattern token.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum severity this logger emits.
    #[must_use]
    pub fn level(&self) -> Severity {
        self.level.load()
    }

    /// Change the minimum severity emitted.
    pub fn set_level(&self, level: Severity) {
        self.level.store(level);
    }

    /// Severity at and above which every record triggers a flush.
    #[must_use]
    pub fn flush_on(&self) -> Severity {
        self.flush_on.load()
    }

    /// Records at or above `level` flush every attached sink right after writing.
    pub fn set_flush_on(&self, level: Severity) {
        self.flush_on.store(level);
    }

    /// Whether a record at `level` would pass the logger threshold.
    #[must_use]
    pub fn should_log(&self, level: Severity) -> bool {
        self.level.load().admits(level)
    }

    /// Fan-out this logger writes through.
    #[must_use]
    pub fn fanout(&self) -> &Arc<FanoutSink> {
        &self.fanout
    }

    /// Emit `message` at `level`; formatting is skipped when filtered out.
    pub fn log(&self, level: Severity, message: impl Display) {
        if !self.should_log(level) {
            return;
        }
        let record = Record::now(level, Arc::clone(&self.name), message.to_string());
        self.fanout.log(&record);
        if self.flush_on.load().admits(level) {
            self.fanout.flush();
        }
    }

    /// [`Logger::log`] at `trace`.
    pub fn trace(&self, message: impl Display) {
        self.log(Severity::Trace, message);
    }

    /// [`Logger::log`] at `debug`.
    pub fn debug(&self, message: impl Display) {
        self.log(Severity::Debug, message);
    }

    /// [`Logger::log`] at `info`.
    pub fn info(&self, message: impl Display) {
        self.log(Severity::Info, message);
    }

    /// [`Logger::log`] at `warning`.
    pub fn warn(&self, message: impl Display) {
        self.log(Severity::Warn, message);
    }

    /// [`Logger::log`] at `error`.
    pub fn error(&self, message: impl Display) {
        self.log(Severity::Error, message);
    }

    /// [`Logger::log`] at `critical`.
    pub fn critical(&self, message: impl Display) {
        self.log(Severity::Critical, message);
    }

    /// Flush every attached sink.
    pub fn flush(&self) {
        self.fanout.flush();
    }
}

//! Sink capability: minimum severity, pattern, write, flush.
//!
//! Concrete destinations (console, rotating file) are variants behind the
//! [`Sink`] trait and are built through a [`SinkFactory`], so the reconciler
//! never names a concrete type and tests can substitute recording sinks.

#![allow(missing_docs)]

use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::core::config::FileSinkConfig;
use crate::core::errors::Result;
use crate::logger::level::{AtomicSeverity, Severity};
use crate::logger::pattern::{FormattedLine, PatternFormatter, TimeMode};

/// One accepted log record, shared by every sink it is fanned out to.
#[derive(Debug, Clone)]
pub struct Record {
    pub level: Severity,
    pub logger: Arc<str>,
    pub time: DateTime<Utc>,
    pub thread_id: u64,
    pub message: String,
}

impl Record {
    /// Stamp a record with the current time and calling thread.
    pub fn now(level: Severity, logger: Arc<str>, message: String) -> Self {
        Self {
            level,
            logger,
            time: Utc::now(),
            thread_id: current_thread_id(),
            message,
        }
    }
}

/// Small process-local thread number for the `%t` token.
fn current_thread_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static ID: Cell<u64> = const { Cell::new(0) };
    }
    ID.with(|id| {
        if id.get() == 0 {
            id.set(NEXT.fetch_add(1, Ordering::Relaxed));
        }
        id.get()
    })
}

/// A log destination. All methods take `&self`: sinks are shared between the
/// fan-out and the registry and are reconfigured in place.
pub trait Sink: Send + Sync {
    fn set_min_severity(&self, level: Severity);
    fn min_severity(&self) -> Severity;
    fn set_pattern(&self, pattern: &str, time_mode: TimeMode);
    fn pattern(&self) -> String;
    /// Write one record. Callers have already checked [`Sink::accepts`].
    fn write(&self, record: &Record);
    fn flush(&self);

    fn accepts(&self, level: Severity) -> bool {
        self.min_severity().admits(level)
    }
}

/// Shared handle stored in the registry and the fan-out.
pub type SharedSink = Arc<dyn Sink>;

/// Threshold + formatter pair every concrete sink embeds.
#[derive(Debug)]
pub struct SinkSettings {
    level: AtomicSeverity,
    formatter: RwLock<PatternFormatter>,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            level: AtomicSeverity::new(Severity::Trace),
            formatter: RwLock::new(PatternFormatter::new("%v", TimeMode::Local)),
        }
    }
}

impl SinkSettings {
    pub fn level(&self) -> Severity {
        self.level.load()
    }

    pub fn set_level(&self, level: Severity) {
        self.level.store(level);
    }

    pub fn set_pattern(&self, pattern: &str, time_mode: TimeMode) {
        let mut formatter = self.formatter.write();
        if formatter.pattern() != pattern || formatter.time_mode() != time_mode {
            *formatter = PatternFormatter::new(pattern, time_mode);
        }
    }

    pub fn pattern(&self) -> String {
        self.formatter.read().pattern().to_string()
    }

    pub fn time_mode(&self) -> TimeMode {
        self.formatter.read().time_mode()
    }

    pub fn format(&self, record: &Record) -> FormattedLine {
        self.formatter.read().format(record)
    }
}

/// Builds concrete sinks. Level and pattern are applied by the caller.
pub trait SinkFactory: Send + Sync {
    fn console(&self) -> Result<SharedSink>;
    fn rotating_file(&self, config: &FileSinkConfig) -> Result<SharedSink>;
}

/// Production factory: stdout console sink and size-rotated file sinks.
#[derive(Debug, Default)]
pub struct StdSinkFactory;

impl SinkFactory for StdSinkFactory {
    fn console(&self) -> Result<SharedSink> {
        Ok(Arc::new(crate::logger::console::ConsoleSink::stdout()))
    }

    fn rotating_file(&self, config: &FileSinkConfig) -> Result<SharedSink> {
        let sink = crate::logger::rotating::RotatingFileSink::open(
            &config.path,
            config.max_size_bytes,
            config.max_files,
        )?;
        Ok(Arc::new(sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_ids_are_stable_per_thread_and_distinct_across_threads() {
        let here = current_thread_id();
        assert_eq!(here, current_thread_id());
        let other = std::thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(here, other);
    }

    #[test]
    fn settings_only_recompile_on_change() {
        let settings = SinkSettings::default();
        settings.set_pattern("[%l] %v", TimeMode::Utc);
        assert_eq!(settings.pattern(), "[%l] %v");
        assert_eq!(settings.time_mode(), TimeMode::Utc);
        settings.set_level(Severity::Error);
        assert_eq!(settings.level(), Severity::Error);
    }
}

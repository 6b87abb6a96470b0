//! In-memory sink and factory for deterministic tests and embedding.
//!
//! `MemorySinkFactory` remembers every sink it built so callers can inspect
//! instance identity, captured lines and flush counts after a reconciliation.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::core::config::FileSinkConfig;
use crate::core::errors::{LgmError, Result};
use crate::logger::level::Severity;
use crate::logger::pattern::TimeMode;
use crate::logger::sink::{Record, SharedSink, Sink, SinkFactory, SinkSettings};

/// Sink that keeps formatted lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    settings: SinkSettings,
    lines: Mutex<Vec<String>>,
    flushes: AtomicUsize,
    /// File path this sink stands in for, `None` for console.
    pub path: Option<PathBuf>,
}

impl MemorySink {
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn time_mode(&self) -> TimeMode {
        self.settings.time_mode()
    }

    /// Whether `shared` is this very instance.
    #[must_use]
    pub fn is(self: &Arc<Self>, shared: &SharedSink) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(self), Arc::as_ptr(shared))
    }
}

impl Sink for MemorySink {
    fn set_min_severity(&self, level: Severity) {
        self.settings.set_level(level);
    }

    fn min_severity(&self) -> Severity {
        self.settings.level()
    }

    fn set_pattern(&self, pattern: &str, time_mode: TimeMode) {
        self.settings.set_pattern(pattern, time_mode);
    }

    fn pattern(&self) -> String {
        self.settings.pattern()
    }

    fn write(&self, record: &Record) {
        let line = self.settings.format(record).text;
        self.lines
            .lock()
            .push(line.trim_end_matches('\n').to_string());
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory handing out [`MemorySink`]s and remembering them in build order.
#[derive(Debug, Default)]
pub struct MemorySinkFactory {
    built: Mutex<Vec<Arc<MemorySink>>>,
    fail_files: AtomicBool,
}

impl MemorySinkFactory {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent file sink creation fail (console keeps working).
    pub fn fail_file_sinks(&self, fail: bool) {
        self.fail_files.store(fail, Ordering::SeqCst);
    }

    /// Every sink built so far, oldest first.
    #[must_use]
    pub fn built(&self) -> Vec<Arc<MemorySink>> {
        self.built.lock().clone()
    }

    /// The most recent sink built for `path`, or the latest console sink for `None`.
    #[must_use]
    pub fn latest(&self, path: Option<&std::path::Path>) -> Option<Arc<MemorySink>> {
        self.built
            .lock()
            .iter()
            .rev()
            .find(|s| s.path.as_deref() == path)
            .cloned()
    }

    fn remember(&self, sink: MemorySink) -> SharedSink {
        let sink = Arc::new(sink);
        self.built.lock().push(Arc::clone(&sink));
        sink
    }
}

impl SinkFactory for MemorySinkFactory {
    fn console(&self) -> Result<SharedSink> {
        Ok(self.remember(MemorySink::new(None)))
    }

    fn rotating_file(&self, config: &FileSinkConfig) -> Result<SharedSink> {
        if self.fail_files.load(Ordering::SeqCst) {
            return Err(LgmError::SinkCreate {
                path: config.path.clone(),
                details: "file sink creation disabled".to_string(),
            });
        }
        Ok(self.remember(MemorySink::new(Some(config.path.clone()))))
    }
}

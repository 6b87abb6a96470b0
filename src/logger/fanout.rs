//! Fan-out aggregator: forwards each record to every attached sink.
//!
//! Membership changes only through [`FanoutSink::attach`] / [`FanoutSink::detach`];
//! severity and pattern live on the sink instances themselves.

#![allow(missing_docs)]

use std::sync::Arc;

use parking_lot::RwLock;

use crate::logger::sink::{Record, SharedSink};

/// Set of currently attached sinks.
#[derive(Default)]
pub struct FanoutSink {
    sinks: RwLock<Vec<SharedSink>>,
}

impl FanoutSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `sink` unless that exact instance is already attached.
    pub fn attach(&self, sink: &SharedSink) -> bool {
        let mut sinks = self.sinks.write();
        if sinks.iter().any(|s| Arc::ptr_eq(s, sink)) {
            return false;
        }
        sinks.push(Arc::clone(sink));
        true
    }

    /// Detach that exact instance. Returns whether it was attached.
    pub fn detach(&self, sink: &SharedSink) -> bool {
        let mut sinks = self.sinks.write();
        let before = sinks.len();
        sinks.retain(|s| !Arc::ptr_eq(s, sink));
        sinks.len() != before
    }

    #[must_use]
    pub fn contains(&self, sink: &SharedSink) -> bool {
        self.sinks.read().iter().any(|s| Arc::ptr_eq(s, sink))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }

    pub fn log(&self, record: &Record) {
        for sink in self.sinks.read().iter() {
            if sink.accepts(record.level) {
                sink.write(record);
            }
        }
    }

    pub fn flush(&self) {
        for sink in self.sinks.read().iter() {
            sink.flush();
        }
    }
}

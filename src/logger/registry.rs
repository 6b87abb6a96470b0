//! Owned sink instances, one slot per kind, and their attachment to the fan-out.
//!
//! The registry is the only place that attaches or detaches sinks. Every
//! attach/flush/detach it performs is appended to a journal so callers can
//! check ordering (a replacement attaches the new instance before the old one
//! is flushed and detached).
//!
//! While file sinks are suspended (disk guard), file sinks installed by
//! reconciliation are kept but left detached until [`SinkRegistry::resume_files`].

#![allow(missing_docs)]

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::core::config::Snapshot;
use crate::logger::fanout::FanoutSink;
use crate::logger::sink::SharedSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Console,
    AllFile,
    AlertsFile,
}

impl SinkKind {
    /// Reconciliation order.
    pub const ALL: [Self; 3] = [Self::Console, Self::AllFile, Self::AlertsFile];

    #[must_use]
    pub const fn is_file(self) -> bool {
        matches!(self, Self::AllFile | Self::AlertsFile)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::AllFile => "all-file",
            Self::AlertsFile => "alerts-file",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Console => 0,
            Self::AllFile => 1,
            Self::AlertsFile => 2,
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One membership operation, tagged with the registry-local instance id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SinkStep {
    Attach { kind: SinkKind, id: u64 },
    Flush { kind: SinkKind, id: u64 },
    Detach { kind: SinkKind, id: u64 },
}

struct SinkSlot {
    id: u64,
    sink: SharedSink,
    attached: bool,
}

pub struct SinkRegistry {
    fanout: Arc<FanoutSink>,
    slots: [Option<SinkSlot>; 3],
    files_suspended: bool,
    next_id: u64,
    journal: Vec<SinkStep>,
}

impl SinkRegistry {
    #[must_use]
    pub fn new(fanout: Arc<FanoutSink>) -> Self {
        Self {
            fanout,
            slots: [None, None, None],
            files_suspended: false,
            next_id: 1,
            journal: Vec::new(),
        }
    }

    #[must_use]
    pub fn fanout(&self) -> &Arc<FanoutSink> {
        &self.fanout
    }

    #[must_use]
    pub fn exists(&self, kind: SinkKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    #[must_use]
    pub fn get(&self, kind: SinkKind) -> Option<&SharedSink> {
        self.slots[kind.index()].as_ref().map(|s| &s.sink)
    }

    #[must_use]
    pub fn id(&self, kind: SinkKind) -> Option<u64> {
        self.slots[kind.index()].as_ref().map(|s| s.id)
    }

    #[must_use]
    pub fn is_attached(&self, kind: SinkKind) -> bool {
        self.slots[kind.index()].as_ref().is_some_and(|s| s.attached)
    }

    #[must_use]
    pub const fn files_suspended(&self) -> bool {
        self.files_suspended
    }

    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.fanout.len()
    }

    /// Drain the membership journal.
    pub fn take_journal(&mut self) -> Vec<SinkStep> {
        std::mem::take(&mut self.journal)
    }

    /// Register `sink` for `kind`, replacing any existing instance. Returns its id.
    pub fn install(&mut self, kind: SinkKind, sink: SharedSink) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let mut slot = SinkSlot {
            id,
            sink,
            attached: false,
        };
        if !(kind.is_file() && self.files_suspended) {
            self.attach_slot(kind, &mut slot);
        }
        if let Some(old) = self.slots[kind.index()].replace(slot) {
            self.retire(kind, old);
        }
        id
    }

    /// Flush and detach the instance for `kind`. Returns its id.
    pub fn remove(&mut self, kind: SinkKind) -> Option<u64> {
        let old = self.slots[kind.index()].take()?;
        let id = old.id;
        self.retire(kind, old);
        Some(id)
    }

    /// Flush and detach every attached file sink; they stay registered.
    pub fn suspend_files(&mut self) {
        self.files_suspended = true;
        for kind in [SinkKind::AllFile, SinkKind::AlertsFile] {
            if let Some(mut slot) = self.slots[kind.index()].take() {
                if slot.attached {
                    self.journal.push(SinkStep::Flush { kind, id: slot.id });
                    slot.sink.flush();
                    self.detach_slot(kind, &mut slot);
                }
                self.slots[kind.index()] = Some(slot);
            }
        }
    }

    /// Reattach every registered file sink. Disabled kinds have no instance.
    pub fn resume_files(&mut self) {
        self.files_suspended = false;
        for kind in [SinkKind::AllFile, SinkKind::AlertsFile] {
            if let Some(mut slot) = self.slots[kind.index()].take() {
                if !slot.attached {
                    self.attach_slot(kind, &mut slot);
                }
                self.slots[kind.index()] = Some(slot);
            }
        }
    }

    /// Push levels and patterns from `snap` into every existing instance.
    pub fn apply_settings(&self, snap: &Snapshot) {
        if let Some(sink) = self.get(SinkKind::Console) {
            sink.set_min_severity(snap.console.level);
            sink.set_pattern(&snap.console_pattern, snap.time_mode);
        }
        if let Some(sink) = self.get(SinkKind::AllFile) {
            sink.set_min_severity(snap.all_file.level);
            sink.set_pattern(&snap.file_pattern, snap.time_mode);
        }
        if let Some(sink) = self.get(SinkKind::AlertsFile) {
            sink.set_min_severity(snap.alerts_file.level);
            sink.set_pattern(&snap.file_pattern, snap.time_mode);
        }
    }

    fn attach_slot(&mut self, kind: SinkKind, slot: &mut SinkSlot) {
        self.fanout.attach(&slot.sink);
        slot.attached = true;
        self.journal.push(SinkStep::Attach { kind, id: slot.id });
    }

    fn detach_slot(&mut self, kind: SinkKind, slot: &mut SinkSlot) {
        self.fanout.detach(&slot.sink);
        slot.attached = false;
        self.journal.push(SinkStep::Detach { kind, id: slot.id });
    }

    fn retire(&mut self, kind: SinkKind, mut old: SinkSlot) {
        self.journal.push(SinkStep::Flush { kind, id: old.id });
        old.sink.flush();
        if old.attached {
            self.detach_slot(kind, &mut old);
        }
    }
}

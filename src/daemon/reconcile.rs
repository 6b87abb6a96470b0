//! Hard/soft reconciliation of the sink registry against a new snapshot.
//!
//! Hard changes (enable toggles, file path, rotation limits) replace sink
//! instances; soft changes (levels, patterns, time mode, flush policy) are
//! pushed into the existing instances. Hard always runs before soft.

#![allow(missing_docs)]

use std::sync::Arc;

use serde::Serialize;

use crate::core::config::Snapshot;
use crate::core::errors::Result;
use crate::logger::flusher::PeriodicFlusher;
use crate::logger::handle::Logger;
use crate::logger::level::Severity;
use crate::logger::registry::{SinkKind, SinkRegistry, SinkStep};
use crate::logger::sink::{SharedSink, SinkFactory};

pub const FALLBACK_WARNING: &str = "No sinks enabled after hard-reload. Fallback to console sink.";
pub const FLUSH_ZERO_WARNING: &str = "FLUSH_EVERY_SEC=0 detected. Disabling periodic flush at runtime is limited. Restart recommended.";

// ──────────────────── decisions ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkDecision {
    Create,
    Recreate,
    Destroy,
    Keep,
}

fn enabled(snap: &Snapshot, kind: SinkKind) -> bool {
    match kind {
        SinkKind::Console => snap.console.enabled,
        SinkKind::AllFile => snap.all_file.enabled,
        SinkKind::AlertsFile => snap.alerts_file.enabled,
    }
}

fn hard_attrs_differ(old: &Snapshot, new: &Snapshot, kind: SinkKind) -> bool {
    match kind {
        SinkKind::Console => false,
        SinkKind::AllFile => old.all_file.rotation_differs(&new.all_file),
        SinkKind::AlertsFile => old.alerts_file.rotation_differs(&new.alerts_file),
    }
}

/// Pure per-kind decision. `exists` is whether the registry holds an instance.
#[must_use]
pub fn decide(kind: SinkKind, old: &Snapshot, new: &Snapshot, exists: bool) -> SinkDecision {
    let want = enabled(new, kind);
    match (want, exists) {
        (true, false) => SinkDecision::Create,
        (true, true) if !enabled(old, kind) || hard_attrs_differ(old, new, kind) => {
            SinkDecision::Recreate
        }
        (false, true) => SinkDecision::Destroy,
        _ => SinkDecision::Keep,
    }
}

// ──────────────────── reports ────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HardReport {
    pub decisions: Vec<(SinkKind, SinkDecision)>,
    /// Membership operations in the order they happened.
    pub steps: Vec<SinkStep>,
    pub failures: Vec<(SinkKind, String)>,
    pub fallback: bool,
}

impl HardReport {
    #[must_use]
    pub fn decision(&self, kind: SinkKind) -> Option<SinkDecision> {
        self.decisions
            .iter()
            .find_map(|(k, d)| (*k == kind).then_some(*d))
    }

    /// True when no instance was created, replaced or destroyed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.fallback
            && self
                .decisions
                .iter()
                .all(|(_, d)| *d == SinkDecision::Keep)
    }
}

/// Effect of a soft apply on the periodic flusher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushUpdate {
    Unchanged,
    Started,
    Updated,
    /// Zero requested while running; previous cadence kept.
    ZeroIgnored,
    StartFailed,
}

// ──────────────────── reconciler ────────────────────

pub struct Reconciler {
    factory: Arc<dyn SinkFactory>,
}

impl Reconciler {
    #[must_use]
    pub fn new(factory: Arc<dyn SinkFactory>) -> Self {
        Self { factory }
    }

    fn build(&self, kind: SinkKind, snap: &Snapshot) -> Result<SharedSink> {
        let sink = match kind {
            SinkKind::Console => self.factory.console()?,
            SinkKind::AllFile => self.factory.rotating_file(&snap.all_file)?,
            SinkKind::AlertsFile => self.factory.rotating_file(&snap.alerts_file)?,
        };
        let (level, pattern) = match kind {
            SinkKind::Console => (snap.console.level, &snap.console_pattern),
            SinkKind::AllFile => (snap.all_file.level, &snap.file_pattern),
            SinkKind::AlertsFile => (snap.alerts_file.level, &snap.file_pattern),
        };
        sink.set_min_severity(level);
        sink.set_pattern(pattern, snap.time_mode);
        Ok(sink)
    }

    /// Create, recreate or destroy sinks in console → all-file → alerts-file
    /// order, then force a console fallback if nothing is attached.
    pub fn apply_hard(
        &self,
        registry: &mut SinkRegistry,
        logger: &Logger,
        old: &Snapshot,
        new: &Snapshot,
    ) -> HardReport {
        registry.take_journal();
        let mut report = HardReport::default();

        for kind in SinkKind::ALL {
            let decision = decide(kind, old, new, registry.exists(kind));
            report.decisions.push((kind, decision));
            match decision {
                SinkDecision::Create | SinkDecision::Recreate => match self.build(kind, new) {
                    Ok(sink) => {
                        registry.install(kind, sink);
                    }
                    Err(e) => {
                        logger.warn(format_args!("Failed to create {kind} sink: {e}"));
                        report.failures.push((kind, e.to_string()));
                    }
                },
                SinkDecision::Destroy => {
                    registry.remove(kind);
                }
                SinkDecision::Keep => {}
            }
        }

        if registry.attached_count() == 0 {
            match self.factory.console() {
                Ok(sink) => {
                    sink.set_min_severity(Severity::Trace);
                    sink.set_pattern(&new.console_pattern, new.time_mode);
                    registry.install(SinkKind::Console, sink);
                    report.fallback = true;
                    logger.warn(FALLBACK_WARNING);
                }
                Err(e) => {
                    report.failures.push((SinkKind::Console, e.to_string()));
                }
            }
        }

        report.steps = registry.take_journal();
        report
    }

    /// Push levels, patterns and flush policy into what already exists.
    ///
    /// `reload` distinguishes a runtime reload from init: at init a zero
    /// flush interval just means no flusher.
    pub fn apply_soft(
        &self,
        registry: &SinkRegistry,
        logger: &Arc<Logger>,
        flusher: &mut Option<PeriodicFlusher>,
        new: &Snapshot,
        reload: bool,
    ) -> FlushUpdate {
        registry.apply_settings(new);
        logger.set_level(new.logger_level);
        logger.set_flush_on(new.flush_on);

        let secs = new.flush_every_secs;
        match flusher {
            Some(_) if secs == 0 => {
                if reload {
                    logger.warn(FLUSH_ZERO_WARNING);
                }
                FlushUpdate::ZeroIgnored
            }
            Some(running) => {
                if running.interval_secs() == secs {
                    FlushUpdate::Unchanged
                } else {
                    running.set_interval_secs(secs);
                    FlushUpdate::Updated
                }
            }
            None if secs == 0 => {
                if reload {
                    logger.warn(FLUSH_ZERO_WARNING);
                }
                FlushUpdate::Unchanged
            }
            None => match PeriodicFlusher::start(Arc::clone(logger), secs) {
                Ok(started) => {
                    *flusher = Some(started);
                    FlushUpdate::Started
                }
                Err(e) => {
                    logger.warn(format_args!("Periodic flush could not start: {e}"));
                    FlushUpdate::StartFailed
                }
            },
        }
    }

    /// Create enabled sinks that have no instance, e.g. after an earlier
    /// creation failure. Never recreates or destroys.
    pub fn repair_missing(
        &self,
        registry: &mut SinkRegistry,
        logger: &Logger,
        snap: &Snapshot,
    ) -> Vec<SinkKind> {
        let mut created = Vec::new();
        for kind in SinkKind::ALL {
            if !enabled(snap, kind) || registry.exists(kind) {
                continue;
            }
            match self.build(kind, snap) {
                Ok(sink) => {
                    registry.install(kind, sink);
                    logger.info(format_args!("Created missing {kind} sink."));
                    created.push(kind);
                }
                // Already warned when the reload failed to build it; retried next tick.
                Err(_) => {}
            }
        }
        created
    }
}

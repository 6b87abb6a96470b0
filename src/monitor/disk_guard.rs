//! Disk guard: suspends file logging while free space at `DISK_ROOT` is below
//! the configured ratio and resumes it once space recovers.
//!
//! The guard never creates or destroys sinks. It only detaches and reattaches
//! instances the registry already owns.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::core::config::Snapshot;
use crate::daemon::alerts::{AlertOutcome, AlertThrottle};
use crate::logger::handle::Logger;
use crate::logger::registry::SinkRegistry;
use crate::platform::pal::Platform;

/// What one guard evaluation did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GuardOutcome {
    /// Guard disabled and nothing to undo.
    Disabled,
    /// Guard disabled while file sinks were suspended: they were reattached.
    DisabledResumed,
    /// Guard enabled but no root configured.
    NoRoot,
    ProbeFailed { root: PathBuf, details: String },
    Healthy { ratio_pct: f64 },
    /// Crossed below the threshold on this tick.
    Suspended { ratio_pct: f64, alert: AlertOutcome },
    /// Still below the threshold, already suspended.
    StillLow { ratio_pct: f64, alert: AlertOutcome },
    Recovered { ratio_pct: f64 },
}

pub struct DiskGuard {
    platform: Arc<dyn Platform>,
    detached: bool,
}

impl DiskGuard {
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform,
            detached: false,
        }
    }

    /// Whether file sinks are currently suspended by the guard.
    #[must_use]
    pub const fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn check(
        &mut self,
        snap: &Snapshot,
        registry: &mut SinkRegistry,
        logger: &Logger,
        alerts: &mut AlertThrottle,
        now: Instant,
    ) -> GuardOutcome {
        let cfg = &snap.disk_guard;

        if !cfg.enabled {
            if !self.detached {
                return GuardOutcome::Disabled;
            }
            self.resume(snap, registry);
            logger.info("Disk guard disabled by config. File logging resumed.");
            return GuardOutcome::DisabledResumed;
        }

        if cfg.root.as_os_str().is_empty() {
            return GuardOutcome::NoRoot;
        }

        let stats = match self.platform.fs_stats(&cfg.root) {
            Ok(stats) => stats,
            Err(e) => {
                logger.warn(format_args!(
                    "DISK_ROOT='{}' capacity probe failed ({e}). Skip this round.",
                    cfg.root.display()
                ));
                return GuardOutcome::ProbeFailed {
                    root: cfg.root.clone(),
                    details: e.to_string(),
                };
            }
        };
        let ratio_pct = stats.free_ratio_pct();

        if ratio_pct < cfg.min_free_ratio_pct {
            let newly = !self.detached;
            if newly {
                registry.suspend_files();
                self.detached = true;
                logger.warn(format_args!(
                    "Low disk space on '{}': {ratio_pct:.2}% free. File logging suspended, console only.",
                    cfg.root.display()
                ));
            }
            let alert =
                alerts.maybe_alert(&snap.alert, ratio_pct, stats.available_bytes, &cfg.root, now);
            return if newly {
                GuardOutcome::Suspended { ratio_pct, alert }
            } else {
                GuardOutcome::StillLow { ratio_pct, alert }
            };
        }

        if self.detached {
            self.resume(snap, registry);
            logger.info(format_args!(
                "Disk space recovered on '{}': {ratio_pct:.2}% free. File logging resumed.",
                cfg.root.display()
            ));
            return GuardOutcome::Recovered { ratio_pct };
        }
        GuardOutcome::Healthy { ratio_pct }
    }

    fn resume(&mut self, snap: &Snapshot, registry: &mut SinkRegistry) {
        registry.resume_files();
        registry.apply_settings(snap);
        self.detached = false;
    }
}

//! `LoggerManager`: owns the snapshot, sink registry, reconciler, disk guard
//! and alert throttle under one lock, plus the reload scheduler.
//!
//! Lock order: the scheduler mutex is never taken while the state mutex is
//! held, and ticks only take the state mutex, so stopping the scheduler (which
//! joins a possibly running tick) cannot deadlock.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;
use serde::Serialize;

use crate::core::config::{
    DEFAULT_SECTION, Snapshot, config_mtime, env_var, resolve_config_path,
};
use crate::core::errors::{LgmError, Result};
use crate::daemon::alerts::{AlertThrottle, AlertTransport, UdpTransport};
use crate::daemon::reconcile::{FlushUpdate, HardReport, Reconciler};
use crate::daemon::scheduler::ReloadScheduler;
use crate::logger::fanout::FanoutSink;
use crate::logger::flusher::PeriodicFlusher;
use crate::logger::global;
use crate::logger::handle::Logger;
use crate::logger::registry::{SinkKind, SinkRegistry};
use crate::logger::sink::{SinkFactory, StdSinkFactory};
use crate::monitor::disk_guard::{DiskGuard, GuardOutcome};
use crate::platform::pal::{Platform, detect_platform};

/// Env variable consulted for the config path unless the caller picks another.
pub const DEFAULT_ENV_VAR: &str = "LGM_CONFIG_PATH";

// ──────────────────── init options ────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    /// Used when the env variable is unset or blank.
    pub default_config_path: PathBuf,
    pub section: String,
    pub logger_name: String,
    /// `None` skips the env lookup entirely.
    pub env_var: Option<String>,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            default_config_path: PathBuf::from("lgm.ini"),
            section: DEFAULT_SECTION.to_string(),
            logger_name: "lgm".to_string(),
            env_var: Some(DEFAULT_ENV_VAR.to_string()),
        }
    }
}

impl InitOptions {
    fn validate(&self) -> Result<()> {
        if self.section.trim().is_empty() {
            return Err(LgmError::InvalidConfig {
                details: "section name must not be empty".to_string(),
            });
        }
        if self.logger_name.trim().is_empty() {
            return Err(LgmError::InvalidConfig {
                details: "logger name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Replaceable edges of the manager.
#[derive(Clone)]
pub struct Collaborators {
    pub platform: Arc<dyn Platform>,
    pub transport: Arc<dyn AlertTransport>,
    pub sinks: Arc<dyn SinkFactory>,
}

impl Collaborators {
    /// Real filesystem probe, UDP transport and stdout/rotating-file sinks.
    pub fn system() -> Result<Self> {
        Ok(Self {
            platform: detect_platform()?,
            transport: Arc::new(UdpTransport::default()),
            sinks: Arc::new(StdSinkFactory),
        })
    }
}

// ──────────────────── tick report ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "config", rename_all = "snake_case")]
pub enum ConfigCheck {
    /// Modification time could not be read.
    Unreadable,
    Unchanged,
    Reloaded,
    LoadFailed { details: String },
}

/// Everything one reload check did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub config: ConfigCheck,
    pub hard: Option<HardReport>,
    pub flush: Option<FlushUpdate>,
    pub repaired: Vec<SinkKind>,
    pub guard: GuardOutcome,
}

// ──────────────────── shared state ────────────────────

struct ManagerState {
    config_path: PathBuf,
    section: String,
    snapshot: Snapshot,
    last_mtime: Option<SystemTime>,
    registry: SinkRegistry,
    reconciler: Reconciler,
    guard: DiskGuard,
    alerts: AlertThrottle,
    logger: Arc<Logger>,
    flusher: Option<PeriodicFlusher>,
}

impl ManagerState {
    fn check_disk(&mut self, now: Instant) -> GuardOutcome {
        self.guard.check(
            &self.snapshot,
            &mut self.registry,
            &self.logger,
            &mut self.alerts,
            now,
        )
    }

    fn reload_if_changed(&mut self, now: Instant) -> TickReport {
        let Some(mtime) = config_mtime(&self.config_path) else {
            return TickReport {
                config: ConfigCheck::Unreadable,
                hard: None,
                flush: None,
                repaired: Vec::new(),
                guard: self.check_disk(now),
            };
        };

        if self.last_mtime == Some(mtime) {
            let repaired =
                self.reconciler
                    .repair_missing(&mut self.registry, &self.logger, &self.snapshot);
            return TickReport {
                config: ConfigCheck::Unchanged,
                hard: None,
                flush: None,
                repaired,
                guard: self.check_disk(now),
            };
        }

        let mut next = match Snapshot::load(&self.config_path, &self.section) {
            Ok(next) => next,
            Err(e) => {
                // mtime stays unrecorded so the next tick retries the load.
                self.logger.warn(format_args!(
                    "Config reload from '{}' failed: {e}. Keeping previous settings.",
                    self.config_path.display()
                ));
                return TickReport {
                    config: ConfigCheck::LoadFailed {
                        details: e.to_string(),
                    },
                    hard: None,
                    flush: None,
                    repaired: Vec::new(),
                    guard: self.check_disk(now),
                };
            }
        };
        next.auto_reload_secs = self.snapshot.auto_reload_secs;

        let hard =
            self.reconciler
                .apply_hard(&mut self.registry, &self.logger, &self.snapshot, &next);
        let flush = self.reconciler.apply_soft(
            &self.registry,
            &self.logger,
            &mut self.flusher,
            &next,
            true,
        );
        self.snapshot = next;
        self.last_mtime = Some(mtime);
        self.logger.info(format_args!(
            "Config reloaded from '{}'.",
            self.config_path.display()
        ));

        TickReport {
            config: ConfigCheck::Reloaded,
            hard: Some(hard),
            flush: Some(flush),
            repaired: Vec::new(),
            guard: self.check_disk(now),
        }
    }
}

// ──────────────────── manager ────────────────────

/// Runtime-reconfigurable logging backend.
pub struct LoggerManager {
    state: Arc<Mutex<ManagerState>>,
    scheduler: Mutex<ReloadScheduler>,
}

impl LoggerManager {
    /// Initialize with the real platform, UDP transport and sinks, reading the
    /// config-path override from the process environment.
    pub fn init(options: &InitOptions) -> Result<Self> {
        Self::init_with(options, Collaborators::system()?, env_var)
    }

    /// Initialize with injected collaborators and env lookup.
    ///
    /// Fails only when the options are invalid or the first config load fails.
    pub fn init_with<F>(
        options: &InitOptions,
        collaborators: Collaborators,
        lookup: F,
    ) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        options.validate()?;
        let config_path = resolve_config_path(
            &options.default_config_path,
            options.env_var.as_deref(),
            lookup,
        );
        eprintln!("[LGM-CONFIG] using config {}", config_path.display());

        let snapshot = Snapshot::load(&config_path, &options.section).inspect_err(|e| {
            eprintln!("[LGM-CONFIG] failed to load config: {e}");
        })?;
        let last_mtime = config_mtime(&config_path);

        let fanout = Arc::new(FanoutSink::new());
        let logger = Arc::new(Logger::new(&options.logger_name, Arc::clone(&fanout)));
        let mut registry = SinkRegistry::new(fanout);
        let reconciler = Reconciler::new(collaborators.sinks);
        let mut flusher = None;

        reconciler.apply_hard(&mut registry, &logger, &snapshot, &snapshot);
        reconciler.apply_soft(&registry, &logger, &mut flusher, &snapshot, false);

        let auto_reload_secs = snapshot.auto_reload_secs;
        let mut state = ManagerState {
            config_path,
            section: options.section.clone(),
            snapshot,
            last_mtime,
            registry,
            reconciler,
            guard: DiskGuard::new(collaborators.platform),
            alerts: AlertThrottle::new(collaborators.transport),
            logger,
            flusher,
        };
        state.check_disk(Instant::now());

        let manager = Self {
            state: Arc::new(Mutex::new(state)),
            scheduler: Mutex::new(ReloadScheduler::new()),
        };
        if auto_reload_secs > 0 {
            manager.start_auto_reload(auto_reload_secs)?;
        }
        global::register(manager.logger());
        Ok(manager)
    }

    #[must_use]
    pub fn logger(&self) -> Arc<Logger> {
        Arc::clone(&self.state.lock().logger)
    }

    /// One reload check: reload on mtime change, repair missing sinks, run the disk guard.
    pub fn reload_if_changed(&self) -> TickReport {
        self.state.lock().reload_if_changed(Instant::now())
    }

    /// Start the background reload loop, or update its interval if running.
    /// Zero means 60 seconds.
    pub fn start_auto_reload(&self, interval_secs: u64) -> Result<()> {
        let weak = Arc::downgrade(&self.state);
        let tick = move || {
            if let Some(state) = weak.upgrade() {
                state.lock().reload_if_changed(Instant::now());
            }
        };
        self.scheduler
            .lock()
            .start(Duration::from_secs(interval_secs), tick)?;
        Ok(())
    }

    /// Stop the background loop and wait for it to exit.
    pub fn stop_auto_reload(&self) {
        self.scheduler.lock().stop();
    }

    #[must_use]
    pub fn is_auto_reload_running(&self) -> bool {
        self.scheduler.lock().is_running()
    }

    #[must_use]
    pub fn auto_reload_interval(&self) -> Option<Duration> {
        self.scheduler.lock().interval()
    }

    /// Copy of the settings currently in effect.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().snapshot.clone()
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.state.lock().config_path.clone()
    }

    /// Whether the disk guard currently has file sinks suspended.
    #[must_use]
    pub fn files_suspended(&self) -> bool {
        self.state.lock().guard.is_detached()
    }

    /// Kinds with a live instance and whether each is attached.
    #[must_use]
    pub fn sinks(&self) -> Vec<(SinkKind, bool)> {
        let state = self.state.lock();
        SinkKind::ALL
            .into_iter()
            .filter(|k| state.registry.exists(*k))
            .map(|k| (k, state.registry.is_attached(k)))
            .collect()
    }

    /// Flush interval of the periodic flusher, if one runs.
    #[must_use]
    pub fn flush_interval_secs(&self) -> Option<u64> {
        self.state
            .lock()
            .flusher
            .as_ref()
            .map(PeriodicFlusher::interval_secs)
    }
}

impl Drop for LoggerManager {
    fn drop(&mut self) {
        self.scheduler.get_mut().stop();
        let mut state = self.state.lock();
        if let Some(mut flusher) = state.flusher.take() {
            flusher.stop();
        }
        state.logger.flush();
        global::unregister_instance(&state.logger);
    }
}

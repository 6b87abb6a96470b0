//! Configuration snapshot: one INI section + env path override + hard-coded defaults.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ini::{Ini, ParseOption, Properties};
use serde::Serialize;

use crate::core::errors::{LgmError, Result};
use crate::core::parse::{
    parse_bool, parse_f64, parse_port, parse_severity, parse_size_bytes, parse_text,
    parse_time_mode, parse_u64, parse_usize,
};
use crate::logger::level::Severity;
use crate::logger::pattern::TimeMode;

/// Section read when the caller does not name one.
pub const DEFAULT_SECTION: &str = "Log";
pub const DEFAULT_CONSOLE_PATTERN: &str = "[%Y-%m-%d %H:%M:%S.%e] [%^%l%$] [%t] %v";
pub const DEFAULT_FILE_PATTERN: &str = "[%Y-%m-%d %H:%M:%S.%e] [%l] [%t] %v";
pub const DEFAULT_ALERT_TEMPLATE: &str = "DISK LOW: path={path} free={avail_bytes}B ({ratio}%)";
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024;
pub const DEFAULT_AUTO_RELOAD_SECS: u64 = 60;

/// Typed settings of one configuration load. Never mutated after construction
/// except for carrying `auto_reload_secs` across reloads.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Snapshot {
    pub time_mode: TimeMode,
    pub console: ConsoleSinkConfig,
    pub all_file: FileSinkConfig,
    pub alerts_file: FileSinkConfig,
    pub logger_level: Severity,
    pub flush_on: Severity,
    pub flush_every_secs: u64,
    pub console_pattern: String,
    pub file_pattern: String,
    pub disk_guard: DiskGuardConfig,
    pub alert: AlertConfig,
    /// Scheduler cadence. Only honoured at init.
    pub auto_reload_secs: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConsoleSinkConfig {
    pub enabled: bool,
    pub level: Severity,
}

/// One rotating file destination.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileSinkConfig {
    pub enabled: bool,
    pub level: Severity,
    pub path: PathBuf,
    pub max_size_bytes: u64,
    pub max_files: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiskGuardConfig {
    pub enabled: bool,
    /// Empty disables the guard.
    pub root: PathBuf,
    /// Minimum free space, percent.
    pub min_free_ratio_pct: f64,
}

/// UDP alert target and payload template.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AlertConfig {
    pub host: String,
    pub port: u16,
    pub interval_secs: u64,
    pub template: String,
}

impl FileSinkConfig {
    #[must_use]
    pub fn all_default() -> Self {
        Self {
            enabled: true,
            level: Severity::Trace,
            path: PathBuf::from("logs/all.log"),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            max_files: 5,
        }
    }

    #[must_use]
    pub fn alerts_default() -> Self {
        Self {
            enabled: true,
            level: Severity::Warn,
            path: PathBuf::from("logs/alerts.log"),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            max_files: 10,
        }
    }

    /// Whether path or rotation limits differ; these need a new sink instance.
    #[must_use]
    pub fn rotation_differs(&self, other: &Self) -> bool {
        self.path != other.path
            || self.max_size_bytes != other.max_size_bytes
            || self.max_files != other.max_files
    }
}

impl AlertConfig {
    /// Alerts need both a host and a non-zero port.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && self.port != 0
    }
}

impl Default for ConsoleSinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Severity::Trace,
        }
    }
}

impl Default for DiskGuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: PathBuf::new(),
            min_free_ratio_pct: 5.0,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 0,
            interval_secs: 60,
            template: DEFAULT_ALERT_TEMPLATE.to_string(),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            time_mode: TimeMode::Local,
            console: ConsoleSinkConfig::default(),
            all_file: FileSinkConfig::all_default(),
            alerts_file: FileSinkConfig::alerts_default(),
            logger_level: Severity::Trace,
            flush_on: Severity::Warn,
            flush_every_secs: 1,
            console_pattern: DEFAULT_CONSOLE_PATTERN.to_string(),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            disk_guard: DiskGuardConfig::default(),
            alert: AlertConfig::default(),
            auto_reload_secs: DEFAULT_AUTO_RELOAD_SECS,
        }
    }
}

impl Snapshot {
    /// Load `section` from the INI file at `path`.
    ///
    /// Missing/unreadable files and broken INI syntax are errors; individual
    /// malformed keys fall back to their defaults.
    pub fn load(path: &Path, section: &str) -> Result<Self> {
        if !path.exists() {
            return Err(LgmError::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|source| LgmError::io(path, source))?;
        Self::from_ini_str(&raw, section)
    }

    /// Parse an INI document already in memory.
    pub fn from_ini_str(raw: &str, section: &str) -> Result<Self> {
        let ini = Ini::load_from_str_opt(raw, parse_options()).map_err(|err| {
            LgmError::ConfigParse {
                context: "ini",
                details: err.to_string(),
            }
        })?;
        Ok(Self::from_ini(&ini, section))
    }

    /// Typed view of `section`; a missing section yields all defaults.
    #[must_use]
    pub fn from_ini(ini: &Ini, section: &str) -> Self {
        ini.section(Some(section))
            .map_or_else(Self::default, Self::from_properties)
    }

    fn from_properties(props: &Properties) -> Self {
        let d = Self::default();
        // Repeated keys: the last occurrence wins.
        let get = |key: &str| props.get_all(key).last();

        Self {
            time_mode: parse_time_mode(get("TIME_MODE")),
            console: ConsoleSinkConfig {
                enabled: parse_bool(get("ENABLE_CONSOLE_LOG"), d.console.enabled),
                level: parse_severity(get("CONSOLE_LEVEL"), d.console.level),
            },
            all_file: FileSinkConfig {
                enabled: parse_bool(get("ENABLE_FILE_LOG_ALL"), d.all_file.enabled),
                level: parse_severity(get("ALL_FILE_LEVEL"), d.all_file.level),
                path: PathBuf::from(parse_text(get("ALL_PATH"), "logs/all.log")),
                max_size_bytes: parse_size_bytes(get("ALL_MAX_SIZE"), d.all_file.max_size_bytes),
                max_files: parse_usize(get("ALL_MAX_FILES"), d.all_file.max_files),
            },
            alerts_file: FileSinkConfig {
                enabled: parse_bool(get("ENABLE_FILE_LOG_ALERTS"), d.alerts_file.enabled),
                level: parse_severity(get("ALERTS_FILE_LEVEL"), d.alerts_file.level),
                path: PathBuf::from(parse_text(get("ALERTS_PATH"), "logs/alerts.log")),
                max_size_bytes: parse_size_bytes(
                    get("ALERT_MAX_SIZE"),
                    d.alerts_file.max_size_bytes,
                ),
                max_files: parse_usize(get("ALERT_MAX_FILES"), d.alerts_file.max_files),
            },
            logger_level: parse_severity(get("LOGGER_LEVEL"), d.logger_level),
            flush_on: parse_severity(get("FLUSH_ON_LEVEL"), d.flush_on),
            flush_every_secs: parse_u64(get("FLUSH_EVERY_SEC"), d.flush_every_secs),
            console_pattern: parse_text(get("PATTERN_CONSOLE"), DEFAULT_CONSOLE_PATTERN),
            file_pattern: parse_text(get("PATTERN_FILE"), DEFAULT_FILE_PATTERN),
            disk_guard: DiskGuardConfig {
                enabled: parse_bool(get("DISK_GUARD_ENABLE"), d.disk_guard.enabled),
                root: PathBuf::from(parse_text(get("DISK_ROOT"), "")),
                min_free_ratio_pct: parse_f64(
                    get("DISK_MIN_FREE_RATIO"),
                    d.disk_guard.min_free_ratio_pct,
                ),
            },
            alert: AlertConfig {
                host: parse_text(get("UDP_ALERT_IP"), ""),
                port: parse_port(get("UDP_ALERT_PORT"), d.alert.port),
                interval_secs: parse_u64(get("UDP_ALERT_INTERVAL_SEC"), d.alert.interval_secs),
                template: parse_text(get("UDP_ALERT_MESSAGE"), DEFAULT_ALERT_TEMPLATE),
            },
            auto_reload_secs: parse_u64(get("AUTO_RELOAD_SEC"), d.auto_reload_secs),
        }
    }

    /// Deterministic FNV-1a hash of the effective settings, for diagnostics.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self).map_err(|err| LgmError::Runtime {
            details: format!("snapshot serialization failed: {err}"),
        })?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }
}

/// Backslashes are literal (Windows paths, patterns); quotes are stripped.
fn parse_options() -> ParseOption {
    ParseOption {
        enabled_escape: false,
        ..ParseOption::default()
    }
}

/// Modification time of the configuration file, `None` when unreadable.
#[must_use]
pub fn config_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Pick the configuration path: the env variable named `env_name` when set
/// and non-blank, otherwise `default`.
pub fn resolve_config_path<F>(default: &Path, env_name: Option<&str>, mut lookup: F) -> PathBuf
where
    F: FnMut(&str) -> Option<String>,
{
    env_name
        .filter(|name| !name.is_empty())
        .and_then(|name| lookup(name))
        .filter(|raw| !raw.trim().is_empty())
        .map_or_else(|| default.to_path_buf(), PathBuf::from)
}

/// Process-environment lookup for [`resolve_config_path`].
#[must_use]
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

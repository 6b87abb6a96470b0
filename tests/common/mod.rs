#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use filetime::FileTime;
use log_guard_manager::daemon::alerts::RecordingTransport;
use log_guard_manager::daemon::manager::{Collaborators, InitOptions, LoggerManager};
use log_guard_manager::logger::memory::{MemorySink, MemorySinkFactory};
use log_guard_manager::platform::pal::MockPlatform;
use tempfile::TempDir;

// ──────────────────── CLI runner ────────────────────

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_lgm") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "lgm.exe" } else { "lgm" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve lgm binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("lgm-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .env_remove("LGM_CONFIG_PATH")
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute lgm command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_content = format!(
        "case={case_name}\nbin={}\nargs={args:?}\nstatus={}\n----- stdout -----\n{stdout}\n----- stderr -----\n{stderr}\n",
        bin_path.display(),
        output.status
    );
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

// ──────────────────── manager harness ────────────────────

/// Temp config file plus scripted collaborators for one manager.
pub struct Harness {
    pub dir: TempDir,
    pub config_path: PathBuf,
    pub sinks: Arc<MemorySinkFactory>,
    pub platform: Arc<MockPlatform>,
    pub transport: Arc<RecordingTransport>,
    mtime_step: AtomicI64,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let config_path = dir.path().join("lgm.ini");
        Self {
            dir,
            config_path,
            sinks: MemorySinkFactory::new(),
            platform: MockPlatform::new(),
            transport: RecordingTransport::new(),
            mtime_step: AtomicI64::new(0),
        }
    }

    /// Path under the temp dir, for sink file settings.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `[Log]` + `body` and give the file a fresh, strictly increasing mtime
    /// so coarse filesystem timestamps never hide a rewrite.
    pub fn write_config(&self, body: &str) {
        fs::write(&self.config_path, format!("[Log]\n{body}")).expect("write config");
        let step = self.mtime_step.fetch_add(1, Ordering::SeqCst);
        let base: i64 = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
            .try_into()
            .unwrap_or(i64::MAX / 2);
        filetime::set_file_mtime(
            &self.config_path,
            FileTime::from_unix_time(base - 10_000 + step * 10, 0),
        )
        .expect("bump mtime");
    }

    pub fn options(&self) -> InitOptions {
        InitOptions {
            default_config_path: self.config_path.clone(),
            env_var: None,
            ..InitOptions::default()
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            platform: self.platform.clone(),
            transport: self.transport.clone(),
            sinks: self.sinks.clone(),
        }
    }

    pub fn init(&self) -> LoggerManager {
        LoggerManager::init_with(&self.options(), self.collaborators(), |_| None)
            .expect("manager init")
    }

    pub fn console(&self) -> Arc<MemorySink> {
        self.sinks.latest(None).expect("console sink built")
    }

    pub fn file(&self, path: &Path) -> Arc<MemorySink> {
        self.sinks.latest(Some(path)).expect("file sink built")
    }
}

/// Config body with both file sinks under `h`'s temp dir, background threads
/// disabled and the message-only patterns tests match against.
pub fn base_config(h: &Harness) -> String {
    config_with(h, &[])
}

/// [`base_config`] with `overrides` replacing (or adding) keys. Each key
/// appears once so each override is the only value for its key.
pub fn config_with(h: &Harness, overrides: &[(&str, &str)]) -> String {
    let all = h.path("all.log").display().to_string();
    let alerts = h.path("alerts.log").display().to_string();
    let mut entries: Vec<(String, String)> = [
        ("ALL_PATH", all.as_str()),
        ("ALERTS_PATH", alerts.as_str()),
        ("AUTO_RELOAD_SEC", "0"),
        ("FLUSH_EVERY_SEC", "0"),
        ("PATTERN_CONSOLE", "%v"),
        ("PATTERN_FILE", "%l %v"),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    .collect();

    for (key, value) in overrides {
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = (*value).to_string(),
            None => entries.push(((*key).to_string(), (*value).to_string())),
        }
    }
    entries
        .iter()
        .map(|(k, v)| format!("{k}={v}\n"))
        .collect()
}

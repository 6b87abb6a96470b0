//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::{Colorize, control};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use log_guard_manager::core::config::{DEFAULT_SECTION, Snapshot, env_var, resolve_config_path};
use log_guard_manager::core::errors::LgmError;
use log_guard_manager::daemon::manager::{
    ConfigCheck, DEFAULT_ENV_VAR, InitOptions, LoggerManager, TickReport,
};
use log_guard_manager::daemon::signals::SignalHandler;
use log_guard_manager::platform::pal::detect_platform;
use log_guard_manager::{
    lgm_critical, lgm_debug, lgm_error, lgm_info, lgm_trace, lgm_warn,
};

const DEFAULT_CONFIG_FILE: &str = "lgm.ini";

/// Log Guard Manager: hot-reloadable logging with a disk-space guard.
#[derive(Debug, Parser)]
#[command(
    name = "lgm",
    author,
    version,
    about = "Log Guard Manager - hot-reloadable logging backend",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path (takes precedence over the env variable).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Initialize the manager and emit demo records until interrupted.
    Run(RunArgs),
    /// Inspect the effective configuration.
    Config(ConfigArgs),
    /// Show capacity of the filesystem holding a path.
    Disk(DiskArgs),
}

#[derive(Debug, Clone, Args, Serialize)]
struct RunArgs {
    /// INI section holding the settings.
    #[arg(long, default_value = DEFAULT_SECTION, value_name = "NAME")]
    section: String,
    /// Logger name printed by the `%n` pattern token.
    #[arg(long, default_value = "lgm", value_name = "LOGGER")]
    name: String,
    /// Env variable consulted for the config path.
    #[arg(long, default_value = DEFAULT_ENV_VAR, value_name = "VAR")]
    env: String,
    /// Seconds between demo record batches.
    #[arg(
        long,
        default_value_t = 1,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval: u64,
}

#[derive(Debug, Clone, Args, Serialize)]
struct ConfigArgs {
    /// INI section holding the settings.
    #[arg(long, global = true, default_value = DEFAULT_SECTION, value_name = "NAME")]
    section: String,
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand, Serialize)]
enum ConfigCommand {
    /// Print the resolved config file path.
    Path,
    /// Print the effective settings snapshot.
    Show,
}

#[derive(Debug, Clone, Args, Serialize)]
struct DiskArgs {
    /// Any path on the filesystem to probe.
    #[arg(value_name = "PATH")]
    path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<LgmError> for CliError {
    fn from(err: LgmError) -> Self {
        match err {
            LgmError::InvalidConfig { .. }
            | LgmError::MissingConfig { .. }
            | LgmError::ConfigParse { .. } => Self::User(err.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_demo(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Disk(args) => run_disk(cli, args),
    }
}

// ---------------------------------------------------------------------------
// Run command: demo emitter loop
// ---------------------------------------------------------------------------

fn init_options(cli: &Cli, args: &RunArgs) -> InitOptions {
    InitOptions {
        default_config_path: cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        section: args.section.clone(),
        logger_name: args.name.clone(),
        // An explicit --config wins over the environment.
        env_var: if cli.config.is_some() {
            None
        } else {
            Some(args.env.clone())
        },
    }
}

fn run_demo(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let mode = output_mode(cli);
    // Any init failure is reported as exit code 1.
    let manager = LoggerManager::init(&init_options(cli, args))
        .map_err(|e| CliError::User(e.to_string()))?;
    let logger = manager.logger();
    let signals = SignalHandler::new();
    let interval = Duration::from_secs(args.interval);

    let mut batches: u64 = 0;
    let mut reloads: u64 = 0;
    while !signals.should_shutdown() {
        if signals.should_reload() {
            let report = manager.reload_if_changed();
            reloads += 1;
            report_forced_reload(mode, &manager, &report)?;
        }

        batches += 1;
        let name = args.name.as_str();
        lgm_trace!(name, "demo batch {batches}: trace record");
        lgm_debug!(name, "demo batch {batches}: debug record");
        lgm_info!(name, "demo batch {batches}: info record");
        lgm_warn!(name, "demo batch {batches}: warning record");
        lgm_error!(name, "demo batch {batches}: error record");
        lgm_critical!(name, "demo batch {batches}: critical record");
        signals.sleep(interval);
    }
    logger.flush();

    match mode {
        OutputMode::Human => {
            println!(
                "{} after {batches} batch(es), {reloads} forced reload(s)",
                "stopped".bold()
            );
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "run",
                "config_path": manager.config_path().to_string_lossy(),
                "batches": batches,
                "forced_reloads": reloads,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn report_forced_reload(
    mode: OutputMode,
    manager: &LoggerManager,
    report: &TickReport,
) -> Result<(), CliError> {
    match mode {
        OutputMode::Human => {
            let status = match &report.config {
                ConfigCheck::Reloaded => "reloaded".green(),
                ConfigCheck::Unchanged => "unchanged".normal(),
                ConfigCheck::Unreadable => "unreadable".yellow(),
                ConfigCheck::LoadFailed { .. } => "load failed".red(),
            };
            eprintln!(
                "[LGM-SIGNAL] SIGHUP: config {status} ({})",
                manager.config_path().display()
            );
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "run",
                "event": "sighup",
                "report": serde_json::to_value(report)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn resolved_config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(|| {
        resolve_config_path(Path::new(DEFAULT_CONFIG_FILE), Some(DEFAULT_ENV_VAR), env_var)
    })
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    let path = resolved_config_path(cli);
    match &args.command {
        Some(ConfigCommand::Path) => {
            let exists = path.exists();
            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; init will fail)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        None | Some(ConfigCommand::Show) => {
            let snapshot = Snapshot::load(&path, &args.section)?;
            let hash = snapshot.stable_hash()?;

            match output_mode(cli) {
                OutputMode::Human => print_snapshot(&path, &args.section, &snapshot, &hash),
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "path": path.to_string_lossy(),
                        "section": args.section,
                        "hash": hash,
                        "config": serde_json::to_value(&snapshot)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

fn print_snapshot(path: &Path, section: &str, snap: &Snapshot, hash: &str) {
    println!("{} [{section}] {}", path.display().to_string().bold(), hash.dimmed());
    println!(
        "  console       {} level={}",
        on_off(snap.console.enabled),
        snap.console.level.name()
    );
    for (label, file) in [("all-file", &snap.all_file), ("alerts-file", &snap.alerts_file)] {
        println!(
            "  {label:<13} {} level={} path={} max={} files={}",
            on_off(file.enabled),
            file.level.name(),
            file.path.display(),
            format_bytes(file.max_size_bytes),
            file.max_files
        );
    }
    println!(
        "  logger        level={} flush_on={} flush_every={}s",
        snap.logger_level.name(),
        snap.flush_on.name(),
        snap.flush_every_secs
    );
    println!(
        "  disk guard    {} root={} min_free={:.2}%",
        on_off(snap.disk_guard.enabled),
        snap.disk_guard.root.display(),
        snap.disk_guard.min_free_ratio_pct
    );
    if snap.alert.is_configured() {
        println!(
            "  alert         {}:{} every {}s",
            snap.alert.host, snap.alert.port, snap.alert.interval_secs
        );
    } else {
        println!("  alert         {}", "not configured".dimmed());
    }
    println!("  auto reload   {}s", snap.auto_reload_secs);
}

fn on_off(enabled: bool) -> colored::ColoredString {
    if enabled { "on ".green() } else { "off".red() }
}

// ---------------------------------------------------------------------------
// Disk command
// ---------------------------------------------------------------------------

fn run_disk(cli: &Cli, args: &DiskArgs) -> Result<(), CliError> {
    let platform = detect_platform()?;
    let stats = platform.fs_stats(&args.path)?;
    let ratio = stats.free_ratio_pct();

    match output_mode(cli) {
        OutputMode::Human => {
            println!(
                "{}: {} available of {} ({ratio:.2}% free){}",
                args.path.display(),
                format_bytes(stats.available_bytes),
                format_bytes(stats.total_bytes),
                if stats.is_readonly { " [read-only]" } else { "" }
            );
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "disk",
                "path": args.path.to_string_lossy(),
                "stats": serde_json::to_value(stats)?,
                "free_ratio_pct": ratio,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    const TIB: u64 = 1024 * GIB;

    if bytes >= TIB {
        format!("{:.1} TB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.1} GB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("LGM_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

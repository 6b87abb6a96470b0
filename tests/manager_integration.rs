//! End-to-end reload scenarios against scripted sinks, disk readings and
//! alert transport.

mod common;

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{Harness, base_config, config_with};
use log_guard_manager::daemon::alerts::AlertOutcome;
use log_guard_manager::daemon::manager::ConfigCheck;
use log_guard_manager::daemon::reconcile::{FALLBACK_WARNING, FlushUpdate, SinkDecision};
use log_guard_manager::logger::level::Severity;
use log_guard_manager::logger::pattern::TimeMode;
use log_guard_manager::logger::registry::{SinkKind, SinkStep};
use log_guard_manager::logger::sink::{SharedSink, Sink};
use log_guard_manager::monitor::disk_guard::GuardOutcome;

fn all_attached() -> Vec<(SinkKind, bool)> {
    vec![
        (SinkKind::Console, true),
        (SinkKind::AllFile, true),
        (SinkKind::AlertsFile, true),
    ]
}

#[test]
fn soft_reload_keeps_sink_instances() {
    let h = Harness::new();
    h.write_config(&base_config(&h));
    let manager = h.init();
    let console = h.console();
    let all = h.file(&h.path("all.log"));
    let built_before = h.sinks.built().len();

    h.write_config(&config_with(
        &h,
        &[
            ("CONSOLE_LEVEL", "error"),
            ("ALL_FILE_LEVEL", "warn"),
            ("PATTERN_CONSOLE", ">> %v"),
        ],
    ));
    let report = manager.reload_if_changed();

    assert_eq!(report.config, ConfigCheck::Reloaded);
    let hard = report.hard.expect("hard report on reload");
    assert!(hard.is_noop(), "soft-only change must not touch instances: {hard:?}");
    assert!(hard.steps.is_empty());
    assert_eq!(h.sinks.built().len(), built_before);
    assert_eq!(console.min_severity(), Severity::Error);
    assert_eq!(all.min_severity(), Severity::Warn);
    assert_eq!(console.pattern(), ">> %v");

    let logger = manager.logger();
    logger.warn("disk nearly full");
    logger.error("write failed");
    assert!(console.lines().iter().any(|l| l == ">> write failed"));
    assert!(!console.lines().iter().any(|l| l.contains("disk nearly full")));
    assert!(all.lines().iter().any(|l| l == "warning disk nearly full"));
}

#[test]
fn reapplying_same_soft_settings_changes_nothing() {
    let h = Harness::new();
    h.write_config(&base_config(&h));
    let manager = h.init();
    let sinks = [
        h.console(),
        h.file(&h.path("all.log")),
        h.file(&h.path("alerts.log")),
    ];
    let body = config_with(
        &h,
        &[
            ("TIME_MODE", "utc"),
            ("CONSOLE_LEVEL", "info"),
            ("ALL_FILE_LEVEL", "debug"),
            ("ALERTS_FILE_LEVEL", "critical"),
            ("PATTERN_CONSOLE", "[%n] %v"),
            ("PATTERN_FILE", "%L %v"),
            ("LOGGER_LEVEL", "debug"),
            ("FLUSH_ON_LEVEL", "error"),
        ],
    );
    let observe = || {
        let logger = manager.logger();
        let per_sink: Vec<(Severity, String, TimeMode)> = sinks
            .iter()
            .map(|s| (s.min_severity(), s.pattern(), s.time_mode()))
            .collect();
        (per_sink, logger.level(), logger.flush_on())
    };

    h.write_config(&body);
    assert_eq!(manager.reload_if_changed().config, ConfigCheck::Reloaded);
    let once = observe();

    h.write_config(&body);
    let report = manager.reload_if_changed();
    assert_eq!(report.config, ConfigCheck::Reloaded);
    let hard = report.hard.expect("hard report on reload");
    assert!(hard.is_noop(), "identical config must not rebuild: {hard:?}");
    assert!(hard.steps.is_empty());
    let twice = observe();

    assert_eq!(once, twice);
    assert_eq!(
        once.0,
        vec![
            (Severity::Info, "[%n] %v".to_string(), TimeMode::Utc),
            (Severity::Debug, "%L %v".to_string(), TimeMode::Utc),
            (Severity::Critical, "%L %v".to_string(), TimeMode::Utc),
        ]
    );
    assert_eq!((once.1, once.2), (Severity::Debug, Severity::Error));
    assert_eq!(h.sinks.built().len(), 3);
    for sink in &sinks {
        assert!(manager.logger().fanout().contains(&(Arc::clone(sink) as SharedSink)));
    }
}

#[test]
fn file_path_change_attaches_new_before_retiring_old() {
    let h = Harness::new();
    h.write_config(&base_config(&h));
    let manager = h.init();
    let old_all = h.file(&h.path("all.log"));
    manager.logger().info("before move");

    let moved = h.path("moved.log");
    let moved_str = moved.display().to_string();
    h.write_config(&config_with(&h, &[("ALL_PATH", moved_str.as_str())]));
    let report = manager.reload_if_changed();
    let hard = report.hard.expect("hard report on reload");

    assert_eq!(hard.decision(SinkKind::AllFile), Some(SinkDecision::Recreate));
    assert_eq!(hard.decision(SinkKind::Console), Some(SinkDecision::Keep));
    assert_eq!(hard.decision(SinkKind::AlertsFile), Some(SinkDecision::Keep));

    let [
        SinkStep::Attach { kind: k1, id: new_id },
        SinkStep::Flush { kind: k2, id: old_flushed },
        SinkStep::Detach { kind: k3, id: old_detached },
    ] = hard.steps.as_slice()
    else {
        panic!("unexpected step sequence: {:?}", hard.steps);
    };
    assert_eq!([*k1, *k2, *k3], [SinkKind::AllFile; 3]);
    assert_eq!(old_flushed, old_detached);
    assert_ne!(new_id, old_flushed);
    assert!(old_all.flush_count() >= 1);

    let new_all = h.file(&moved);
    manager.logger().info("after move");
    assert!(old_all.lines().iter().any(|l| l == "info before move"));
    assert!(!old_all.lines().iter().any(|l| l.contains("after move")));
    assert!(new_all.lines().iter().any(|l| l == "info after move"));
    assert_eq!(manager.sinks(), all_attached());
}

#[test]
fn disabling_every_sink_leaves_exactly_one_fallback_console() {
    let h = Harness::new();
    h.write_config(&base_config(&h));
    let manager = h.init();
    let first_console = h.console();

    h.write_config(&config_with(
        &h,
        &[
            ("ENABLE_CONSOLE_LOG", "false"),
            ("ENABLE_FILE_LOG_ALL", "false"),
            ("ENABLE_FILE_LOG_ALERTS", "false"),
        ],
    ));
    let report = manager.reload_if_changed();
    let hard = report.hard.expect("hard report on reload");

    assert!(hard.fallback);
    assert_eq!(hard.decision(SinkKind::Console), Some(SinkDecision::Destroy));
    assert_eq!(manager.sinks(), vec![(SinkKind::Console, true)]);

    let fallback = h.console();
    assert!(!std::sync::Arc::ptr_eq(&fallback, &first_console));
    assert_eq!(fallback.min_severity(), Severity::Trace);
    let warnings = fallback
        .lines()
        .iter()
        .filter(|l| l.contains(FALLBACK_WARNING))
        .count();
    assert_eq!(warnings, 1);

    manager.logger().trace("still visible");
    assert!(fallback.lines().iter().any(|l| l == "still visible"));
}

#[test]
fn disk_ratio_sequence_suspends_alerts_once_and_recovers() {
    let h = Harness::new();
    h.platform.push_ratios(&[10.0, 3.0, 3.0, 6.0]);
    let root = h.dir.path().display().to_string();
    h.write_config(&config_with(
        &h,
        &[
            ("DISK_ROOT", root.as_str()),
            ("DISK_MIN_FREE_RATIO", "5"),
            ("UDP_ALERT_IP", "127.0.0.1"),
            ("UDP_ALERT_PORT", "9999"),
            ("UDP_ALERT_INTERVAL_SEC", "3600"),
            ("UDP_ALERT_MESSAGE", "LOW {ratio}% at {path} ({avail_bytes}B)"),
        ],
    ));
    let manager = h.init();
    assert!(!manager.files_suspended());
    let all = h.file(&h.path("all.log"));

    let first = manager.reload_if_changed();
    let GuardOutcome::Suspended { alert, .. } = &first.guard else {
        panic!("expected suspension, got {:?}", first.guard);
    };
    let expected = format!("LOW 3.00% at {root} (30B)");
    assert_eq!(alert, &AlertOutcome::Sent { payload: expected.clone() });
    assert!(manager.files_suspended());
    assert_eq!(
        manager.sinks(),
        vec![
            (SinkKind::Console, true),
            (SinkKind::AllFile, false),
            (SinkKind::AlertsFile, false),
        ]
    );

    manager.logger().error("console only");
    assert!(!all.lines().iter().any(|l| l.contains("console only")));
    assert!(h.console().lines().iter().any(|l| l == "console only"));

    let second = manager.reload_if_changed();
    assert!(matches!(
        second.guard,
        GuardOutcome::StillLow {
            alert: AlertOutcome::Throttled,
            ..
        }
    ));

    let third = manager.reload_if_changed();
    assert!(matches!(third.guard, GuardOutcome::Recovered { .. }));
    assert!(!manager.files_suspended());
    assert_eq!(manager.sinks(), all_attached());

    assert_eq!(
        h.transport.sent(),
        vec![(expected, "127.0.0.1".to_string(), 9999)]
    );
    manager.logger().error("back on disk");
    assert!(all.lines().iter().any(|l| l == "error back on disk"));
}

#[test]
fn unchanged_config_creates_nothing_and_sends_nothing() {
    let h = Harness::new();
    h.write_config(&base_config(&h));
    let manager = h.init();
    let built = h.sinks.built().len();
    let snapshot = manager.snapshot();

    for _ in 0..3 {
        let report = manager.reload_if_changed();
        assert_eq!(report.config, ConfigCheck::Unchanged);
        assert!(report.hard.is_none());
        assert!(report.repaired.is_empty());
        assert_eq!(report.guard, GuardOutcome::NoRoot);
    }
    assert_eq!(h.sinks.built().len(), built);
    assert_eq!(manager.snapshot(), snapshot);
    assert_eq!(h.transport.attempts(), 0);
}

#[test]
fn failed_load_keeps_previous_snapshot_and_retries() {
    let h = Harness::new();
    h.write_config(&config_with(&h, &[("CONSOLE_LEVEL", "info")]));
    let manager = h.init();
    let before = manager.snapshot();

    // A directory at the config path has an mtime but cannot be read.
    fs::remove_file(&h.config_path).unwrap();
    fs::create_dir(&h.config_path).unwrap();
    let report = manager.reload_if_changed();
    assert!(matches!(report.config, ConfigCheck::LoadFailed { .. }));
    assert_eq!(manager.snapshot(), before);
    assert!(
        h.console()
            .lines()
            .iter()
            .any(|l| l.contains("Keeping previous settings"))
    );

    let again = manager.reload_if_changed();
    assert!(matches!(again.config, ConfigCheck::LoadFailed { .. }));

    fs::remove_dir(&h.config_path).unwrap();
    h.write_config(&config_with(&h, &[("CONSOLE_LEVEL", "error")]));
    let report = manager.reload_if_changed();
    assert_eq!(report.config, ConfigCheck::Reloaded);
    assert_eq!(manager.snapshot().console.level, Severity::Error);
}

#[test]
fn missing_config_during_run_is_skipped() {
    let h = Harness::new();
    h.write_config(&base_config(&h));
    let manager = h.init();
    fs::remove_file(&h.config_path).unwrap();

    let report = manager.reload_if_changed();
    assert_eq!(report.config, ConfigCheck::Unreadable);
    assert_eq!(manager.sinks(), all_attached());
}

#[test]
fn file_sink_rebuilt_while_suspended_stays_detached() {
    let h = Harness::new();
    h.platform.push_ratios(&[2.0]);
    let root = h.dir.path().display().to_string();
    let guard = [("DISK_ROOT", root.as_str()), ("DISK_MIN_FREE_RATIO", "5")];
    h.write_config(&config_with(&h, &guard));
    let manager = h.init();
    assert!(manager.files_suspended());

    let moved = h.path("moved.log");
    let moved_str = moved.display().to_string();
    let mut relocated = guard.to_vec();
    relocated.push(("ALL_PATH", moved_str.as_str()));
    h.write_config(&config_with(&h, &relocated));
    let report = manager.reload_if_changed();
    assert_eq!(
        report.hard.expect("hard report").decision(SinkKind::AllFile),
        Some(SinkDecision::Recreate)
    );
    assert!(matches!(report.guard, GuardOutcome::StillLow { .. }));
    assert_eq!(
        manager.sinks(),
        vec![
            (SinkKind::Console, true),
            (SinkKind::AllFile, false),
            (SinkKind::AlertsFile, false),
        ]
    );

    h.platform.push_ratios(&[50.0]);
    let report = manager.reload_if_changed();
    assert!(matches!(report.guard, GuardOutcome::Recovered { .. }));
    manager.logger().info("resumed");
    assert!(h.file(&moved).lines().iter().any(|l| l == "info resumed"));
}

#[test]
fn disabling_guard_while_suspended_resumes_files() {
    let h = Harness::new();
    h.platform.push_ratios(&[1.0]);
    let root = h.dir.path().display().to_string();
    h.write_config(&config_with(
        &h,
        &[("DISK_ROOT", root.as_str()), ("DISK_MIN_FREE_RATIO", "5")],
    ));
    let manager = h.init();
    assert!(manager.files_suspended());

    h.write_config(&config_with(&h, &[("DISK_GUARD_ENABLE", "false")]));
    let report = manager.reload_if_changed();
    assert_eq!(report.guard, GuardOutcome::DisabledResumed);
    assert!(!manager.files_suspended());
    assert_eq!(manager.sinks(), all_attached());
}

#[test]
fn failed_file_sink_is_repaired_on_a_later_tick() {
    let h = Harness::new();
    h.sinks.fail_file_sinks(true);
    h.write_config(&base_config(&h));
    let manager = h.init();
    assert_eq!(manager.sinks(), vec![(SinkKind::Console, true)]);

    h.sinks.fail_file_sinks(false);
    let report = manager.reload_if_changed();
    assert_eq!(report.config, ConfigCheck::Unchanged);
    assert_eq!(report.repaired, vec![SinkKind::AllFile, SinkKind::AlertsFile]);
    assert_eq!(manager.sinks(), all_attached());
}

#[test]
fn flush_interval_follows_reloads() {
    let h = Harness::new();
    h.write_config(&config_with(&h, &[("FLUSH_EVERY_SEC", "30")]));
    let manager = h.init();
    assert_eq!(manager.flush_interval_secs(), Some(30));

    h.write_config(&config_with(&h, &[("FLUSH_EVERY_SEC", "5")]));
    assert_eq!(manager.reload_if_changed().flush, Some(FlushUpdate::Updated));
    assert_eq!(manager.flush_interval_secs(), Some(5));

    h.write_config(&base_config(&h));
    assert_eq!(manager.reload_if_changed().flush, Some(FlushUpdate::ZeroIgnored));
    assert_eq!(manager.flush_interval_secs(), Some(5));
}

#[test]
fn auto_reload_picks_up_changes_in_background() {
    let h = Harness::new();
    h.write_config(&config_with(&h, &[("AUTO_RELOAD_SEC", "1")]));
    let manager = h.init();
    assert!(manager.is_auto_reload_running());
    assert_eq!(manager.auto_reload_interval(), Some(Duration::from_secs(1)));

    h.write_config(&config_with(&h, &[("CONSOLE_LEVEL", "critical")]));
    let deadline = Instant::now() + Duration::from_secs(10);
    while manager.snapshot().console.level != Severity::Critical && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(manager.snapshot().console.level, Severity::Critical);
    // Cadence is fixed at init even though the new file says 0.
    assert_eq!(manager.snapshot().auto_reload_secs, 1);

    manager.stop_auto_reload();
    assert!(!manager.is_auto_reload_running());
    manager.stop_auto_reload();

    manager.start_auto_reload(0).unwrap();
    assert_eq!(manager.auto_reload_interval(), Some(Duration::from_secs(60)));
    manager.start_auto_reload(7).unwrap();
    assert_eq!(manager.auto_reload_interval(), Some(Duration::from_secs(7)));
}

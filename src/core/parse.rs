//! Lenient value parsers for INI settings.
//!
//! Every parser takes the raw value (or `None` when the key is absent) and the
//! hard-coded default. Malformed input never fails: it yields the default.

#![allow(missing_docs)]

use crate::logger::level::Severity;
use crate::logger::pattern::TimeMode;

/// `true/1/yes/on` and `false/0/no/off`, case-insensitive.
#[must_use]
pub fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}

#[must_use]
pub fn parse_severity(raw: Option<&str>, default: Severity) -> Severity {
    raw.and_then(|r| r.parse().ok()).unwrap_or(default)
}

/// `utc` selects UTC, anything else local time.
#[must_use]
pub fn parse_time_mode(raw: Option<&str>) -> TimeMode {
    match raw {
        Some(r) if r.trim().eq_ignore_ascii_case("utc") => TimeMode::Utc,
        _ => TimeMode::Local,
    }
}

#[must_use]
pub fn parse_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|r| r.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[must_use]
pub fn parse_usize(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|r| r.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

/// Ports outside `0..=65535` fall back to the default.
#[must_use]
pub fn parse_port(raw: Option<&str>, default: u16) -> u16 {
    raw.and_then(|r| r.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

/// Finite, non-negative floats only.
#[must_use]
pub fn parse_f64(raw: Option<&str>, default: f64) -> f64 {
    raw.and_then(|r| r.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

/// Trimmed text, default when absent. An explicitly empty value stays empty.
#[must_use]
pub fn parse_text(raw: Option<&str>, default: &str) -> String {
    raw.map_or_else(|| default.to_string(), |r| r.trim().to_string())
}

/// Size with optional binary unit: `512`, `10k`, `1.5 MB`, `2g`, `1tb`.
///
/// Whitespace anywhere is ignored, units are case-insensitive and 1024-based,
/// the result is rounded to the nearest byte. An empty value, a missing number
/// or an unknown unit yields the default.
#[must_use]
pub fn parse_size_bytes(raw: Option<&str>, default: u64) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if compact.is_empty() {
        return default;
    }

    let split = compact
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(compact.len());
    let (number, unit) = compact.split_at(split);
    let Ok(value) = number.parse::<f64>() else {
        return default;
    };

    let multiplier: f64 = match unit {
        "" | "b" => 1.0,
        "k" | "kb" => 1024.0,
        "m" | "mb" => 1024.0 * 1024.0,
        "g" | "gb" => 1024.0 * 1024.0 * 1024.0,
        "t" | "tb" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return default,
    };

    let bytes = (value * multiplier).round();
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return default;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bytes = bytes as u64;
    bytes
}

//! Record severity and the atomic cell sinks use to hold their threshold.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Severity of a log record, ordered from most to least verbose.
///
/// `Off` is only meaningful as a threshold: a sink or logger at `Off` accepts
/// nothing, and a record is never emitted at `Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
    Off,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Self; 7] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Critical,
        Self::Off,
    ];

    /// Full lowercase name as printed by the `%l` pattern token.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Off => "off",
        }
    }

    /// One-letter name as printed by the `%L` pattern token.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Trace => 'T',
            Self::Debug => 'D',
            Self::Info => 'I',
            Self::Warn => 'W',
            Self::Error => 'E',
            Self::Critical => 'C',
            Self::Off => 'O',
        }
    }

    /// Whether a record at `record` passes a threshold of `self`.
    #[must_use]
    pub fn admits(self, record: Self) -> bool {
        self != Self::Off && record != Self::Off && record >= self
    }

    const fn to_u8(self) -> u8 {
        self as u8
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Trace,
            1 => Self::Debug,
            2 => Self::Info,
            3 => Self::Warn,
            4 => Self::Error,
            5 => Self::Critical,
            _ => Self::Off,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a severity name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSeverity(pub String);

impl fmt::Display for UnknownSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown severity {:?}", self.0)
    }
}

impl std::error::Error for UnknownSeverity {}

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "err" => Ok(Self::Error),
            "critical" | "crit" => Ok(Self::Critical),
            "off" => Ok(Self::Off),
            _ => Err(UnknownSeverity(raw.to_string())),
        }
    }
}

/// Lock-free severity threshold shared between writers and the reconciler.
#[derive(Debug)]
pub struct AtomicSeverity(AtomicU8);

impl AtomicSeverity {
    #[must_use]
    pub const fn new(level: Severity) -> Self {
        Self(AtomicU8::new(level.to_u8()))
    }

    pub fn load(&self) -> Severity {
        Severity::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, level: Severity) {
        self.0.store(level.to_u8(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_case_insensitively() {
        assert_eq!("WARNING".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!("Warn".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!("err".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("CRIT".parse::<Severity>(), Ok(Severity::Critical));
        assert_eq!(" off ".parse::<Severity>(), Ok(Severity::Off));
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn admits_respects_threshold_and_off() {
        assert!(Severity::Info.admits(Severity::Warn));
        assert!(Severity::Info.admits(Severity::Info));
        assert!(!Severity::Info.admits(Severity::Debug));
        assert!(!Severity::Off.admits(Severity::Critical));
        assert!(!Severity::Trace.admits(Severity::Off));
    }

    #[test]
    fn atomic_round_trips_every_level() {
        let cell = AtomicSeverity::new(Severity::Trace);
        for level in Severity::ALL {
            cell.store(level);
            assert_eq!(cell.load(), level);
        }
    }
}

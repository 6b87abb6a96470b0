//! PAL trait for filesystem capacity probing, with a `statvfs` implementation
//! and a scripted mock.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{LgmError, Result};

/// Filesystem statistics for a path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FsStats {
    pub total_bytes: u64,
    pub free_bytes: u64,
    /// Space usable by unprivileged writers.
    pub available_bytes: u64,
    pub is_readonly: bool,
}

impl FsStats {
    /// `available * 100 / total`; an empty (zero-capacity) filesystem reports 100.
    #[must_use]
    pub fn free_ratio_pct(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            (self.available_bytes as f64 * 100.0) / self.total_bytes as f64
        }
    }

    /// Stats with `available == free` and `total` bytes of capacity.
    #[must_use]
    pub const fn with_available(total_bytes: u64, available_bytes: u64) -> Self {
        Self {
            total_bytes,
            free_bytes: available_bytes,
            available_bytes,
            is_readonly: false,
        }
    }
}

/// OS abstraction used by the disk guard and the CLI.
pub trait Platform: Send + Sync {
    fn fs_stats(&self, path: &Path) -> Result<FsStats>;
}

/// `statvfs(3)` backed implementation.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct UnixPlatform;

#[cfg(unix)]
impl UnixPlatform {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl Platform for UnixPlatform {
    fn fs_stats(&self, path: &Path) -> Result<FsStats> {
        let stat = nix::sys::statvfs::statvfs(path).map_err(|error| LgmError::FsStats {
            path: path.to_path_buf(),
            details: error.to_string(),
        })?;
        #[allow(clippy::useless_conversion)]
        let fragment = u64::from(stat.fragment_size());
        #[allow(clippy::useless_conversion)]
        Ok(FsStats {
            total_bytes: u64::from(stat.blocks()).saturating_mul(fragment),
            free_bytes: u64::from(stat.blocks_free()).saturating_mul(fragment),
            available_bytes: u64::from(stat.blocks_available()).saturating_mul(fragment),
            is_readonly: stat.flags().contains(nix::sys::statvfs::FsFlags::ST_RDONLY),
        })
    }
}

/// Scripted readings for deterministic tests.
///
/// Queued readings are served in order; once the queue is drained the last
/// reading served repeats. With nothing queued and nothing served every probe
/// fails.
#[derive(Debug, Default)]
pub struct MockPlatform {
    script: Mutex<VecDeque<Option<FsStats>>>,
    last: Mutex<Option<FsStats>>,
    queried: Mutex<Vec<PathBuf>>,
}

impl MockPlatform {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue one successful reading.
    pub fn push(&self, stats: FsStats) {
        self.script.lock().push_back(Some(stats));
    }

    /// Queue one failing probe.
    pub fn push_failure(&self) {
        self.script.lock().push_back(None);
    }

    /// Queue readings with 1000 bytes capacity and the given free ratios.
    pub fn push_ratios(&self, ratios_pct: &[f64]) {
        for pct in ratios_pct {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let available = (pct * 10.0).round() as u64;
            self.push(FsStats::with_available(1000, available));
        }
    }

    /// Paths probed so far, oldest first.
    #[must_use]
    pub fn queried(&self) -> Vec<PathBuf> {
        self.queried.lock().clone()
    }
}

impl Platform for MockPlatform {
    fn fs_stats(&self, path: &Path) -> Result<FsStats> {
        self.queried.lock().push(path.to_path_buf());
        let next = self.script.lock().pop_front();
        let reading = match next {
            Some(Some(stats)) => {
                *self.last.lock() = Some(stats);
                Some(stats)
            }
            Some(None) => None,
            None => *self.last.lock(),
        };
        reading.ok_or_else(|| LgmError::FsStats {
            path: path.to_path_buf(),
            details: "mock stats not available".to_string(),
        })
    }
}

/// Detect active platform implementation.
pub fn detect_platform() -> Result<Arc<dyn Platform>> {
    #[cfg(unix)]
    {
        Ok(Arc::new(UnixPlatform::new()))
    }
    #[cfg(not(unix))]
    {
        Err(LgmError::Runtime {
            details: "filesystem probing is only implemented for unix targets".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_available_over_total() {
        let stats = FsStats::with_available(200, 50);
        assert!((stats.free_ratio_pct() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn zero_capacity_reports_fully_free() {
        let stats = FsStats::with_available(0, 0);
        assert!((stats.free_ratio_pct() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mock_serves_script_then_repeats_last() {
        let mock = MockPlatform::new();
        mock.push_ratios(&[10.0, 3.0]);
        mock.push_failure();
        let root = Path::new("/data");

        assert!((mock.fs_stats(root).unwrap().free_ratio_pct() - 10.0).abs() < 1e-9);
        assert!((mock.fs_stats(root).unwrap().free_ratio_pct() - 3.0).abs() < 1e-9);
        assert!(mock.fs_stats(root).is_err());
        assert!((mock.fs_stats(root).unwrap().free_ratio_pct() - 3.0).abs() < 1e-9);
        assert_eq!(mock.queried().len(), 4);
    }

    #[test]
    fn mock_without_readings_fails() {
        let mock = MockPlatform::new();
        let err = mock.fs_stats(Path::new("/")).unwrap_err();
        assert_eq!(err.code(), "LGM-2001");
    }

    #[cfg(unix)]
    #[test]
    fn statvfs_reports_capacity_for_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let stats = UnixPlatform::new().fs_stats(dir.path()).unwrap();
        assert!(stats.total_bytes > 0);
        assert!(stats.available_bytes <= stats.total_bytes);
    }

    #[cfg(unix)]
    #[test]
    fn statvfs_fails_for_missing_path() {
        let err = UnixPlatform::new()
            .fs_stats(Path::new("/nonexistent/lgm/probe"))
            .unwrap_err();
        assert!(matches!(err, LgmError::FsStats { .. }));
    }
}

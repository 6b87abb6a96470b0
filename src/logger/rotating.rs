//! Size-rotated file sink.
//!
//! Lines are assembled in memory and written with a single `write_all` so a
//! tailing reader never sees a partial line. When the next line would push the
//! file past `max_size_bytes`, existing backups shift (`.1`→`.2`, …), the
//! oldest beyond `max_files` is removed and the live file becomes `.1`.
//! `max_files == 0` keeps no backups: the live file is truncated instead.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::core::errors::{LgmError, Result};
use crate::logger::level::Severity;
use crate::logger::pattern::TimeMode;
use crate::logger::sink::{Record, Sink, SinkSettings};

struct FileState {
    writer: Option<BufWriter<File>>,
    bytes_written: u64,
}

/// Rotating file destination.
pub struct RotatingFileSink {
    settings: SinkSettings,
    path: PathBuf,
    max_size_bytes: u64,
    max_files: usize,
    state: Mutex<FileState>,
}

impl RotatingFileSink {
    /// Open (creating parent directories) the live file in append mode.
    pub fn open(path: &Path, max_size_bytes: u64, max_files: usize) -> Result<Self> {
        let (file, size) = open_append(path)?;
        Ok(Self {
            settings: SinkSettings::default(),
            path: path.to_path_buf(),
            max_size_bytes,
            max_files,
            state: Mutex::new(FileState {
                writer: Some(BufWriter::with_capacity(64 * 1024, file)),
                bytes_written: size,
            }),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    #[must_use]
    pub const fn max_files(&self) -> usize {
        self.max_files
    }

    fn rotate(&self, state: &mut FileState) {
        if let Some(w) = state.writer.as_mut() {
            let _ = w.flush();
        }
        state.writer = None;

        if self.max_files == 0 {
            let _ = fs::remove_file(&self.path);
        } else {
            let oldest = rotated_name(&self.path, self.max_files);
            let _ = fs::remove_file(&oldest);
            for i in (1..self.max_files).rev() {
                let _ = rename(rotated_name(&self.path, i), rotated_name(&self.path, i + 1));
            }
            let _ = rename(&self.path, rotated_name(&self.path, 1));
        }

        match open_append(&self.path) {
            Ok((file, size)) => {
                state.writer = Some(BufWriter::with_capacity(64 * 1024, file));
                state.bytes_written = size;
            }
            Err(e) => {
                eprintln!("[LGM-FILE] reopen after rotation failed: {e}");
            }
        }
    }
}

impl Sink for RotatingFileSink {
    fn set_min_severity(&self, level: Severity) {
        self.settings.set_level(level);
    }

    fn min_severity(&self) -> Severity {
        self.settings.level()
    }

    fn set_pattern(&self, pattern: &str, time_mode: TimeMode) {
        self.settings.set_pattern(pattern, time_mode);
    }

    fn pattern(&self) -> String {
        self.settings.pattern()
    }

    fn write(&self, record: &Record) {
        let line = self.settings.format(record).text;
        let len = line.len() as u64;
        let mut state = self.state.lock();

        if state.bytes_written > 0 && state.bytes_written + len > self.max_size_bytes {
            self.rotate(&mut state);
        }
        if state.writer.is_none() {
            // A failed reopen is retried on every write.
            if let Ok((file, size)) = open_append(&self.path) {
                state.writer = Some(BufWriter::with_capacity(64 * 1024, file));
                state.bytes_written = size;
            }
        }
        let Some(w) = state.writer.as_mut() else {
            return;
        };
        if w.write_all(line.as_bytes()).is_ok() {
            state.bytes_written += len;
        }
    }

    fn flush(&self) {
        if let Some(w) = self.state.lock().writer.as_mut() {
            let _ = w.flush();
        }
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(w) = self.state.get_mut().writer.as_mut() {
            let _ = w.flush();
        }
    }
}

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| LgmError::SinkCreate {
            path: parent.to_path_buf(),
            details: format!("cannot create log directory: {source}"),
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LgmError::SinkCreate {
            path: path.to_path_buf(),
            details: source.to_string(),
        })?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// Build a rotated filename: `all.log` → `all.log.3`.
#[must_use]
pub fn rotated_name(base: &Path, index: usize) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(message: &str) -> Record {
        Record::now(Severity::Info, "unit".into(), message.to_string())
    }

    #[test]
    fn creates_parent_directories_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logs").join("all.log");
        let sink = RotatingFileSink::open(&path, 1024 * 1024, 3).unwrap();
        sink.set_pattern("%v", TimeMode::Utc);
        sink.write(&record("one"));
        sink.write(&record("two"));
        sink.flush();

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
        assert_eq!(sink.path(), path.as_path());
    }

    #[test]
    fn rotation_shifts_files_and_caps_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.log");
        let sink = RotatingFileSink::open(&path, 16, 2).unwrap();
        sink.set_pattern("%v", TimeMode::Utc);

        for i in 0..10 {
            sink.write(&record(&format!("line-{i:04}")));
        }
        sink.flush();

        assert!(path.exists());
        assert!(rotated_name(&path, 1).exists());
        assert!(rotated_name(&path, 2).exists());
        assert!(!rotated_name(&path, 3).exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "line-0009\n");
        assert_eq!(
            fs::read_to_string(rotated_name(&path, 1)).unwrap(),
            "line-0008\n"
        );
    }

    #[test]
    fn zero_backups_truncates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solo.log");
        let sink = RotatingFileSink::open(&path, 12, 0).unwrap();
        sink.set_pattern("%v", TimeMode::Utc);
        sink.write(&record("first-line"));
        sink.write(&record("second-line"));
        sink.flush();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second-line\n");
        assert!(!rotated_name(&path, 1).exists());
    }

    #[test]
    fn open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let err = RotatingFileSink::open(&blocker.join("all.log"), 1024, 1)
            .err()
            .expect("open should fail");
        assert_eq!(err.code(), "LGM-2002");
    }
}

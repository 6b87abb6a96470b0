//! LGM-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, LgmError>;

/// Top-level error type for the log guard manager.
#[derive(Debug, Error)]
pub enum LgmError {
    #[error("[LGM-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[LGM-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[LGM-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[LGM-2001] filesystem stats failure for {path}: {details}")]
    FsStats { path: PathBuf, details: String },

    #[error("[LGM-2002] sink creation failure for {path}: {details}")]
    SinkCreate { path: PathBuf, details: String },

    #[error("[LGM-2101] alert transport failure to {target}: {details}")]
    Transport { target: String, details: String },

    #[error("[LGM-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[LGM-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl LgmError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "LGM-1001",
            Self::MissingConfig { .. } => "LGM-1002",
            Self::ConfigParse { .. } => "LGM-1003",
            Self::FsStats { .. } => "LGM-2001",
            Self::SinkCreate { .. } => "LGM-2002",
            Self::Transport { .. } => "LGM-2101",
            Self::Io { .. } => "LGM-3002",
            Self::Runtime { .. } => "LGM-3900",
        }
    }

    /// Whether the next scheduler tick might succeed where this attempt failed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::FsStats { .. }
                | Self::SinkCreate { .. }
                | Self::Transport { .. }
                | Self::MissingConfig { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<ini::Error> for LgmError {
    fn from(value: ini::Error) -> Self {
        match value {
            ini::Error::Io(source) => Self::Io {
                path: PathBuf::new(),
                source,
            },
            ini::Error::Parse(err) => Self::ConfigParse {
                context: "ini",
                details: err.to_string(),
            },
        }
    }
}

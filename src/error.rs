use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// DosError – failures raised by the data layer
// ---------------------------------------------------------------------------

/// Errors produced while reading inputs, assembling or checking a dataset.
///
/// None of these are retried: the caller reports the offending path or value
/// and aborts the current operation.
#[derive(Debug, Error)]
pub enum DosError {
    #[error("descriptor \"{}\" not found", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("descriptor {}: {message}", path.display())]
    Descriptor { path: PathBuf, message: String },

    #[error("resolution {requested} is not supported (maximum {max}, must divide it evenly)")]
    UnsupportedResolution { requested: usize, max: usize },

    #[error("unknown constraint '{0}' (expected one of: n, m, gap)")]
    UnknownConstraint(String),

    #[error("unknown weighting mask '{0}' (expected any of: n, f, l, r)")]
    UnknownMask(char),

    #[error("no ground states selected from pattern '{0}'")]
    NoGroundStates(String),

    #[error("no gap transition found in {} (k-point {label})", path.display())]
    NoGapFound { path: PathBuf, label: String },

    #[error("{}: missing parameter '{name}'", path.display())]
    MissingParameter { path: PathBuf, name: &'static str },

    #[error("{}, line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{}: {message}", path.display())]
    Shape { path: PathBuf, message: String },

    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("broadening kernel failed: {0}")]
    Kernel(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

impl DosError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DosError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        DosError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DosError>;

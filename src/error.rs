//! Error taxonomy for the sampler.
//!
//! Three layers of failure are kept apart:
//! - `ConfigError`: raised while building a `Stats` engine, never during a cycle
//! - `SampleError`: per-pid read failures, the pid is skipped for the cycle
//! - `CycleError`: enumeration failed, the whole cycle is reported as failed

use std::io;
use std::path::PathBuf;

/// Invalid configuration detected at initialization.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid pattern '{pattern}' in {list}: {source}")]
    InvalidPattern {
        list: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Failure while reading data for a single pid.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("process {0} not found")]
    NotFound(i32),

    #[error("permission denied reading process {0}")]
    PermissionDenied(i32),

    #[error("failed to parse {what} for process {pid}")]
    Parse { pid: i32, what: &'static str },

    #[error("I/O error reading process {pid}: {source}")]
    Io {
        pid: i32,
        #[source]
        source: io::Error,
    },

    #[error("operation not supported on this platform")]
    Unsupported,
}

impl SampleError {
    /// Maps an I/O error by kind so that vanished processes are recognizable.
    pub fn from_io(pid: i32, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => SampleError::NotFound(pid),
            io::ErrorKind::PermissionDenied => SampleError::PermissionDenied(pid),
            _ => SampleError::Io { pid, source: err },
        }
    }

    /// True when the error means the process no longer exists.
    pub fn is_gone(&self) -> bool {
        matches!(self, SampleError::NotFound(_))
    }
}

/// Systemic failure that aborts a whole cycle.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("failed to enumerate processes under {path}: {source}")]
    Enumeration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("process enumeration is not supported on this platform")]
    Unsupported,
}

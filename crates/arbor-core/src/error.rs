//! Error types shared across the workspace

use std::path::PathBuf;

use thiserror::Error;

/// Failure modes of project operations. Everything recoverable stays local
/// (logged, operation continues); the variants here are what callers can
/// actually observe as a failed completion.
#[derive(Debug, Clone, Error)]
pub enum ProjectError {
    #[error("invalid source pattern `{pattern}`: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("failed to load analysis engine from {directory}: {reason}")]
    EngineLoad { directory: PathBuf, reason: String },

    #[error("edit range {start}..{end} is out of bounds for {path} (length {len})")]
    EditOutOfRange {
        path: PathBuf,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("{path} is not part of the project")]
    UnknownFile { path: PathBuf },

    #[error("project has been disposed")]
    Disposed,

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ProjectError {
    fn from(err: std::io::Error) -> Self {
        ProjectError::Io(err.to_string())
    }
}

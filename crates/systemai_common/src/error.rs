//! Error types for SystemAI.

use std::path::PathBuf;
use thiserror::Error;

/// The planning backend could not produce a usable plan.
/// Local to the request; the operator goes back to the prompt.
#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("planner request failed: {0}")]
    Http(String),

    #[error("planner request timed out after {0} seconds")]
    Timeout(u64),

    #[error("planner returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse planner response: {0}")]
    Envelope(String),

    #[error("invalid JSON plan from planner: {0}")]
    InvalidPlan(#[from] serde_json::Error),

    #[error("planner returned an empty response")]
    EmptyResponse,
}

/// A plan broke the safety policy. Carries the first offending action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("action {index}: {reason}")]
pub struct ValidationError {
    pub index: usize,
    pub reason: String,
}

impl ValidationError {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

/// Failure of a single command or file operation.
/// The executor turns these into per-action outcomes.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("exited with status {0}")]
    ExitStatus(i32),

    #[error("terminated by signal")]
    Signaled,

    #[error("command not found: {0}")]
    NotFound(String),

    #[error("empty command")]
    EmptyCommand,

    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Classify an I/O error, keeping permission denials distinct
    pub fn from_io(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            ExecError::PermissionDenied
        } else {
            ExecError::Io(err)
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ExecError::PermissionDenied)
    }
}

/// Configuration could not be loaded or saved. Fatal at startup only.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot determine configuration directory")]
    NoConfigDir,

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

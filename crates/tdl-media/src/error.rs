//! Error types for encoder operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for encoder operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving external media processes.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Executable not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("Failed to start {}: {source}", .program.display())]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exited with {}", .program.display(), describe_exit(.exit_code))]
    ProcessFailed {
        program: PathBuf,
        exit_code: Option<i32>,
        stderr: Option<String>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => code.to_string(),
        None => "a signal".to_string(),
    }
}

impl MediaError {
    /// Create a process failure error.
    pub fn process_failed(
        program: impl Into<PathBuf>,
        exit_code: Option<i32>,
        stderr: Option<String>,
    ) -> Self {
        Self::ProcessFailed {
            program: program.into(),
            exit_code,
            stderr,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MediaError::Cancelled)
    }

    /// Exit code of a failed process, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            MediaError::ProcessFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Captured stderr tail of a failed process, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            MediaError::ProcessFailed { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}

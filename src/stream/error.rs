//! Error types for converter streams.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

/// Error raised when the converter process cannot be started.
#[derive(thiserror::Error, Debug)]
pub enum LaunchError {
    /// The converter binary was not found.
    #[error("Converter binary not found: {}", program.display())]
    NotFound { program: PathBuf },
    /// The converter binary exists but may not be executed.
    #[error("Permission denied executing converter: {}", program.display())]
    PermissionDenied { program: PathBuf },
    /// Any other spawn failure reported by the OS.
    #[error("Failed to spawn converter {}: {source}", program.display())]
    Io {
        program: PathBuf,
        source: std::io::Error,
    },
}

impl LaunchError {
    /// Create a `LaunchError` from an I/O error, classifying common cases.
    pub(crate) fn from_io(program: PathBuf, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { program },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { program },
            _ => Self::Io {
                program,
                source: err,
            },
        }
    }

    /// The program that failed to launch.
    #[must_use]
    pub fn program(&self) -> &PathBuf {
        match self {
            Self::NotFound { program }
            | Self::PermissionDenied { program }
            | Self::Io { program, .. } => program,
        }
    }
}

/// The converter started but exited with a nonzero code.
///
/// Only [`classify`](super::classify) builds this value, so both stream
/// flavors report failures identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    exit_code: i32,
    stderr: Vec<u8>,
}

impl ExecutionFailure {
    pub(crate) fn new(exit_code: i32, stderr: Vec<u8>) -> Self {
        Self { exit_code, stderr }
    }

    /// Exit code reported by the converter (`-N` when killed by signal `N`).
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Bytes captured from stderr, exactly as written. May be empty.
    #[must_use]
    pub fn stderr_bytes(&self) -> &[u8] {
        &self.stderr
    }

    /// Captured stderr as text; invalid UTF-8 is replaced.
    #[must_use]
    pub fn stderr(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// The diagnostic, or a synthesized message when stderr was empty.
    #[must_use]
    pub fn message(&self) -> String {
        if self.stderr.is_empty() {
            format!("Process exited with code {}", self.exit_code)
        } else {
            self.stderr().into_owned()
        }
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error in calling binary subprocess: {}", self.message())
    }
}

impl std::error::Error for ExecutionFailure {}

/// Errors surfaced while consuming a converter stream.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The converter could not be started.
    #[error(transparent)]
    Launch(#[from] LaunchError),
    /// The converter exited with a nonzero code.
    #[error(transparent)]
    Execution(#[from] ExecutionFailure),
    /// Reading converter output or waiting on the process failed.
    #[error("I/O error reading converter output: {0}")]
    Io(#[from] std::io::Error),
}

//! Exit status classification shared by both stream flavors.

use std::process::ExitStatus;

use super::ExecutionFailure;

/// Decide whether a terminated converter represents a failure.
///
/// Exit code zero is a normal end of stream. Any other code is a failure
/// carrying the captured stderr verbatim; when stderr is empty the failure
/// message is synthesized from the exit code.
#[must_use]
pub fn classify(exit_code: i32, stderr: &[u8]) -> Option<ExecutionFailure> {
    if exit_code == 0 {
        return None;
    }
    tracing::debug!(exit_code, stderr_len = stderr.len(), "Converter failed");
    Some(ExecutionFailure::new(exit_code, stderr.to_vec()))
}

/// Integer exit code for a finished process.
///
/// On Unix a process killed by signal `N` has no exit code and is reported
/// as `-N`.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal().map_or(-1, |signal| -signal)
    }

    #[cfg(not(unix))]
    {
        -1
    }
}

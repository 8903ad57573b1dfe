//! Converter process ownership and termination.
//!
//! A [`ProcessHandle`] bundles the spawned child with its stdout and stderr
//! readers. A [`LifecycleController`] owns exactly one handle and releases
//! it at most once: pipes closed, process signalled if still alive, and
//! reaped within a bounded grace period.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{Duration, Instant};

/// Interval between exit checks while reaping a blocking child.
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Process control needed by [`LifecycleController`].
///
/// Implemented for both `std::process::Child` and `tokio::process::Child`
/// so the two stream flavors share one termination path.
pub trait ChildProcess {
    /// OS process id, if the process has not been reaped.
    fn id(&self) -> Option<u32>;

    /// Check for exit without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the process state cannot be queried.
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;

    /// Forcefully kill the process without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    fn start_kill(&mut self) -> io::Result<()>;

    /// Collect the exit status of a signalled process, waiting at most
    /// `grace` before escalating.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting or killing fails.
    fn reap(&mut self, grace: Duration) -> io::Result<()>;
}

impl ChildProcess for std::process::Child {
    fn id(&self) -> Option<u32> {
        Some(std::process::Child::id(self))
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        std::process::Child::try_wait(self)
    }

    fn start_kill(&mut self) -> io::Result<()> {
        std::process::Child::kill(self)
    }

    fn reap(&mut self, grace: Duration) -> io::Result<()> {
        let deadline = Instant::now() + grace;
        loop {
            if std::process::Child::try_wait(self)?.is_some() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(REAP_POLL_INTERVAL);
        }

        tracing::debug!(
            pid = std::process::Child::id(self),
            grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
            "Converter still running after grace period, killing"
        );
        std::process::Child::kill(self)?;
        std::process::Child::wait(self).map(|_| ())
    }
}

impl ChildProcess for tokio::process::Child {
    fn id(&self) -> Option<u32> {
        tokio::process::Child::id(self)
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        tokio::process::Child::try_wait(self)
    }

    fn start_kill(&mut self) -> io::Result<()> {
        tokio::process::Child::start_kill(self)
    }

    fn reap(&mut self, _grace: Duration) -> io::Result<()> {
        // Never blocks: children are spawned with `kill_on_drop`, and the
        // runtime reaps them in the background once the handle is dropped.
        tokio::process::Child::try_wait(self).map(|_| ())
    }
}

/// Send a single termination request to a running process.
///
/// On Unix this is SIGTERM; elsewhere it is the platform kill. A process
/// that is already gone is not an error.
fn send_terminate<C: ChildProcess>(child: &mut C) -> io::Result<()> {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = child.id() else {
            return Ok(());
        };
        let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
        match kill(nix_pid, Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from_raw_os_error(errno as i32)),
        }
    }

    #[cfg(not(unix))]
    {
        match child.start_kill() {
            Err(e) if e.kind() != io::ErrorKind::InvalidInput => Err(e),
            _ => Ok(()),
        }
    }
}

/// A spawned converter with its output pipes.
///
/// `O` is the stdout line reader and `E` the stderr capture. Each pipe has
/// exactly one reader: the stream that owns the handle.
#[derive(Debug)]
pub struct ProcessHandle<C, O, E> {
    program: PathBuf,
    args: Vec<OsString>,
    pid: Option<u32>,
    child: C,
    stdout: Option<O>,
    stderr: Option<E>,
    status: Option<ExitStatus>,
}

impl<C: ChildProcess, O, E> ProcessHandle<C, O, E> {
    pub(crate) fn new(
        program: PathBuf,
        args: Vec<OsString>,
        child: C,
        stdout: Option<O>,
        stderr: Option<E>,
    ) -> Self {
        let pid = child.id();
        Self {
            program,
            args,
            pid,
            child,
            stdout,
            stderr,
            status: None,
        }
    }

    /// Path of the executable that was launched.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments the converter was launched with.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Process id assigned at spawn time.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Exit status, once it has been observed.
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// Check for exit without blocking, caching the status once present.
    ///
    /// # Errors
    ///
    /// Returns an error if the process state cannot be queried.
    pub fn poll_exit(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = self.child.try_wait()?;
        }
        Ok(self.status)
    }

    pub(crate) fn record_exit(&mut self, status: ExitStatus) {
        self.status = Some(status);
    }

    pub(crate) fn child_mut(&mut self) -> &mut C {
        &mut self.child
    }

    pub(crate) fn stdout_mut(&mut self) -> Option<&mut O> {
        self.stdout.as_mut()
    }

    pub(crate) fn stderr_mut(&mut self) -> Option<&mut E> {
        self.stderr.as_mut()
    }

    fn close_pipes(&mut self) {
        self.stdout = None;
        self.stderr = None;
    }
}

/// Owner of one converter process; releases it exactly once.
///
/// [`terminate`](Self::terminate) may be called any number of times and
/// also runs on drop, so an abandoned stream never leaks the process or
/// its descriptors.
#[derive(Debug)]
pub struct LifecycleController<C: ChildProcess, O, E> {
    handle: Option<ProcessHandle<C, O, E>>,
    grace: Duration,
}

impl<C: ChildProcess, O, E> LifecycleController<C, O, E> {
    /// Take ownership of a freshly launched process.
    #[must_use]
    pub fn new(handle: ProcessHandle<C, O, E>, grace: Duration) -> Self {
        Self {
            handle: Some(handle),
            grace,
        }
    }

    /// The live handle, or `None` once released.
    pub fn handle_mut(&mut self) -> Option<&mut ProcessHandle<C, O, E>> {
        self.handle.as_mut()
    }

    /// Process id of the live handle.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().and_then(ProcessHandle::pid)
    }

    /// Whether the process has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    /// Close both pipes and stop the process if it is still alive.
    ///
    /// Idempotent and infallible: "already exited" is not an error, and
    /// any other failure is logged. Never waits longer than the grace
    /// period.
    pub fn terminate(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        handle.close_pipes();

        match handle.poll_exit() {
            Ok(Some(status)) => {
                tracing::debug!(pid = ?handle.pid, %status, "Released finished converter");
            }
            Ok(None) => {
                tracing::debug!(pid = ?handle.pid, "Terminating running converter");
                if let Err(e) = send_terminate(&mut handle.child) {
                    tracing::warn!(pid = ?handle.pid, error = %e, "Failed to signal converter");
                }
                if let Err(e) = handle.child.reap(self.grace) {
                    tracing::warn!(pid = ?handle.pid, error = %e, "Failed to reap converter");
                }
            }
            Err(e) => {
                tracing::warn!(pid = ?handle.pid, error = %e, "Failed to query converter state");
            }
        }
    }
}

impl<C: ChildProcess, O, E> Drop for LifecycleController<C, O, E> {
    fn drop(&mut self) {
        self.terminate();
    }
}

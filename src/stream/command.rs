//! Converter invocation and process launching.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use crate::config::LineageConfig;

use super::{AsyncStderrCapture, LaunchError, LifecycleController, ProcessHandle, StderrCapture};

/// Environment variable overriding the converter binary location.
pub const CONVERTER_BIN_ENV: &str = "JSON_LINEAGE_BIN";

/// Flag passed to the converter for non-well-formed, concatenated JSON.
pub const MESSY_FLAG: &str = "--messy";

/// Default time a blocking stream waits for a signalled converter to exit.
pub const DEFAULT_TERMINATE_GRACE: Duration = Duration::from_millis(100);

/// Blocking converter process: std child, buffered stdout, threaded stderr drain.
pub type BlockingProcess = LifecycleController<
    std::process::Child,
    std::io::BufReader<std::process::ChildStdout>,
    StderrCapture,
>;

/// Cooperative converter process: tokio child, line-framed stdout, stderr drain task.
pub type AsyncProcess = LifecycleController<
    tokio::process::Child,
    tokio::io::Lines<tokio::io::BufReader<tokio::process::ChildStdout>>,
    AsyncStderrCapture,
>;

/// File name of the converter executable on the given OS.
#[must_use]
pub fn converter_file_name(os: &str) -> &'static str {
    if os == "windows" {
        "jsonl_converter.exe"
    } else {
        "jsonl_converter"
    }
}

/// Conventional converter location.
///
/// `JSON_LINEAGE_BIN` wins when set; otherwise the converter is expected
/// next to the running executable. Falls back to a bare file name (resolved
/// through `PATH`) if the executable location is unknown.
#[must_use]
pub fn default_converter_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONVERTER_BIN_ENV) {
        return PathBuf::from(path);
    }

    let name = converter_file_name(std::env::consts::OS);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(name)))
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Builder describing one converter run over one input file.
///
/// Building a command never spawns anything; processes are started by
/// [`launch_blocking`](Self::launch_blocking) and
/// [`launch_async`](Self::launch_async), which the streams call on their
/// first pull.
#[derive(Debug, Clone)]
pub struct ConverterCommand {
    input: PathBuf,
    converter: Option<PathBuf>,
    messy: bool,
    terminate_grace: Duration,
}

impl ConverterCommand {
    /// Create a command converting the given JSON file.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            converter: None,
            messy: false,
            terminate_grace: DEFAULT_TERMINATE_GRACE,
        }
    }

    /// Create a command with defaults taken from configuration.
    #[must_use]
    pub fn from_config(input: impl Into<PathBuf>, config: &LineageConfig) -> Self {
        let mut command = Self::new(input)
            .messy(config.messy)
            .terminate_grace(config.terminate_grace());
        command.converter.clone_from(&config.converter_path);
        command
    }

    /// Use a specific converter binary instead of the conventional one.
    #[must_use]
    pub fn converter(mut self, path: impl Into<PathBuf>) -> Self {
        self.converter = Some(path.into());
        self
    }

    /// Ask the converter to accept non-well-formed JSON.
    #[must_use]
    pub fn messy(mut self, messy: bool) -> Self {
        self.messy = messy;
        self
    }

    /// How long a blocking stream waits for a signalled converter.
    #[must_use]
    pub fn terminate_grace(mut self, grace: Duration) -> Self {
        self.terminate_grace = grace;
        self
    }

    /// The input file path.
    #[must_use]
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Whether messy mode is enabled.
    #[must_use]
    pub fn is_messy(&self) -> bool {
        self.messy
    }

    /// The configured termination grace period.
    #[must_use]
    pub fn grace(&self) -> Duration {
        self.terminate_grace
    }

    /// The converter executable that will be launched.
    #[must_use]
    pub fn program(&self) -> PathBuf {
        self.converter
            .clone()
            .unwrap_or_else(default_converter_path)
    }

    /// Build the converter arguments: `<input> [--messy]`.
    #[must_use]
    pub fn build_args(&self) -> Vec<OsString> {
        let mut args = vec![self.input.clone().into_os_string()];
        if self.messy {
            args.push(OsString::from(MESSY_FLAG));
        }
        args
    }

    /// Spawn the converter for blocking consumption.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError` if the OS cannot start the process.
    pub fn launch_blocking(&self) -> Result<BlockingProcess, LaunchError> {
        let program = self.program();
        let args = self.build_args();

        let mut child = std::process::Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LaunchError::from_io(program.clone(), e))?;

        let stdout = child.stdout.take().map(std::io::BufReader::new);
        let stderr = match child.stderr.take().map(StderrCapture::spawn).transpose() {
            Ok(stderr) => stderr,
            Err(e) => {
                if let Err(kill_err) = child.kill().and_then(|()| child.wait().map(|_| ())) {
                    tracing::warn!(error = %kill_err, "Failed to stop converter after launch error");
                }
                return Err(LaunchError::from_io(program, e));
            }
        };

        tracing::debug!(
            program = %program.display(),
            ?args,
            pid = child.id(),
            "Launched converter (blocking)"
        );

        let handle = ProcessHandle::new(program, args, child, stdout, stderr);
        Ok(LifecycleController::new(handle, self.terminate_grace))
    }

    /// Spawn the converter for cooperative consumption.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError` if the OS cannot start the process.
    pub fn launch_async(&self) -> Result<AsyncProcess, LaunchError> {
        use tokio::io::AsyncBufReadExt;

        let program = self.program();
        let args = self.build_args();

        let mut child = tokio::process::Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LaunchError::from_io(program.clone(), e))?;

        let stdout = child
            .stdout
            .take()
            .map(|stdout| tokio::io::BufReader::new(stdout).lines());
        let stderr = child.stderr.take().map(AsyncStderrCapture::spawn);

        tracing::debug!(
            program = %program.display(),
            ?args,
            pid = ?child.id(),
            "Launched converter (async)"
        );

        let handle = ProcessHandle::new(program, args, child, stdout, stderr);
        Ok(LifecycleController::new(handle, self.terminate_grace))
    }
}

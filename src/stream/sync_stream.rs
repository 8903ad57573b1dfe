//! Blocking, pull-based line stream.

use std::io::BufRead;
use std::iter::FusedIterator;

use super::{
    classify, exit_code, BlockingProcess, ConverterCommand, Error, LineRecord, LineSource,
    StreamState,
};

/// Read the next non-blank line, or `None` at end of stream.
fn read_record<R: BufRead>(reader: &mut R, buf: &mut String) -> std::io::Result<Option<LineRecord>> {
    loop {
        buf.clear();
        if reader.read_line(buf)? == 0 {
            return Ok(None);
        }
        if !buf.trim().is_empty() {
            return Ok(Some(LineRecord::new(buf)));
        }
    }
}

/// Blocking iterator over converter output.
///
/// The converter is spawned on the first call to [`next`](Iterator::next),
/// never at construction. Each call blocks the current thread until a full
/// line or end of stream arrives. At end of stream the iterator waits for
/// the converter to exit and then yields either `None` (exit code zero) or
/// one [`Error::Execution`] carrying the converter's stderr.
///
/// ```no_run
/// use json_lineage::{ConverterCommand, SyncLineStream};
///
/// let stream = SyncLineStream::new(ConverterCommand::new("data.json"));
/// for line in stream {
///     println!("{}", line?);
/// }
/// # Ok::<(), json_lineage::Error>(())
/// ```
#[derive(Debug)]
pub struct SyncLineStream {
    command: ConverterCommand,
    state: StreamState,
    process: Option<BlockingProcess>,
    buf: String,
}

impl SyncLineStream {
    /// Create a stream that will run `command` on first pull.
    #[must_use]
    pub fn new(command: ConverterCommand) -> Self {
        Self {
            command,
            state: StreamState::NotStarted,
            process: None,
            buf: String::new(),
        }
    }

    fn read_next(&mut self) -> Result<Option<LineRecord>, Error> {
        let Some(handle) = self.process.as_mut().and_then(BlockingProcess::handle_mut) else {
            return Ok(None);
        };

        if let Some(status) = handle.poll_exit()? {
            tracing::trace!(pid = ?handle.pid(), %status, "Converter exited, draining stdout");
        }

        let record = match handle.stdout_mut() {
            Some(stdout) => read_record(stdout, &mut self.buf)?,
            None => None,
        };
        if let Some(record) = record {
            tracing::trace!(pid = ?handle.pid(), len = record.len(), "Read line");
            return Ok(Some(record));
        }

        // End of stdout: wait for the exit, then look at stderr only if the
        // converter failed.
        let status = match handle.exit_status() {
            Some(status) => status,
            None => handle.child_mut().wait()?,
        };
        handle.record_exit(status);
        let code = exit_code(status);

        let stderr = match handle.stderr_mut() {
            Some(capture) if code != 0 => capture.finish()?,
            _ => Vec::new(),
        };

        match classify(code, &stderr) {
            Some(failure) => Err(failure.into()),
            None => {
                tracing::debug!(pid = ?handle.pid(), "Converter finished");
                Ok(None)
            }
        }
    }

    fn release(&mut self) {
        if let Some(process) = self.process.as_mut() {
            process.terminate();
        }
    }
}

impl LineSource for SyncLineStream {
    fn command(&self) -> &ConverterCommand {
        &self.command
    }

    fn state(&self) -> StreamState {
        self.state
    }

    fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(BlockingProcess::pid)
    }

    fn terminate(&mut self) {
        self.release();
        if !self.state.is_terminal() {
            self.state = StreamState::Abandoned;
        }
    }
}

impl Iterator for SyncLineStream {
    type Item = Result<LineRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            StreamState::NotStarted => match self.command.launch_blocking() {
                Ok(process) => {
                    self.process = Some(process);
                    self.state = StreamState::Running;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Converter launch failed");
                    self.state = StreamState::Failed;
                    return Some(Err(e.into()));
                }
            },
            StreamState::Running => {}
            StreamState::Exhausted | StreamState::Failed | StreamState::Abandoned => return None,
        }

        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.state = StreamState::Exhausted;
                self.release();
                None
            }
            Err(e) => {
                self.state = StreamState::Failed;
                self.release();
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for SyncLineStream {}

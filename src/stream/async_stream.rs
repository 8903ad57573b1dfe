//! Cooperative line stream for the tokio runtime.

use futures_core::Stream;

use super::{
    classify, exit_code, AsyncProcess, ConverterCommand, Error, LineRecord, LineSource,
    StreamState,
};

/// Async iterator over converter output.
///
/// Same contract as [`SyncLineStream`](super::SyncLineStream), but waiting
/// for the next line suspends the calling task instead of blocking the
/// worker thread. `next_line` takes `&mut self`, so only one read can be
/// outstanding per stream.
///
/// The converter is spawned synchronously at the start of the first
/// `next_line` call, before anything is awaited. Dropping a stream that
/// was never polled therefore never spawns a process; dropping a running
/// stream terminates its converter.
///
/// Dropping a pending `next_line` future is safe: no buffered output or
/// captured stderr is lost and the next call resumes where the previous
/// one stopped.
///
/// ```no_run
/// use json_lineage::{AsyncLineStream, ConverterCommand};
///
/// # async fn run() -> Result<(), json_lineage::Error> {
/// let mut stream = AsyncLineStream::new(ConverterCommand::new("data.json"));
/// while let Some(line) = stream.next_line().await {
///     println!("{}", line?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AsyncLineStream {
    command: ConverterCommand,
    state: StreamState,
    process: Option<AsyncProcess>,
}

impl AsyncLineStream {
    /// Create a stream that will run `command` on first pull.
    #[must_use]
    pub fn new(command: ConverterCommand) -> Self {
        Self {
            command,
            state: StreamState::NotStarted,
            process: None,
        }
    }

    /// Await the next line.
    ///
    /// Returns `None` once the converter has exited with code zero, or on
    /// any call after the stream reached a terminal state. A launch,
    /// read, or converter failure is returned exactly once.
    pub async fn next_line(&mut self) -> Option<Result<LineRecord, Error>> {
        match self.state {
            StreamState::NotStarted => match self.command.launch_async() {
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

        match self.read_next().await {
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

    /// Collect every remaining line, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first launch, read, or converter failure.
    pub async fn collect_lines(&mut self) -> Result<Vec<LineRecord>, Error> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line().await {
            lines.push(line?);
        }
        Ok(lines)
    }

    /// Adapt the stream into a [`futures_core::Stream`].
    ///
    /// Nothing is spawned until the returned stream is first polled.
    pub fn into_stream(self) -> impl Stream<Item = Result<LineRecord, Error>> {
        futures_util::stream::unfold(self, |mut stream| async move {
            let item = stream.next_line().await?;
            Some((item, stream))
        })
    }

    async fn read_next(&mut self) -> Result<Option<LineRecord>, Error> {
        let Some(handle) = self.process.as_mut().and_then(AsyncProcess::handle_mut) else {
            return Ok(None);
        };

        let pid = handle.pid();
        if let Some(status) = handle.poll_exit()? {
            tracing::trace!(?pid, %status, "Converter exited, draining stdout");
        }

        if let Some(lines) = handle.stdout_mut() {
            // `Lines::next_line` is cancel safe.
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                let record = LineRecord::new(&line);
                tracing::trace!(?pid, len = record.len(), "Read line");
                return Ok(Some(record));
            }
        }

        let status = match handle.exit_status() {
            Some(status) => status,
            None => handle.child_mut().wait().await?,
        };
        handle.record_exit(status);
        let code = exit_code(status);

        // The capture task has been reading since launch; an interrupted
        // wait here resumes on the next call.
        let stderr = match handle.stderr_mut() {
            Some(capture) if code != 0 => capture.finish().await?,
            _ => Vec::new(),
        };

        match classify(code, &stderr) {
            Some(failure) => Err(failure.into()),
            None => {
                tracing::debug!(?pid, "Converter finished");
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

impl LineSource for AsyncLineStream {
    fn command(&self) -> &ConverterCommand {
        &self.command
    }

    fn state(&self) -> StreamState {
        self.state
    }

    fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(AsyncProcess::pid)
    }

    fn terminate(&mut self) {
        self.release();
        if !self.state.is_terminal() {
            self.state = StreamState::Abandoned;
        }
    }
}

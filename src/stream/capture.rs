//! Background stderr collection.
//!
//! The converter's stderr is read from the moment it is launched, so a
//! chatty converter never blocks on a full pipe. The streams only look at
//! the collected bytes after the exit status is known.

use std::io::{self, Read};
use std::thread::JoinHandle;

use tokio::io::AsyncReadExt;

/// Stderr of a blocking converter, drained on a dedicated thread.
#[derive(Debug)]
pub struct StderrCapture {
    reader: Option<JoinHandle<io::Result<Vec<u8>>>>,
}

impl StderrCapture {
    /// Start draining `pipe` on a new thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader thread cannot be spawned.
    pub fn spawn<R: Read + Send + 'static>(mut pipe: R) -> io::Result<Self> {
        let reader = std::thread::Builder::new()
            .name("converter-stderr".to_string())
            .spawn(move || -> io::Result<Vec<u8>> {
                let mut captured = Vec::new();
                pipe.read_to_end(&mut captured)?;
                Ok(captured)
            })?;
        Ok(Self {
            reader: Some(reader),
        })
    }

    /// Wait for stderr to close and return everything written to it.
    ///
    /// Returns an empty buffer on every call after the first.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the pipe failed.
    pub fn finish(&mut self) -> io::Result<Vec<u8>> {
        let Some(reader) = self.reader.take() else {
            return Ok(Vec::new());
        };
        reader
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "stderr reader thread panicked"))?
    }
}

/// Stderr of a cooperative converter, drained by a runtime task.
///
/// Dropping the capture aborts the task and closes the pipe.
#[derive(Debug)]
pub struct AsyncStderrCapture {
    task: Option<tokio::task::JoinHandle<io::Result<Vec<u8>>>>,
}

impl AsyncStderrCapture {
    /// Start draining `pipe` on the current tokio runtime.
    #[must_use]
    pub fn spawn<R: tokio::io::AsyncRead + Unpin + Send + 'static>(mut pipe: R) -> Self {
        let task = tokio::spawn(async move {
            let mut captured = Vec::new();
            pipe.read_to_end(&mut captured).await?;
            Ok::<_, io::Error>(captured)
        });
        Self { task: Some(task) }
    }

    /// Wait for stderr to close and return everything written to it.
    ///
    /// Cancel safe: if the returned future is dropped early, the task keeps
    /// reading and a later call picks up the full buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the pipe failed.
    pub async fn finish(&mut self) -> io::Result<Vec<u8>> {
        let Some(task) = self.task.as_mut() else {
            return Ok(Vec::new());
        };
        let joined = task.await;
        self.task = None;
        joined.map_err(io::Error::from)?
    }
}

impl Drop for AsyncStderrCapture {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

//! Output sinks: copy stream records to a writer or file, one per line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::stream::{AsyncLineStream, Error, LineRecord};

/// Error type for sink operations.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// The stream failed to produce its records.
    #[error(transparent)]
    Stream(#[from] Error),
    /// Writing a record to the sink failed.
    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),
}

/// Write each record followed by a newline.
///
/// Returns the number of records written. Stops at the first stream error,
/// leaving the records written so far in `writer`.
///
/// # Errors
///
/// Returns `SinkError::Stream` if the stream fails and `SinkError::Write`
/// if the writer fails.
pub fn write_lines<I, W>(lines: I, writer: &mut W) -> Result<usize, SinkError>
where
    I: IntoIterator<Item = Result<LineRecord, Error>>,
    W: Write,
{
    let mut count = 0;
    for line in lines {
        let line = line?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Create (or truncate) `path` and write every record to it.
///
/// # Errors
///
/// Returns `SinkError::Write` if the file cannot be created or written, and
/// `SinkError::Stream` if the stream fails.
pub fn write_to_file<I>(lines: I, path: &Path) -> Result<usize, SinkError>
where
    I: IntoIterator<Item = Result<LineRecord, Error>>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let count = write_lines(lines, &mut writer)?;
    tracing::debug!(path = %path.display(), count, "Wrote records to file");
    Ok(count)
}

/// Async counterpart of [`write_lines`].
///
/// # Errors
///
/// Returns `SinkError::Stream` if the stream fails and `SinkError::Write`
/// if the writer fails.
pub async fn write_lines_async<W>(
    stream: &mut AsyncLineStream,
    writer: &mut W,
) -> Result<usize, SinkError>
where
    W: AsyncWrite + Unpin,
{
    let mut count = 0;
    while let Some(line) = stream.next_line().await {
        let line = line?;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        count += 1;
    }
    writer.flush().await?;
    Ok(count)
}

/// Async counterpart of [`write_to_file`].
///
/// # Errors
///
/// Returns `SinkError::Write` if the file cannot be created or written, and
/// `SinkError::Stream` if the stream fails.
pub async fn write_to_file_async(
    stream: &mut AsyncLineStream,
    path: &Path,
) -> Result<usize, SinkError> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = tokio::io::BufWriter::new(file);
    let count = write_lines_async(stream, &mut writer).await?;
    tracing::debug!(path = %path.display(), count, "Wrote records to file");
    Ok(count)
}

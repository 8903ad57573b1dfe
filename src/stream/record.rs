//! Records, stream states, and the capabilities shared by both streams.

use std::fmt;
use std::ops::Deref;

use super::ConverterCommand;

/// One line of converter output with surrounding whitespace stripped.
///
/// The text is passed through opaquely; no JSON validation happens here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineRecord(String);

impl LineRecord {
    /// Build a record from a raw line, trimming surrounding whitespace.
    #[must_use]
    pub fn new(line: &str) -> Self {
        Self(line.trim().to_string())
    }

    /// The record text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the record, returning the owned text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for LineRecord {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LineRecord {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<LineRecord> for String {
    fn from(record: LineRecord) -> Self {
        record.0
    }
}

impl PartialEq<str> for LineRecord {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LineRecord {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Lifecycle state of a line stream.
///
/// ```text
/// NotStarted -> Running -> Exhausted | Failed | Abandoned
/// ```
///
/// Terminal states never transition again: further pulls return end of
/// sequence and the converter is never relaunched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// Constructed, no process spawned yet.
    #[default]
    NotStarted,
    /// Process spawned, lines may still arrive.
    Running,
    /// The converter exited with code zero after its last line.
    Exhausted,
    /// Launch, read, or converter failure was reported to the caller.
    Failed,
    /// The caller terminated the stream before it finished.
    Abandoned,
}

impl StreamState {
    /// Whether no more lines can be produced.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted | Self::Failed | Self::Abandoned)
    }
}

/// Capabilities shared by the blocking and cooperative line streams.
///
/// Pulling lines is flavor specific (`Iterator` vs. `next_line().await`);
/// inspection and abandonment are common.
pub trait LineSource {
    /// The command this stream runs.
    fn command(&self) -> &ConverterCommand;

    /// Current lifecycle state.
    fn state(&self) -> StreamState;

    /// Process id of the running converter, if one is live.
    fn pid(&self) -> Option<u32>;

    /// Abandon the stream, releasing the converter process.
    ///
    /// Idempotent. A stream that was never started stays unspawned, and
    /// a terminal stream keeps its state.
    fn terminate(&mut self);
}

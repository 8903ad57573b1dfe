//! JSON Lineage - stream JSON Lines records out of the `jsonl_converter`
//! process, blocking or async.
//!
//! ```no_run
//! for line in json_lineage::load("data.json") {
//!     println!("{}", line?);
//! }
//! # Ok::<(), json_lineage::Error>(())
//! ```

pub mod config;
pub mod sink;
pub mod stream;

use std::path::PathBuf;

pub use stream::{
    AsyncLineStream, ConverterCommand, Error, ExecutionFailure, LaunchError, LineRecord,
    LineSource, StreamState, SyncLineStream,
};

/// Blocking stream over the converter output for `path`.
///
/// Nothing is spawned until the first line is pulled.
#[must_use]
pub fn load(path: impl Into<PathBuf>) -> SyncLineStream {
    SyncLineStream::new(ConverterCommand::new(path))
}

/// Async stream over the converter output for `path`.
///
/// Nothing is spawned until the first line is awaited.
#[must_use]
pub fn load_async(path: impl Into<PathBuf>) -> AsyncLineStream {
    AsyncLineStream::new(ConverterCommand::new(path))
}

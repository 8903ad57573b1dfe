//! Line streams over `jsonl_converter` output.
//!
//! [`SyncLineStream`] blocks the calling thread per line; [`AsyncLineStream`]
//! suspends the calling task. Both launch the converter lazily, report
//! failures through the shared [`classify`] function, and release the
//! process through a [`LifecycleController`].

mod async_stream;
mod capture;
mod classify;
mod command;
mod error;
mod process;
mod record;
mod sync_stream;

pub use async_stream::*;
pub use capture::*;
pub use classify::*;
pub use command::*;
pub use error::*;
pub use process::*;
pub use record::*;
pub use sync_stream::*;

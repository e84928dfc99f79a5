//! Asynchronous job engine: a bounded pool of worker threads draining a FIFO
//! queue of named jobs, reporting lifecycle events through an observer sink.

pub mod engine;
pub mod error;
pub mod event;

pub use engine::{JobEngine, ProgressHandle, DEFAULT_WORKERS};
pub use error::{JobError, Result};
pub use event::{ChannelSink, EventSink, JobEvent};

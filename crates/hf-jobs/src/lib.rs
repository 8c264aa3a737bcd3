//! A restartable async job queue: bounded channel, fixed worker pool,
//! per-item persistence (spec §3, §4.8).

mod processor;
mod queue;

pub use processor::JobProcessor;
pub use queue::{JobQueue, DEFAULT_PERSIST_EVERY};

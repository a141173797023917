//! Update and reset orchestration for a long-running world service.
//!
//! Runs are strictly sequential and fail fast. Neither orchestrator takes a
//! lock: callers must not run two of them against the same working directory
//! or database at once.

mod log_sink;
mod reset;
mod update;

pub use log_sink::{format_record, LogLevel, LogSink};
pub use reset::{ResetOptions, ResetOrchestrator, ResetReport};
pub use update::{UpdateOrchestrator, UpdateReport};

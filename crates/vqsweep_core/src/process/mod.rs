//! External-process execution and its audit trail.

pub mod log;
pub mod runner;

pub use log::{run_enqueued, run_logged, CommandLog};
pub use runner::{ProcessError, ProcessRunner, RunOutput, RunRequest, SystemRunner};

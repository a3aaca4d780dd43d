//! Sweep orchestration: encode and measure every (source, control value)
//! unit of a template, collecting successes and failures side by side.

pub mod errors;
pub mod orchestrator;
pub mod types;

pub use errors::{SweepError, UnitError};
pub use orchestrator::SweepRunner;
pub use types::{SweepOutcome, SweepUnit, UnitFailure, UnitResult, UnitState};

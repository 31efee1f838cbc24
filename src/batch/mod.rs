//! Step-driven batch translation.
//! `state` owns the unit list and cursor, `driver` runs one unit per
//! `step()`, `session` persists a batch so it can be resumed or reviewed.

pub mod driver;
pub mod session;
pub mod state;

use thiserror::Error;

pub use driver::{run_batch, BatchDriver, BatchProgress, RunOutcome, StepReport};
pub use session::BatchSession;
pub use state::{BatchState, TranslationUnit, UnitStatus, FAILED_SENTINEL_PREFIX};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("unit index {index} out of range (batch has {len} units)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid transition for unit {index}: {from} -> {to}")]
    InvalidTransition {
        index: usize,
        from: UnitStatus,
        to: UnitStatus,
    },
    #[error("no step in progress")]
    NoStepInProgress,
    #[error("inconsistent batch state: {0}")]
    Corrupt(String),
}

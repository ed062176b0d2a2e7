//! rf-exec: runs compiled protocols against an apparatus.
//!
//! Provides:
//! - `execute`, a single-task cooperative scheduler over the compiled schedule
//! - `Experiment`, the record a run fills in
//! - `ExperimentControl` for cancelling and pausing from outside the run
//! - `RunClock`, experiment elapsed time with pauses excluded
//! - dry runs and fast-forward through `ExecuteOptions`

pub mod clock;
pub mod control;
pub mod error;
pub mod executor;
pub mod experiment;
pub mod options;

pub use clock::RunClock;
pub use control::{ControlState, ExperimentControl};
pub use error::{ExecError, ExecResult};
pub use executor::{SIMULATED_READING, execute};
pub use experiment::Experiment;
pub use options::{DryRun, ExecuteOptions};

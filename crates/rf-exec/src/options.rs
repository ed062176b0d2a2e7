//! Execution options.

use std::path::PathBuf;

use crate::error::{ExecError, ExecResult};

/// Whether hardware is touched, and how fast time runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DryRun {
    /// Acquire devices and apply every instruction.
    #[default]
    Off,
    /// Skip devices; keep wall-clock pacing.
    Simulate,
    /// Skip devices and divide every wait by the factor (at least 2).
    FastForward(u32),
}

impl DryRun {
    pub fn is_dry(self) -> bool {
        !matches!(self, DryRun::Off)
    }

    /// Protocol seconds per wall-clock second.
    pub fn speed(self) -> f64 {
        match self {
            DryRun::FastForward(n) => f64::from(n),
            _ => 1.0,
        }
    }
}

/// Options for [`execute`](crate::execute).
#[derive(Clone, Debug)]
pub struct ExecuteOptions {
    pub dry_run: DryRun,
    /// Fail the run on the first `apply` or `read` error.
    pub strict: bool,
    /// Datapoints are appended here as JSON lines.
    pub data_file: Option<PathBuf>,
    /// Run log records are appended here as JSON lines.
    pub log_file: Option<PathBuf>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: DryRun::Off,
            strict: true,
            data_file: None,
            log_file: None,
        }
    }
}

impl ExecuteOptions {
    pub fn dry_run(dry_run: DryRun) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn validate(&self) -> ExecResult<()> {
        if let DryRun::FastForward(n) = self.dry_run
            && n < 2
        {
            return Err(ExecError::InvalidArg {
                what: "fast-forward factor must be at least 2",
            });
        }
        Ok(())
    }
}

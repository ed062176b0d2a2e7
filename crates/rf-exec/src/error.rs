//! Error types for protocol execution.

use rf_components::{ComponentError, ValidationFailure};
use rf_protocol::ProtocolError;
use rf_results::ResultsError;
use thiserror::Error;

/// Errors that stop a run, or keep it from starting.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Results(#[from] ResultsError),

    #[error("Protocol was already executed; reset it before running it again")]
    AlreadyExecuted,

    #[error("Experiment {id} has already ended")]
    ExperimentEnded { id: String },

    // resource
    #[error("Failed to acquire {component}: {source}")]
    Acquire {
        component: String,
        #[source]
        source: ComponentError,
    },

    #[error("{component} failed its preflight check: {failure}")]
    Preflight {
        component: String,
        #[source]
        failure: ValidationFailure,
    },

    // runtime
    #[error("Failed to update {component}: {source}")]
    Update {
        component: String,
        #[source]
        source: ComponentError,
    },

    #[error("Failed to apply new state to {component}: {source}")]
    Apply {
        component: String,
        #[source]
        source: ComponentError,
    },

    #[error("Failed to read {component}: {source}")]
    Read {
        component: String,
        #[source]
        source: ComponentError,
    },

    #[error("Experiment cancelled")]
    Cancelled,
}

pub type ExecResult<T> = Result<T, ExecError>;

impl ExecError {
    /// The component named by a runtime or resource error.
    pub fn component(&self) -> Option<&str> {
        match self {
            ExecError::Acquire { component, .. }
            | ExecError::Preflight { component, .. }
            | ExecError::Update { component, .. }
            | ExecError::Apply { component, .. }
            | ExecError::Read { component, .. } => Some(component),
            _ => None,
        }
    }
}

//! Errors from assembling, compiling and (de)serializing protocols.

use rf_components::{ComponentError, ValidationFailure};
use rf_core::{RfError, UnitError};
use thiserror::Error;

pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[derive(Error, Debug)]
pub enum ProtocolError {
    // configuration: raised by `add`
    #[error("{component} is not a component of {apparatus}")]
    NotInApparatus { component: String, apparatus: String },

    #[error("{component} is a passive component and has no state to set")]
    NotActive { component: String },

    #[error("Invalid parameter for {component}: {source}")]
    Attribute {
        component: String,
        #[source]
        source: ComponentError,
    },

    #[error("Invalid setting {setting} for valve {valve}")]
    InvalidValveSetting { valve: String, setting: String },

    #[error("No parameters supplied for {component}; the procedure would not change its state")]
    EmptyParams { component: String },

    #[error("Must provide one of stop and duration, not both")]
    StopAndDuration,

    #[error("Invalid {what}: {source}")]
    InvalidTime {
        what: &'static str,
        #[source]
        source: UnitError,
    },

    #[error("Cannot schedule {what}: {source}")]
    Unschedulable {
        what: &'static str,
        #[source]
        source: RfError,
    },

    #[error(
        "TempControl {component} is activated but no temperature is given. Specify 'temp' as well."
    )]
    TempWithoutSetpoint { component: String },

    #[error("Procedure for {component} starts at {start} s, after it stops at {stop} s")]
    StartAfterStop {
        component: String,
        start: f64,
        stop: f64,
    },

    #[error("Cannot clear procedures of an executed protocol; reset it first")]
    AlreadyExecuted,

    // compilation
    #[error("{component} isn't valid: {failure}")]
    InvalidComponent {
        component: String,
        #[source]
        failure: ValidationFailure,
    },

    #[error(
        "{component} cannot have two procedures for the entire duration of the protocol. \
         Combine them into one procedure or give them start and stop times."
    )]
    ContinuousConflict { component: String },

    #[error("Ambiguous stop time for {component}: the next procedure also starts at 0 s")]
    AmbiguousStop { component: String },

    #[error("Procedure time {time} s for {component} is outside the protocol [0, {duration}] s")]
    OutOfRange {
        component: String,
        time: f64,
        duration: f64,
    },

    #[error(
        "Procedures for {component} overlap: one stops at {stop} s but the next starts at {next_start} s"
    )]
    OverlappingProcedures {
        component: String,
        stop: f64,
        next_start: f64,
    },

    #[error(
        "Unable to infer the protocol duration. Define stop or duration for at least one procedure."
    )]
    UnderspecifiedDuration,

    // files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Raised by compilation rather than by `add` or file handling.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidComponent { .. }
                | ProtocolError::ContinuousConflict { .. }
                | ProtocolError::AmbiguousStop { .. }
                | ProtocolError::OutOfRange { .. }
                | ProtocolError::OverlappingProcedures { .. }
                | ProtocolError::UnderspecifiedDuration
        )
    }
}

//! Error types for component operations.

use rf_core::{Dimension, UnitError};
use thiserror::Error;

/// Errors raised while configuring or driving a component.
#[derive(Error, Debug, Clone)]
pub enum ComponentError {
    #[error("Invalid attribute '{attr}'. Valid attributes are [{valid}]")]
    UnknownAttribute { attr: String, valid: String },

    #[error("Bad dimensionality of '{attr}': expected {expected}, got {found}")]
    DimensionMismatch {
        attr: String,
        expected: Dimension,
        found: Dimension,
    },

    #[error("Bad type for '{attr}': expected {expected}, got {found}")]
    TypeMismatch {
        attr: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid value for '{attr}': {source}")]
    Unit {
        attr: String,
        #[source]
        source: UnitError,
    },

    #[error("Invalid tube: {reason}")]
    InvalidTube { reason: String },

    #[error("Device error: {message}")]
    Device { message: String },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ComponentError::UnknownAttribute {
            attr: "speed".into(),
            valid: "rate".into(),
        };
        assert!(err.to_string().contains("speed"));
        assert!(err.to_string().contains("rate"));
    }
}

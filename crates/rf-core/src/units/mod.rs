//! Quantity layer: dimensions, the unit registry and `Quantity`.

mod dimension;
mod quantity;
pub mod registry;

pub use dimension::Dimension;
pub use quantity::{Quantity, UnitExpr};

use thiserror::Error;

/// `v` seconds.
pub fn secs(v: f64) -> Quantity {
    Quantity::known(v, "s", Dimension::TIME)
}

/// `v` minutes.
pub fn minutes(v: f64) -> Quantity {
    Quantity::known(v, "min", Dimension::TIME)
}

/// `v` mL/min.
pub fn ml_per_min(v: f64) -> Quantity {
    Quantity::known(v, "mL/min", Dimension::FLOW_RATE)
}

/// `v` Hz.
pub fn hz(v: f64) -> Quantity {
    Quantity::known(v, "Hz", Dimension::FREQUENCY)
}

/// `v` degrees Celsius.
pub fn deg_c(v: f64) -> Quantity {
    Quantity::known(v, "degC", Dimension::TEMPERATURE)
}

/// `v` millimetres.
pub fn mm(v: f64) -> Quantity {
    Quantity::known(v, "mm", Dimension::LENGTH)
}

pub type UnitResult<T> = Result<T, UnitError>;

/// Errors from parsing, converting or combining quantities.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("Cannot parse '{input}': {reason}")]
    Parse { input: String, reason: &'static str },

    #[error("Unknown unit '{unit}'")]
    UnknownUnit { unit: String },

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        expected: Dimension,
        found: Dimension,
    },

    #[error("Offset unit '{unit}' cannot be used in {what}")]
    OffsetUnit { unit: String, what: &'static str },

    #[error("Non-finite quantity value: {value}")]
    NonFinite { value: f64 },

    #[error("Negative time value: {value} s")]
    Negative { value: f64 },

    #[error("Time value {value} s does not fit in a duration")]
    TooLong { value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_build_known_quantities() {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(close(minutes(2.0).seconds().unwrap(), secs(120.0).seconds().unwrap()));
        assert!(close(mm(10.0).base_value(), 1.0));
        assert!(close(ml_per_min(60.0).base_value(), 1.0));
        assert_eq!(hz(5.0).dimension(), Dimension::FREQUENCY);
        assert!((deg_c(25.0).base_value() - 298.15).abs() < 1e-9);
    }
}

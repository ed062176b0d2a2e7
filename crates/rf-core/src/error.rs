use thiserror::Error;

pub type RfResult<T> = Result<T, RfError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RfError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("{what} of {value} s is later than the {max} s a schedule can reach")]
    TooLate {
        what: &'static str,
        value: f64,
        max: f64,
    },
}

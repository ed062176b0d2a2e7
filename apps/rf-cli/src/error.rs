//! Error type for the command line front end.

use rf_apparatus::ApparatusError;
use rf_exec::ExecError;
use rf_protocol::ProtocolError;
use rf_results::ResultsError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Apparatus error: {0}")]
    Apparatus(#[from] ApparatusError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Results error: {0}")]
    Results(#[from] ResultsError),

    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

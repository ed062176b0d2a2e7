//! rf-results: experiment ids, experiment storage and JSONL sinks.

pub mod hash;
pub mod sink;
pub mod store;
pub mod types;

pub use hash::{compute_experiment_id, experiment_id, protocol_hash};
pub use sink::{JsonlSink, read_jsonl};
pub use store::ExperimentStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] rf_protocol::ProtocolError),

    #[error("Experiment not found: {experiment_id}")]
    ExperimentNotFound { experiment_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },
}

//! Records produced by an experiment run.

use chrono::{DateTime, Utc};
use rf_components::{Params, Reading};
use serde::{Deserialize, Serialize};

pub type ExperimentId = String;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Pushed to the device.
    Executed,
    /// Dry run; the device was not touched.
    Simulated,
    /// The device rejected the update (lenient mode).
    Failed,
}

/// One instruction as it was carried out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub component: String,
    pub params: Params,
    pub timestamp: DateTime<Utc>,
    /// Experiment elapsed time in seconds.
    pub eet: f64,
    pub kind: RecordKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub value: Reading,
    pub timestamp: DateTime<Utc>,
    pub eet: f64,
}

/// One line of `data.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    pub device: String,
    pub timestamp: DateTime<Utc>,
    pub eet: f64,
    pub value: Reading,
    pub unit: String,
}

impl DataRecord {
    pub fn new(device: impl Into<String>, unit: impl Into<String>, point: &Datapoint) -> Self {
        Self {
            device: device.into(),
            timestamp: point.timestamp,
            eet: point.eet,
            value: point.value.clone(),
            unit: unit.into(),
        }
    }
}

/// One line of `log.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

impl LogRecord {
    pub fn now(level: &str, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: level.to_string(),
            message: message.into(),
        }
    }
}

/// `manifest.json` of a stored experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentManifest {
    pub experiment_id: ExperimentId,
    pub protocol: String,
    pub apparatus: String,
    pub created: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub outcome: Option<Outcome>,
    /// Seconds of protocol time.
    pub duration_s: f64,
    pub dry_run: bool,
    #[serde(default)]
    pub executed: Vec<ExecutionRecord>,
}

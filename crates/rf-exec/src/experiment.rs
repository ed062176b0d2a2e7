//! The record of one protocol run.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rf_protocol::Protocol;
use rf_results::{
    Datapoint, ExecutionRecord, ExperimentId, ExperimentManifest, Outcome, experiment_id,
};
use tokio::time::{Duration, Instant};
use tracing::warn;

use crate::control::ExperimentControl;
use crate::error::ExecResult;

#[derive(Debug, Default)]
struct RunRecord {
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    outcome: Option<Outcome>,
    executed: Vec<ExecutionRecord>,
    data: BTreeMap<String, Vec<Datapoint>>,
}

/// Created before a run, filled in while it executes, immutable once ended.
#[derive(Debug)]
pub struct Experiment {
    id: ExperimentId,
    protocol: String,
    apparatus: String,
    created: DateTime<Utc>,
    control: ExperimentControl,
    record: Mutex<RunRecord>,
}

impl Experiment {
    /// An experiment for `protocol`, identified by time and protocol content.
    pub fn new(protocol: &Protocol<'_>) -> ExecResult<Self> {
        let created = Utc::now();
        let id = experiment_id(protocol, created)?;
        Ok(Self::with_id(
            id,
            protocol.name(),
            protocol.apparatus().name(),
            created,
        ))
    }

    pub fn with_id(
        id: impl Into<ExperimentId>,
        protocol: &str,
        apparatus: &str,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            protocol: protocol.to_string(),
            apparatus: apparatus.to_string(),
            created,
            control: ExperimentControl::new(),
            record: Mutex::new(RunRecord::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunRecord> {
        self.record
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn protocol_name(&self) -> &str {
        &self.protocol
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn control(&self) -> ExperimentControl {
        self.control.clone()
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Total time spent paused so far.
    pub fn pause_offset(&self) -> Duration {
        self.control.paused_for(Instant::now())
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.lock().start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.lock().end_time
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.lock().outcome
    }

    pub fn is_ended(&self) -> bool {
        self.lock().end_time.is_some()
    }

    pub fn executed(&self) -> Vec<ExecutionRecord> {
        self.lock().executed.clone()
    }

    pub fn data(&self) -> BTreeMap<String, Vec<Datapoint>> {
        self.lock().data.clone()
    }

    /// Datapoints of one sensor, oldest first.
    pub fn datapoints(&self, sensor: &str) -> Vec<Datapoint> {
        self.lock().data.get(sensor).cloned().unwrap_or_default()
    }

    pub fn manifest(&self, duration_s: f64, dry_run: bool) -> ExperimentManifest {
        let record = self.lock();
        ExperimentManifest {
            experiment_id: self.id.clone(),
            protocol: self.protocol.clone(),
            apparatus: self.apparatus.clone(),
            created: self.created,
            start_time: record.start_time,
            end_time: record.end_time,
            outcome: record.outcome,
            duration_s,
            dry_run,
            executed: record.executed.clone(),
        }
    }

    pub(crate) fn begin(&self) {
        self.lock().start_time = Some(Utc::now());
    }

    pub(crate) fn push_record(&self, entry: ExecutionRecord) {
        let mut record = self.lock();
        if record.end_time.is_some() {
            warn!("Experiment {} has ended; dropping record for {}", self.id, entry.component);
            return;
        }
        record.executed.push(entry);
    }

    pub(crate) fn push_datapoint(&self, sensor: &str, point: Datapoint) {
        let mut record = self.lock();
        if record.end_time.is_some() {
            return;
        }
        record.data.entry(sensor.to_string()).or_default().push(point);
    }

    pub(crate) fn end(&self) {
        self.lock().end_time = Some(Utc::now());
    }

    pub(crate) fn set_outcome(&self, outcome: Outcome) {
        self.lock().outcome = Some(outcome);
    }
}

//! Cooperative executor.
//!
//! A run is a set of futures polled on the caller's task: one per component
//! with instructions, one monitor per sensor, and an end-of-loop timer, with
//! the cancel watcher and the pause handler alongside. The first error wins
//! and drops everything still pending; teardown then resets components to
//! their base state and releases devices in reverse acquisition order.

use std::sync::Mutex;

use chrono::Utc;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use rf_apparatus::{ActiveEntry, Apparatus};
use rf_components::{
    ActiveComponent, Params, Reading, ValidationFailure, ValidationRule, validate_component,
};
use rf_core::SCHEDULE_EPSILON;
use rf_protocol::{Compiled, Protocol, RunState, TimedInstruction};
use rf_results::{
    DataRecord, Datapoint, ExecutionRecord, JsonlSink, LogRecord, Outcome, RecordKind,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::clock::RunClock;
use crate::error::{ExecError, ExecResult};
use crate::experiment::Experiment;
use crate::options::{DryRun, ExecuteOptions};

/// Stored in place of a reading during dry runs.
pub const SIMULATED_READING: &str = "simulated";

/// Compile `protocol` and run it, recording into `experiment`.
///
/// Returns the first runtime error (or [`ExecError::Cancelled`]); the
/// experiment keeps every record made up to that point either way.
pub async fn execute(
    protocol: &mut Protocol<'_>,
    experiment: &Experiment,
    options: &ExecuteOptions,
) -> ExecResult<()> {
    options.validate()?;
    if protocol.was_executed() {
        return Err(ExecError::AlreadyExecuted);
    }
    if experiment.is_ended() {
        return Err(ExecError::ExperimentEnded {
            id: experiment.id().to_string(),
        });
    }

    let compiled = protocol.compile()?;
    protocol.set_state(RunState::Compiled);
    let apparatus = protocol.apparatus();
    let sinks = Sinks::open(options)?;

    let mut acquired = Vec::new();
    if !options.dry_run.is_dry() {
        protocol.set_state(RunState::Acquiring);
        if let Err(e) = acquire_all(apparatus, &mut acquired).await {
            sinks.error(format!("Experiment {} aborted: {e}", experiment.id()));
            release_all(&acquired).await;
            experiment.end();
            experiment.set_outcome(Outcome::Failed);
            protocol.set_state(RunState::Failed);
            return Err(e);
        }
    }

    let control = experiment.control();
    control.set_pausable(!matches!(options.dry_run, DryRun::FastForward(_)));
    protocol.set_state(RunState::Running);
    experiment.begin();

    let run = Run {
        apparatus,
        experiment,
        options,
        clock: RunClock::start(options.dry_run.speed(), control),
        duration: compiled.duration,
        sinks,
        applied: watch::channel(0).0,
        end_loop: watch::channel(false).0,
    };
    run.sinks.info(format!(
        "Running protocol '{}' as experiment {} for {} s",
        protocol.name(),
        experiment.id(),
        compiled.duration
    ));

    let result = run.drive(&compiled).await;

    protocol.set_state(RunState::Stopping);
    experiment.end();
    run.reset_components().await;
    release_all(&acquired).await;

    match &result {
        Ok(()) => {
            experiment.set_outcome(Outcome::Completed);
            run.sinks
                .info(format!("Experiment {} completed", experiment.id()));
            protocol.set_state(RunState::Done);
        }
        Err(ExecError::Cancelled) => {
            experiment.set_outcome(Outcome::Cancelled);
            run.sinks
                .warn(format!("Experiment {} cancelled", experiment.id()));
            protocol.set_state(RunState::Done);
        }
        Err(e) => {
            experiment.set_outcome(Outcome::Failed);
            run.sinks
                .error(format!("Experiment {} failed: {e}", experiment.id()));
            protocol.set_state(RunState::Failed);
        }
    }
    result
}

/// Open devices in apparatus order, probing each one.
async fn acquire_all<'a>(
    apparatus: &'a Apparatus,
    acquired: &mut Vec<&'a ActiveEntry>,
) -> ExecResult<()> {
    for entry in apparatus.active_components() {
        let name = &entry.info.name;
        let mut component = entry.component.lock().await;
        component
            .acquire()
            .await
            .map_err(|source| ExecError::Acquire {
                component: name.clone(),
                source,
            })?;
        acquired.push(entry);
        debug!("Acquired {name}");
        preflight(name, &entry.info.base_state, &mut **component).await?;
    }
    Ok(())
}

/// Base state applied on the live device, plus one read for sensors.
async fn preflight(
    name: &str,
    base: &Params,
    component: &mut dyn ActiveComponent,
) -> ExecResult<()> {
    let failed = |reason: String| ExecError::Preflight {
        component: name.to_string(),
        failure: ValidationFailure::new(ValidationRule::Preflight, reason),
    };
    validate_component(&*component).map_err(|failure| ExecError::Preflight {
        component: name.to_string(),
        failure,
    })?;
    component
        .update_from_params(base)
        .map_err(|e| failed(e.to_string()))?;
    component.apply().await.map_err(|e| failed(e.to_string()))?;
    if let Some(readable) = component.readable_mut() {
        let reading = readable.read().await.map_err(|e| failed(e.to_string()))?;
        if !reading.is_valid() {
            return Err(failed("sensor returned an empty reading".to_string()));
        }
    }
    Ok(())
}

/// Release in reverse order. Failures are logged; every device gets its turn.
async fn release_all(acquired: &[&ActiveEntry]) {
    for entry in acquired.iter().rev() {
        let mut component = entry.component.lock().await;
        match component.release().await {
            Ok(()) => debug!("Released {}", entry.info.name),
            Err(e) => warn!("Failed to release {}: {e}", entry.info.name),
        }
    }
}

/// `rate=10 mL/min, active=true`
fn describe(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Optional JSONL outputs. Write failures are logged and the run continues.
struct Sinks {
    data: Option<Mutex<JsonlSink>>,
    log: Option<Mutex<JsonlSink>>,
}

impl Sinks {
    fn open(options: &ExecuteOptions) -> ExecResult<Self> {
        let open = |path: &Option<std::path::PathBuf>| -> ExecResult<Option<Mutex<JsonlSink>>> {
            Ok(match path {
                Some(path) => Some(Mutex::new(JsonlSink::open(path.clone())?)),
                None => None,
            })
        };
        Ok(Self {
            data: open(&options.data_file)?,
            log: open(&options.log_file)?,
        })
    }

    fn data(&self, record: &DataRecord) {
        if let Some(sink) = &self.data {
            let mut sink = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = sink.append(record) {
                warn!("Failed to write datapoint: {e}");
            }
        }
    }

    fn log(&self, level: &str, message: String) {
        if let Some(sink) = &self.log {
            let mut sink = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = sink.append(&LogRecord::now(level, message)) {
                warn!("Failed to write log record: {e}");
            }
        }
    }

    fn info(&self, message: String) {
        info!("{message}");
        self.log("INFO", message);
    }

    fn warn(&self, message: String) {
        warn!("{message}");
        self.log("WARNING", message);
    }

    fn error(&self, message: String) {
        error!("{message}");
        self.log("ERROR", message);
    }
}

struct Run<'r> {
    apparatus: &'r Apparatus,
    experiment: &'r Experiment,
    options: &'r ExecuteOptions,
    clock: RunClock,
    duration: f64,
    sinks: Sinks,
    /// Bumped after every applied instruction; idle sensor monitors wait on it.
    applied: watch::Sender<u64>,
    end_loop: watch::Sender<bool>,
}

impl<'r> Run<'r> {
    async fn drive(&self, compiled: &Compiled) -> ExecResult<()> {
        let mut tasks: FuturesUnordered<LocalBoxFuture<'_, ExecResult<()>>> =
            FuturesUnordered::new();
        for (id, instructions) in &compiled.schedule {
            if let Some(entry) = self.apparatus.active(*id) {
                tasks.push(self.run_instructions(entry, instructions).boxed_local());
            }
        }
        for entry in self.apparatus.sensors() {
            tasks.push(self.monitor(entry).boxed_local());
        }
        tasks.push(self.end_of_loop().boxed_local());

        let supervisors =
            async { tokio::try_join!(self.watch_cancel(), self.handle_pause()).map(|_| ()) };
        tokio::pin!(supervisors);

        loop {
            tokio::select! {
                biased;
                res = &mut supervisors => return res,
                next = tasks.next() => match next {
                    Some(Ok(())) => {}
                    Some(Err(e)) => return Err(e),
                    None => return Ok(()),
                },
            }
        }
    }

    /// Instructions of one component, in schedule order.
    async fn run_instructions(
        &self,
        entry: &ActiveEntry,
        instructions: &[TimedInstruction],
    ) -> ExecResult<()> {
        for instruction in instructions {
            self.clock.sleep_until(instruction.time).await;
            self.apply_instruction(entry, &instruction.params).await?;
        }
        Ok(())
    }

    async fn apply_instruction(&self, entry: &ActiveEntry, params: &Params) -> ExecResult<()> {
        let name = entry.info.name.as_str();
        let kind = {
            let mut component = entry.component.lock().await;
            component
                .update_from_params(params)
                .map_err(|source| ExecError::Update {
                    component: name.to_string(),
                    source,
                })?;
            self.push(name, &mut **component).await?
        };

        let eet = self.clock.eet();
        let prefix = match kind {
            RecordKind::Simulated => "[dry run] ",
            _ => "",
        };
        if kind != RecordKind::Failed {
            self.sinks
                .info(format!("{prefix}Set {name} to {} at {eet:.3} s", describe(params)));
        }
        self.experiment.push_record(ExecutionRecord {
            component: name.to_string(),
            params: params.clone(),
            timestamp: Utc::now(),
            eet,
            kind,
        });
        self.applied.send_modify(|n| *n += 1);
        Ok(())
    }

    /// Apply the component's current attributes, honouring dry run and strictness.
    async fn push(&self, name: &str, component: &mut dyn ActiveComponent) -> ExecResult<RecordKind> {
        if self.options.dry_run.is_dry() {
            return Ok(RecordKind::Simulated);
        }
        match component.apply().await {
            Ok(()) => Ok(RecordKind::Executed),
            Err(source) if self.options.strict => Err(ExecError::Apply {
                component: name.to_string(),
                source,
            }),
            Err(e) => {
                self.sinks
                    .warn(format!("Failed to apply new state to {name}: {e}"));
                Ok(RecordKind::Failed)
            }
        }
    }

    /// Sample one sensor at its configured rate until the end of the run.
    async fn monitor(&self, entry: &ActiveEntry) -> ExecResult<()> {
        let name = entry.info.name.as_str();
        let unit = entry.info.sensor_unit.clone().unwrap_or_default();
        let mut end = self.end_loop.subscribe();
        let mut applied = self.applied.subscribe();

        loop {
            if *end.borrow_and_update()
                || self.clock.protocol_time() >= self.duration - SCHEDULE_EPSILON
            {
                break;
            }
            applied.borrow_and_update();
            let rate = {
                let component = entry.component.lock().await;
                component
                    .readable()
                    .map_or(0.0, |readable| readable.rate().base_value())
            };
            if rate <= 0.0 {
                tokio::select! {
                    _ = applied.changed() => {}
                    _ = end.changed() => {}
                }
                continue;
            }

            let value = if self.options.dry_run.is_dry() {
                Reading::Text(SIMULATED_READING.to_string())
            } else {
                let mut component = entry.component.lock().await;
                let Some(readable) = component.readable_mut() else {
                    break;
                };
                match readable.read().await {
                    Ok(value) => value,
                    Err(source) if self.options.strict => {
                        return Err(ExecError::Read {
                            component: name.to_string(),
                            source,
                        });
                    }
                    Err(e) => {
                        self.sinks
                            .warn(format!("Failed to read {name}: {e}; no more data from it"));
                        return Ok(());
                    }
                }
            };

            let read_at = self.clock.protocol_time();
            let point = Datapoint {
                value,
                timestamp: Utc::now(),
                eet: self.clock.eet(),
            };
            debug!("{name}: {} {unit} at {:.3} s", point.value, point.eet);
            self.sinks.data(&DataRecord::new(name, unit.as_str(), &point));
            let next = read_at + 1.0 / rate;
            self.experiment.push_datapoint(name, point);

            tokio::select! {
                _ = self.clock.sleep_until(next) => {}
                _ = end.changed() => {}
            }
        }
        Ok(())
    }

    async fn end_of_loop(&self) -> ExecResult<()> {
        self.clock.sleep_until(self.duration).await;
        debug!("End of protocol reached at {} s", self.duration);
        self.end_loop.send_replace(true);
        Ok(())
    }

    /// Only ever returns an error.
    async fn watch_cancel(&self) -> ExecResult<()> {
        let mut rx = self.experiment.control().subscribe();
        loop {
            if rx.borrow_and_update().cancelled {
                return Err(ExecError::Cancelled);
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Base state on pause, previous attributes on resume. Only returns on error.
    async fn handle_pause(&self) -> ExecResult<()> {
        let mut rx = self.experiment.control().subscribe();
        let mut saved: Option<Vec<(&'r ActiveEntry, Params)>> = None;
        loop {
            let paused = rx.borrow_and_update().paused;
            if paused && saved.is_none() {
                saved = Some(self.enter_pause().await?);
            } else if !paused {
                if let Some(states) = saved.take() {
                    self.leave_pause(states).await?;
                }
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    async fn enter_pause(&self) -> ExecResult<Vec<(&'r ActiveEntry, Params)>> {
        self.sinks
            .info("Pausing: setting all components to their base state".to_string());
        let mut saved = Vec::new();
        for entry in self.apparatus.active_components() {
            let mut component = entry.component.lock().await;
            saved.push((entry, component.snapshot()));
            component
                .update_from_params(&entry.info.base_state)
                .map_err(|source| ExecError::Update {
                    component: entry.info.name.clone(),
                    source,
                })?;
            self.push(&entry.info.name, &mut **component).await?;
        }
        Ok(saved)
    }

    async fn leave_pause(&self, saved: Vec<(&'r ActiveEntry, Params)>) -> ExecResult<()> {
        self.sinks
            .info("Resuming: restoring component states".to_string());
        for (entry, state) in saved {
            let mut component = entry.component.lock().await;
            component
                .update_from_params(&state)
                .map_err(|source| ExecError::Update {
                    component: entry.info.name.clone(),
                    source,
                })?;
            self.push(&entry.info.name, &mut **component).await?;
        }
        Ok(())
    }

    /// In-memory only; devices are about to be released.
    async fn reset_components(&self) {
        for entry in self.apparatus.active_components() {
            let mut component = entry.component.lock().await;
            if let Err(e) = component.update_from_params(&entry.info.base_state) {
                warn!("Failed to reset {}: {e}", entry.info.name);
            }
        }
    }
}

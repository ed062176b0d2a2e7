use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rf_apparatus::{Apparatus, ApparatusBuilder};
use rf_components::{
    ActiveComponent, Attributes, BROKEN_SENSOR_READS, BrokenDummy, BrokenSensor, ComponentError,
    ComponentKind, ComponentResult, DummySensor, Params, Pump, SwitchState, params,
};
use rf_core::ComponentId;
use rf_exec::{DryRun, ExecError, ExecuteOptions, Experiment, execute};
use rf_protocol::{Protocol, RunState, Step};
use rf_results::{LogRecord, Outcome, RecordKind, read_jsonl};
use tokio::time::{Duration, Instant, sleep};
use tracing_test::traced_test;

fn pump_rig() -> (Apparatus, ComponentId) {
    let mut b = ApparatusBuilder::new("pump rig");
    let p = b.add_active(Pump::new("P1"));
    (b.build().unwrap(), p)
}

fn sensor_rig() -> (Apparatus, ComponentId) {
    let mut b = ApparatusBuilder::new("sensor rig");
    let s = b.add_active(DummySensor::new("S").with_unit("bar"));
    (b.build().unwrap(), s)
}

async fn rate_of(app: &Apparatus, id: ComponentId) -> f64 {
    let component = app.active(id).unwrap().component.lock().await;
    component.snapshot()["rate"].as_quantity().unwrap().base_value()
}

/// Logs lifecycle calls into a shared list.
#[derive(Debug)]
struct Recorder {
    name: String,
    state: SwitchState,
    events: Arc<Mutex<Vec<String>>>,
    fail_acquire: bool,
}

impl Recorder {
    fn new(name: &str, events: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            state: SwitchState::default(),
            events: Arc::clone(events),
            fail_acquire: false,
        }
    }

    fn log(&self, what: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{what} {}", self.name));
    }
}

#[async_trait]
impl ActiveComponent for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Dummy
    }

    fn attributes(&self) -> &dyn Attributes {
        &self.state
    }

    fn attributes_mut(&mut self) -> &mut dyn Attributes {
        &mut self.state
    }

    fn base_state(&self) -> Params {
        params([("active", false)])
    }

    async fn acquire(&mut self) -> ComponentResult<()> {
        if self.fail_acquire {
            return Err(ComponentError::Device {
                message: "port busy".into(),
            });
        }
        self.log("acquire");
        Ok(())
    }

    async fn release(&mut self) -> ComponentResult<()> {
        self.log("release");
        Ok(())
    }

    async fn apply(&mut self) -> ComponentResult<()> {
        self.log("apply");
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn dry_run_follows_the_schedule() {
    let (app, p) = pump_rig();
    let mut proto = Protocol::new(&app);
    proto
        .add(p, Step::new().set("rate", "10 mL/min").duration("5 min"))
        .unwrap();
    let exp = Experiment::new(&proto).unwrap();

    let t0 = Instant::now();
    execute(&mut proto, &exp, &ExecuteOptions::dry_run(DryRun::Simulate))
        .await
        .unwrap();

    assert_eq!(Instant::now() - t0, Duration::from_secs(300));
    let records = exp.executed();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.kind == RecordKind::Simulated));
    assert_eq!(records[0].eet, 0.0);
    assert!((records[1].eet - 300.0).abs() < 1e-6);
    assert_eq!(exp.outcome(), Some(Outcome::Completed));
    assert!(exp.start_time().is_some() && exp.end_time().is_some());
    assert_eq!(proto.state(), RunState::Done);
    assert!(proto.was_executed());
    assert_eq!(rate_of(&app, p).await, 0.0);
}

#[tokio::test(start_paused = true)]
async fn sensor_samples_at_its_rate() {
    let (app, s) = sensor_rig();
    let mut proto = Protocol::new(&app);
    proto
        .add(s, Step::new().set("rate", "5 Hz").start("0 s").stop("1 s"))
        .unwrap();
    let exp = Experiment::new(&proto).unwrap();

    execute(&mut proto, &exp, &ExecuteOptions::dry_run(DryRun::Simulate))
        .await
        .unwrap();

    let points = exp.datapoints("S");
    assert_eq!(points.len(), 5);
    for (i, point) in points.iter().enumerate() {
        assert!((point.eet - 0.2 * i as f64).abs() < 1e-6, "{point:?}");
    }
}

#[tokio::test]
async fn fast_forward_runs_faster_than_real_time() {
    let (app, s) = sensor_rig();
    let mut proto = Protocol::new(&app);
    proto
        .add(s, Step::new().set("rate", "5 Hz").start("0 s").stop("1 s"))
        .unwrap();
    let exp = Experiment::new(&proto).unwrap();

    let t0 = std::time::Instant::now();
    execute(
        &mut proto,
        &exp,
        &ExecuteOptions::dry_run(DryRun::FastForward(5)),
    )
    .await
    .unwrap();

    assert!(t0.elapsed() < std::time::Duration::from_millis(300));
    assert!((4..=5).contains(&exp.datapoints("S").len()));
}

fn broken_rig() -> (Apparatus, ComponentId, ComponentId) {
    let mut b = ApparatusBuilder::new("broken rig");
    let p = b.add_active(Pump::new("P"));
    let d = b.add_active(BrokenDummy::new("D"));
    (b.build().unwrap(), p, d)
}

fn broken_protocol(app: &Apparatus, p: ComponentId, d: ComponentId) -> Protocol<'_> {
    let mut proto = Protocol::new(app);
    proto
        .add(p, Step::new().set("rate", "1 mL/min").start("0 s").stop("30 s"))
        .unwrap();
    proto
        .add(d, Step::new().set("active", true).start("10 s").stop("20 s"))
        .unwrap();
    proto
}

#[tokio::test(start_paused = true)]
async fn strict_apply_failure_stops_the_run() {
    let (app, p, d) = broken_rig();
    let mut proto = broken_protocol(&app, p, d);
    let exp = Experiment::new(&proto).unwrap();

    let t0 = Instant::now();
    let err = execute(&mut proto, &exp, &ExecuteOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(&err, ExecError::Apply { component, .. } if component == "D"));
    assert_eq!(Instant::now() - t0, Duration::from_secs(10));
    let records = exp.executed();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, RecordKind::Executed);
    assert_eq!(exp.outcome(), Some(Outcome::Failed));
    assert_eq!(proto.state(), RunState::Failed);
    assert!(proto.was_executed());
    assert_eq!(rate_of(&app, p).await, 0.0);
}

#[traced_test]
#[tokio::test(start_paused = true)]
async fn lenient_apply_failure_is_logged() {
    let (app, p, d) = broken_rig();
    let mut proto = broken_protocol(&app, p, d);
    let exp = Experiment::new(&proto).unwrap();

    execute(&mut proto, &exp, &ExecuteOptions::default().lenient())
        .await
        .unwrap();

    let kinds: Vec<_> = exp
        .executed()
        .iter()
        .map(|r| (r.component.clone(), r.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("P".to_string(), RecordKind::Executed),
            ("D".to_string(), RecordKind::Failed),
            ("D".to_string(), RecordKind::Executed),
            ("P".to_string(), RecordKind::Executed),
        ]
    );
    assert!(logs_contain("Failed to apply new state to D"));
    assert_eq!(exp.outcome(), Some(Outcome::Completed));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_pending_instructions() {
    let (app, p) = pump_rig();
    let mut proto = Protocol::new(&app);
    proto
        .add(p, Step::new().set("rate", "10 mL/min").start("0 s").stop("100 s"))
        .unwrap();
    proto
        .add(p, Step::new().set("rate", "5 mL/min").start("200 s").stop("300 s"))
        .unwrap();
    let exp = Experiment::new(&proto).unwrap();
    let control = exp.control();

    let t0 = Instant::now();
    let opts = ExecuteOptions::dry_run(DryRun::Simulate);
    let (result, ()) = tokio::join!(execute(&mut proto, &exp, &opts), async {
        sleep(Duration::from_secs(150)).await;
        control.cancel();
    });

    assert!(matches!(result, Err(ExecError::Cancelled)));
    assert_eq!(Instant::now() - t0, Duration::from_secs(150));
    assert!(exp.executed().len() <= 2);
    assert_eq!(exp.outcome(), Some(Outcome::Cancelled));
    assert!(exp.is_ended());
    assert!(proto.was_executed());
}

#[tokio::test(start_paused = true)]
async fn pause_parks_components_and_stops_the_clock() {
    let (app, p) = pump_rig();
    let mut proto = Protocol::new(&app);
    proto
        .add(p, Step::new().set("rate", "10 mL/min").start("0 s").stop("100 s"))
        .unwrap();
    let exp = Experiment::new(&proto).unwrap();
    let control = exp.control();

    let t0 = Instant::now();
    let opts = ExecuteOptions::default();
    let observer = async {
        sleep(Duration::from_secs(50)).await;
        control.pause();
        sleep(Duration::from_secs(10)).await;
        let parked = rate_of(&app, p).await;
        sleep(Duration::from_secs(20)).await;
        control.resume();
        sleep(Duration::from_secs(10)).await;
        let restored = rate_of(&app, p).await;
        (parked, restored)
    };
    let (result, (parked, restored)) = tokio::join!(execute(&mut proto, &exp, &opts), observer);

    result.unwrap();
    assert_eq!(parked, 0.0);
    assert!(restored > 0.0);
    assert_eq!(Instant::now() - t0, Duration::from_secs(130));
    let records = exp.executed();
    assert_eq!(records.len(), 2);
    assert!((records[1].eet - 100.0).abs() < 1e-6);
    assert_eq!(exp.pause_offset(), Duration::from_secs(30));
}

#[traced_test]
#[tokio::test(start_paused = true)]
async fn fast_forward_ignores_pause() {
    let (app, p) = pump_rig();
    let mut proto = Protocol::new(&app);
    proto
        .add(p, Step::new().set("rate", "10 mL/min").duration("100 s"))
        .unwrap();
    let exp = Experiment::new(&proto).unwrap();
    let control = exp.control();

    let t0 = Instant::now();
    let opts = ExecuteOptions::dry_run(DryRun::FastForward(10));
    let (result, ()) = tokio::join!(execute(&mut proto, &exp, &opts), async {
        sleep(Duration::from_secs(2)).await;
        control.pause();
    });

    result.unwrap();
    assert!(!exp.is_paused());
    assert_eq!(Instant::now() - t0, Duration::from_secs(10));
    assert!(logs_contain("has no effect"));
}

#[tokio::test(start_paused = true)]
async fn fast_forward_records_elapsed_wall_time() {
    let mut b = ApparatusBuilder::new("ff rig");
    let p = b.add_active(Pump::new("P1"));
    let s = b.add_active(DummySensor::new("S"));
    let app = b.build().unwrap();
    let mut proto = Protocol::new(&app);
    proto
        .add(p, Step::new().set("rate", "10 mL/min").duration("100 s"))
        .unwrap();
    proto
        .add(s, Step::new().set("rate", "0.1 Hz").duration("100 s"))
        .unwrap();
    let exp = Experiment::new(&proto).unwrap();

    let t0 = Instant::now();
    execute(
        &mut proto,
        &exp,
        &ExecuteOptions::dry_run(DryRun::FastForward(10)),
    )
    .await
    .unwrap();
    assert_eq!(Instant::now() - t0, Duration::from_secs(10));

    let records = exp.executed();
    let last = records.iter().map(|r| r.eet).fold(0.0, f64::max);
    assert!((last - 10.0).abs() < 1e-6, "last eet {last}");

    // one sample every 10 s of protocol time is one per wall-clock second
    let points = exp.datapoints("S");
    assert_eq!(points.len(), 10);
    for (i, point) in points.iter().enumerate() {
        assert!((point.eet - i as f64).abs() < 1e-6, "{point:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn devices_are_acquired_in_order_and_released_in_reverse() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut b = ApparatusBuilder::new("recorders");
    let a = b.add_active(Recorder::new("A", &events));
    b.add_active(Recorder::new("B", &events));
    let app = b.build().unwrap();

    let mut proto = Protocol::new(&app);
    proto
        .add(a, Step::new().set("active", true).duration("1 s"))
        .unwrap();
    let exp = Experiment::new(&proto).unwrap();
    execute(&mut proto, &exp, &ExecuteOptions::default())
        .await
        .unwrap();

    let events = events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "acquire A",
            "apply A",
            "acquire B",
            "apply B",
            "apply A",
            "apply A",
            "release B",
            "release A",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_acquire_releases_what_was_acquired() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut b = ApparatusBuilder::new("recorders");
    let a = b.add_active(Recorder::new("A", &events));
    let mut broken = Recorder::new("B", &events);
    broken.fail_acquire = true;
    b.add_active(broken);
    let app = b.build().unwrap();

    let mut proto = Protocol::new(&app);
    proto
        .add(a, Step::new().set("active", true).duration("1 s"))
        .unwrap();
    let exp = Experiment::new(&proto).unwrap();
    let err = execute(&mut proto, &exp, &ExecuteOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(&err, ExecError::Acquire { component, .. } if component == "B"));
    assert_eq!(
        *events.lock().unwrap(),
        vec!["acquire A", "apply A", "release A"]
    );
    assert_eq!(exp.outcome(), Some(Outcome::Failed));
    assert_eq!(proto.state(), RunState::Failed);
    assert!(exp.executed().is_empty());
}

fn broken_sensor_protocol(app: &Apparatus, s: ComponentId) -> Protocol<'_> {
    let mut proto = Protocol::new(app);
    proto
        .add(s, Step::new().set("rate", "10 Hz").start("0 s").stop("3 s"))
        .unwrap();
    proto
}

#[tokio::test(start_paused = true)]
async fn strict_read_failure_stops_the_run() {
    let mut b = ApparatusBuilder::new("sensor rig");
    let s = b.add_active(BrokenSensor::new("B"));
    let app = b.build().unwrap();
    let mut proto = broken_sensor_protocol(&app, s);
    let exp = Experiment::new(&proto).unwrap();

    let err = execute(&mut proto, &exp, &ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::Read { .. }));
    // one read is spent on the preflight check
    assert_eq!(exp.datapoints("B").len(), BROKEN_SENSOR_READS as usize - 1);
}

#[tokio::test(start_paused = true)]
async fn lenient_read_failure_ends_only_that_monitor() {
    let mut b = ApparatusBuilder::new("sensor rig");
    let s = b.add_active(BrokenSensor::new("B"));
    let app = b.build().unwrap();
    let mut proto = broken_sensor_protocol(&app, s);
    let exp = Experiment::new(&proto).unwrap();

    let t0 = Instant::now();
    execute(&mut proto, &exp, &ExecuteOptions::default().lenient())
        .await
        .unwrap();
    assert_eq!(Instant::now() - t0, Duration::from_secs(3));
    assert_eq!(exp.datapoints("B").len(), BROKEN_SENSOR_READS as usize - 1);
    assert_eq!(exp.executed().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn sinks_receive_data_and_log_lines() {
    let (app, s) = sensor_rig();
    let dir = tempfile::tempdir().unwrap();
    let mut proto = Protocol::new(&app);
    proto
        .add(s, Step::new().set("rate", "2 Hz").duration("2 s"))
        .unwrap();
    let exp = Experiment::new(&proto).unwrap();
    let opts = ExecuteOptions {
        data_file: Some(dir.path().join("data.jsonl")),
        log_file: Some(dir.path().join("log.jsonl")),
        ..ExecuteOptions::dry_run(DryRun::Simulate)
    };

    execute(&mut proto, &exp, &opts).await.unwrap();

    let data: Vec<rf_results::DataRecord> = read_jsonl(&dir.path().join("data.jsonl")).unwrap();
    assert_eq!(data.len(), exp.datapoints("S").len());
    assert_eq!(data.len(), 4);
    assert!(data.iter().all(|r| r.device == "S" && r.unit == "bar"));

    let log: Vec<LogRecord> = read_jsonl(&dir.path().join("log.jsonl")).unwrap();
    assert!(log.iter().any(|r| r.message.contains("completed")));
    assert!(log.iter().any(|r| r.message.starts_with("[dry run] Set S")));
}

#[tokio::test(start_paused = true)]
async fn executed_protocols_must_be_reset() {
    let (app, p) = pump_rig();
    let mut proto = Protocol::new(&app);
    proto
        .add(p, Step::new().set("rate", "1 mL/min").duration("1 s"))
        .unwrap();
    let opts = ExecuteOptions::dry_run(DryRun::Simulate);

    let first = Experiment::new(&proto).unwrap();
    execute(&mut proto, &first, &opts).await.unwrap();

    let second = Experiment::new(&proto).unwrap();
    assert!(matches!(
        execute(&mut proto, &second, &opts).await,
        Err(ExecError::AlreadyExecuted)
    ));
    assert!(matches!(
        execute(&mut Protocol::new(&app), &first, &opts).await,
        Err(ExecError::ExperimentEnded { .. })
    ));

    proto.reset();
    execute(&mut proto, &second, &opts).await.unwrap();
    assert_eq!(second.executed().len(), 2);
}

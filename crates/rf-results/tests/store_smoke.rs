use chrono::{Duration, TimeZone, Utc};
use rf_apparatus::ApparatusBuilder;
use rf_components::{Pump, Reading, params};
use rf_protocol::{Protocol, Step};
use rf_results::*;

fn manifest(id: &str, minutes: i64) -> ExperimentManifest {
    let created = Utc.with_ymd_and_hms(2026, 2, 25, 12, 0, 0).unwrap() + Duration::minutes(minutes);
    ExperimentManifest {
        experiment_id: id.to_string(),
        protocol: "Protocol_0".to_string(),
        apparatus: "rig".to_string(),
        created,
        start_time: Some(created),
        end_time: Some(created + Duration::seconds(300)),
        outcome: Some(Outcome::Completed),
        duration_s: 300.0,
        dry_run: true,
        executed: vec![ExecutionRecord {
            component: "P1".to_string(),
            params: params([("rate", "10 mL/min")]),
            timestamp: created,
            eet: 0.0,
            kind: RecordKind::Simulated,
        }],
    }
}

#[test]
fn save_and_load_experiment() {
    let dir = tempfile::tempdir().unwrap();
    let store = ExperimentStore::new(dir.path().join("experiments")).unwrap();
    let m = manifest("exp_1", 0);
    store.save_manifest(&m).unwrap();

    let mut data = store.data_sink("exp_1").unwrap();
    let point = Datapoint {
        value: Reading::Number(1.5),
        timestamp: m.created,
        eet: 0.2,
    };
    data.append(&DataRecord::new("S1", "bar", &point)).unwrap();
    data.append(&DataRecord::new("S1", "bar", &point)).unwrap();

    assert!(store.has_experiment("exp_1"));
    assert_eq!(store.load_manifest("exp_1").unwrap(), m);
    let records = store.load_data("exp_1").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].device, "S1");
    assert_eq!(records[0].value, Reading::Number(1.5));
    assert!(store.load_log("exp_1").unwrap().is_empty());
}

#[test]
fn list_is_ordered_and_delete_removes() {
    let dir = tempfile::tempdir().unwrap();
    let store = ExperimentStore::new(dir.path().to_path_buf()).unwrap();
    store.save_manifest(&manifest("late", 10)).unwrap();
    store.save_manifest(&manifest("early", 0)).unwrap();
    std::fs::create_dir_all(dir.path().join("not_an_experiment")).unwrap();

    let ids: Vec<_> = store
        .list()
        .unwrap()
        .into_iter()
        .map(|m| m.experiment_id)
        .collect();
    assert_eq!(ids, vec!["early", "late"]);

    store.delete("early").unwrap();
    assert!(!store.has_experiment("early"));
    assert!(matches!(
        store.load_manifest("early"),
        Err(ResultsError::ExperimentNotFound { .. })
    ));
}

#[test]
fn store_lives_beside_the_protocol() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("protocol.yaml");
    let store = ExperimentStore::for_protocol(&path).unwrap();
    assert_eq!(store.root(), dir.path().join(".reflux").join("experiments"));
    assert!(store.root().is_dir());
}

#[test]
fn experiment_id_follows_the_protocol() {
    let mut b = ApparatusBuilder::new("rig");
    let p = b.add_active(Pump::new("P1"));
    let app = b.build().unwrap();
    let created = Utc::now();

    let mut one = Protocol::new(&app);
    one.add(p, Step::new().set("rate", "10 mL/min").duration("5 min"))
        .unwrap();
    let mut two = Protocol::new(&app);
    two.add(p, Step::new().set("rate", "5 mL/min").duration("5 min"))
        .unwrap();

    let a = experiment_id(&one, created).unwrap();
    assert_eq!(a, experiment_id(&one, created).unwrap());
    assert_ne!(a, experiment_id(&two, created).unwrap());
    assert!(a.ends_with(&protocol_hash(&one.canonical_json().unwrap())));
}

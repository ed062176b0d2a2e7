//! Integration tests for rf-components driven through trait objects.

use rf_components::{
    ActiveComponent, BrokenDummy, DummySensor, Params, Pump, TempControl, Tube, Valve,
    ValveMapping, Value, params, validate_component,
};
use rf_core::ComponentId;

fn stdlib() -> Vec<Box<dyn ActiveComponent>> {
    let tube = Tube::new("2 m", "1 mm", "1.6 mm", "PFA").unwrap();
    vec![
        Box::new(Pump::new("pump")),
        Box::new(Valve::new(
            "valve",
            ValveMapping::from([(ComponentId::from_index(0), 1)]),
        )),
        Box::new(TempControl::new("heater").with_internal_tubing(tube)),
        Box::new(DummySensor::new("ir")),
        Box::new(BrokenDummy::new("broken")),
    ]
}

#[test]
fn every_stdlib_base_state_validates() {
    for component in stdlib() {
        let coerced = validate_component(component.as_ref())
            .unwrap_or_else(|e| panic!("{} failed: {e}", component.name()));
        assert_eq!(coerced.len(), component.base_state().len());
    }
}

#[tokio::test]
async fn base_state_applies_through_trait_objects() {
    for mut component in stdlib() {
        component.acquire().await.unwrap();
        let base = component.base_state();
        component.update_from_params(&base).unwrap();
        component.apply().await.unwrap();
        component.release().await.unwrap();
    }
}

#[tokio::test]
async fn snapshot_then_restore_round_trips() {
    let mut heater = TempControl::new("heater");
    heater
        .update_from_params(&params([
            ("temp", Value::from("80 degC")),
            ("active", Value::from(true)),
        ]))
        .unwrap();
    let snap: Params = heater.snapshot();

    let base = heater.base_state();
    heater.update_from_params(&base).unwrap();
    assert!(!heater.state().active);

    heater.update_from_params(&snap).unwrap();
    heater.apply().await.unwrap();
    assert!(heater.state().active);
    assert_eq!(heater.state().temp.to_string(), "80 degC");
}

#[tokio::test]
async fn sensors_read_through_the_readable_capability() {
    let mut sensor: Box<dyn ActiveComponent> = Box::new(DummySensor::new("uv"));
    let readable = sensor.readable_mut().unwrap();
    assert!(readable.rate().is_zero());
    assert!(readable.read().await.unwrap().is_valid());

    let pump: Box<dyn ActiveComponent> = Box::new(Pump::new("p"));
    assert!(pump.readable().is_none());
}

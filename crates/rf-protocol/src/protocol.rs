//! Protocol assembly.

use std::fmt;

use rf_apparatus::{ActiveEntry, Apparatus, ComponentEntry};
use rf_components::{ComponentKind, Params, Value};
use rf_core::units::deg_c;
use rf_core::ComponentId;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ProtocolError, ProtocolResult};
use crate::procedure::{Procedure, Step, Target, Targets, TimeArg, schedulable};

/// How long the protocol runs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum ProtocolDuration {
    /// Inferred from procedure stops when needed.
    #[default]
    Unset,
    /// The latest procedure stop, computed before compiling.
    Auto,
    /// Seconds.
    Fixed(f64),
}

impl ProtocolDuration {
    /// `"auto"` or a time quantity.
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        if text.trim().eq_ignore_ascii_case("auto") {
            return Ok(ProtocolDuration::Auto);
        }
        TimeArg::from(text)
            .seconds("duration")
            .map(ProtocolDuration::Fixed)
    }
}

impl fmt::Display for ProtocolDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolDuration::Unset => f.write_str("unset"),
            ProtocolDuration::Auto => f.write_str("auto"),
            ProtocolDuration::Fixed(secs) => write!(f, "{secs} s"),
        }
    }
}

/// Lifecycle of a protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Defined,
    Compiled,
    Acquiring,
    Running,
    Stopping,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Defined => "defined",
            RunState::Compiled => "compiled",
            RunState::Acquiring => "acquiring",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// An ordered list of procedures over one apparatus.
#[derive(Debug)]
pub struct Protocol<'a> {
    apparatus: &'a Apparatus,
    name: String,
    description: Option<String>,
    duration: ProtocolDuration,
    procedures: Vec<Procedure>,
    state: RunState,
    executed: bool,
}

impl<'a> Protocol<'a> {
    /// A protocol named `Protocol_N`, counting per apparatus.
    pub fn new(apparatus: &'a Apparatus) -> Self {
        Self {
            apparatus,
            name: apparatus.names().next("Protocol"),
            description: None,
            duration: ProtocolDuration::Unset,
            procedures: Vec::new(),
            state: RunState::Defined,
            executed: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_duration(mut self, duration: ProtocolDuration) -> Self {
        self.duration = duration;
        self
    }

    pub fn apparatus(&self) -> &'a Apparatus {
        self.apparatus
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn duration(&self) -> ProtocolDuration {
        self.duration
    }

    pub fn set_duration(&mut self, duration: ProtocolDuration) {
        self.duration = duration;
    }

    pub fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn set_state(&mut self, state: RunState) {
        debug!("Protocol '{}' is now {}", self.name, state);
        self.state = state;
        if matches!(state, RunState::Done | RunState::Failed) {
            self.executed = true;
        }
    }

    pub fn was_executed(&self) -> bool {
        self.executed
    }

    pub fn is_executing(&self) -> bool {
        matches!(
            self.state,
            RunState::Acquiring | RunState::Running | RunState::Stopping
        )
    }

    /// Clear the executed flag so the protocol can run again.
    pub fn reset(&mut self) {
        self.executed = false;
        self.state = RunState::Defined;
    }

    pub fn clear_procedures(&mut self) -> ProtocolResult<()> {
        if self.executed {
            return Err(ProtocolError::AlreadyExecuted);
        }
        self.procedures.clear();
        Ok(())
    }

    /// Add one procedure per target. Either every target is added or none is.
    pub fn add(&mut self, targets: impl Into<Targets>, step: Step) -> ProtocolResult<()> {
        let targets = targets.into();
        let mut staged = Vec::with_capacity(targets.0.len());
        for target in &targets.0 {
            let entry = self.resolve(target)?;
            staged.push(self.build_procedure(entry, &step)?);
        }
        self.procedures.extend(staged);
        Ok(())
    }

    fn resolve(&self, target: &Target) -> ProtocolResult<&'a ActiveEntry> {
        let not_found = |component: String| ProtocolError::NotInApparatus {
            component,
            apparatus: self.apparatus.name().to_string(),
        };
        let id = match target {
            Target::Id(id) => *id,
            Target::Name(name) => self
                .apparatus
                .id_of(name)
                .ok_or_else(|| not_found(name.clone()))?,
        };
        match self.apparatus.component(id) {
            Some(ComponentEntry::Active(entry)) => Ok(entry),
            Some(passive) => Err(ProtocolError::NotActive {
                component: passive.name().to_string(),
            }),
            None => Err(not_found(format!("component #{id}"))),
        }
    }

    fn build_procedure(&self, entry: &ActiveEntry, step: &Step) -> ProtocolResult<Procedure> {
        let info = &entry.info;
        let component = info.name.clone();
        let mut params = step.params.clone();

        if info.kind == ComponentKind::Valve {
            if let Some(setting) = params.get("setting") {
                let port = self.valve_port(entry, setting)?;
                params.insert("setting".to_string(), Value::Int(port));
            }
        }

        if params.is_empty() {
            return Err(ProtocolError::EmptyParams { component });
        }

        let mut coerced = Params::new();
        for (attr, value) in &params {
            let spec = info.spec(attr).ok_or_else(|| ProtocolError::Attribute {
                component: component.clone(),
                source: rf_components::attributes::unknown_attribute(attr, info.specs),
            })?;
            let value = spec
                .kind
                .coerce(attr, value)
                .map_err(|source| ProtocolError::Attribute {
                    component: component.clone(),
                    source,
                })?;
            coerced.insert(attr.clone(), value);
        }

        if step.stop.is_some() && step.duration.is_some() {
            return Err(ProtocolError::StopAndDuration);
        }
        let start = step
            .start
            .as_ref()
            .map(|t| t.seconds("start"))
            .transpose()?;
        let stop = match (&step.duration, &step.stop) {
            (Some(d), _) => Some(schedulable(
                start.unwrap_or(0.0) + d.seconds("duration")?,
                "stop",
            )?),
            (None, Some(s)) => Some(s.seconds("stop")?),
            (None, None) => None,
        };
        if let Some(stop) = stop {
            let begin = start.unwrap_or(0.0);
            if begin > stop {
                return Err(ProtocolError::StartAfterStop {
                    component,
                    start: begin,
                    stop,
                });
            }
        }

        if info.kind == ComponentKind::TempControl {
            temp_control_defaults(&component, &mut coerced)?;
        }

        trace!("Adding procedure for {component}: {start:?}..{stop:?}");
        Ok(Procedure {
            component: entry.id,
            start,
            stop,
            params: coerced,
        })
    }

    /// Normalize a valve `setting` to a port number from the valve's mapping.
    fn valve_port(&self, entry: &ActiveEntry, setting: &Value) -> ProtocolResult<i64> {
        let invalid = || ProtocolError::InvalidValveSetting {
            valve: entry.info.name.clone(),
            setting: setting.to_string(),
        };
        let Some(mapping) = &entry.info.mapping else {
            return match setting {
                Value::Int(port) => Ok(*port),
                _ => Err(invalid()),
            };
        };
        match setting {
            Value::Component(id) => mapping.get(id).copied().ok_or_else(invalid),
            Value::Text(name) => mapping
                .iter()
                .find(|(id, _)| self.apparatus.name_of(**id) == Some(name.as_str()))
                .map(|(_, port)| *port)
                .ok_or_else(invalid),
            Value::Int(port) if mapping.values().any(|p| p == port) => Ok(*port),
            _ => Err(invalid()),
        }
    }

    pub(crate) fn name_of(&self, id: ComponentId) -> String {
        self.apparatus
            .name_of(id)
            .map_or_else(|| format!("component #{id}"), str::to_string)
    }
}

/// `temp` without `active` switches the controller on; switching it off
/// without a `temp` parks the setpoint at 0 °C.
fn temp_control_defaults(component: &str, params: &mut Params) -> ProtocolResult<()> {
    let has_temp = params.contains_key("temp");
    match params.get("active").and_then(Value::as_bool) {
        None if has_temp => {
            params.insert("active".to_string(), Value::Bool(true));
        }
        None | Some(false) if !has_temp => {
            params.insert("temp".to_string(), Value::Quantity(deg_c(0.0)));
        }
        Some(true) if !has_temp => {
            return Err(ProtocolError::TempWithoutSetpoint {
                component: component.to_string(),
            });
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_apparatus::ApparatusBuilder;
    use rf_components::{
        ComponentError, DummySensor, PassiveComponent, Pump, TempControl, Valve, ValveMapping,
    };

    struct Rig {
        app: Apparatus,
        pump_a: ComponentId,
        pump_b: ComponentId,
        valve: ComponentId,
        heater: ComponentId,
        flask: ComponentId,
    }

    fn rig() -> Rig {
        let mut b = ApparatusBuilder::new("rig");
        let pump_a = b.add_active(Pump::new("pumpA"));
        let pump_b = b.add_active(Pump::new("pumpB"));
        let valve = b.add_active(Valve::new(
            "V",
            ValveMapping::from([(pump_a, 1), (pump_b, 2)]),
        ));
        let heater = b.add_active(TempControl::new("heater"));
        b.add_active(DummySensor::new("ir"));
        let flask = b.add_passive(PassiveComponent::vessel("flask", ""));
        Rig {
            app: b.build().unwrap(),
            pump_a,
            pump_b,
            valve,
            heater,
            flask,
        }
    }

    #[test]
    fn defaults_and_duration() {
        let r = rig();
        let mut p = Protocol::new(&r.app);
        assert_eq!(p.name(), "Protocol_0");
        p.add(r.pump_a, Step::new().set("rate", "10 mL/min").duration("5 min"))
            .unwrap();

        let proc = &p.procedures()[0];
        assert_eq!(proc.start, None);
        assert_eq!(proc.stop, Some(300.0));
        assert!(matches!(proc.params["rate"], Value::Quantity(_)));
        assert_eq!(Protocol::new(&r.app).name(), "Protocol_1");
    }

    #[test]
    fn stop_and_duration_are_exclusive() {
        let r = rig();
        let mut p = Protocol::new(&r.app);
        let err = p
            .add(
                r.pump_a,
                Step::new().set("rate", "1 mL/min").stop("1 min").duration("1 min"),
            )
            .unwrap_err();
        assert!(matches!(err, ProtocolError::StopAndDuration));
    }

    #[test]
    fn start_after_stop_fails() {
        let r = rig();
        let mut p = Protocol::new(&r.app);
        let err = p
            .add(
                r.pump_a,
                Step::new().set("rate", "1 mL/min").start("2 min").stop("1 min"),
            )
            .unwrap_err();
        assert!(matches!(err, ProtocolError::StartAfterStop { .. }));
    }

    #[test]
    fn configuration_errors() {
        let r = rig();
        let mut p = Protocol::new(&r.app);

        let err = p.add(r.pump_a, Step::new()).unwrap_err();
        assert!(matches!(err, ProtocolError::EmptyParams { .. }));

        let err = p.add(r.pump_a, Step::new().set("speed", "1 mL/min")).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Attribute {
                source: ComponentError::UnknownAttribute { .. },
                ..
            }
        ));

        let err = p.add(r.pump_a, Step::new().set("rate", "1 mL")).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Attribute {
                source: ComponentError::DimensionMismatch { .. },
                ..
            }
        ));

        let err = p.add("ghost", Step::new().set("rate", "1 mL/min")).unwrap_err();
        assert!(matches!(err, ProtocolError::NotInApparatus { .. }));

        let err = p.add(r.flask, Step::new().set("rate", "1 mL/min")).unwrap_err();
        assert!(matches!(err, ProtocolError::NotActive { .. }));

        assert!(p.procedures().is_empty());
    }

    #[test]
    fn add_is_atomic_across_targets() {
        let r = rig();
        let mut p = Protocol::new(&r.app);
        p.add([r.pump_a, r.pump_b], Step::new().set("rate", "1 mL/min"))
            .unwrap();
        assert_eq!(p.procedures().len(), 2);

        let err = p
            .add([r.pump_a, r.heater], Step::new().set("rate", "1 mL/min"))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Attribute { .. }));
        assert_eq!(p.procedures().len(), 2);
    }

    #[test]
    fn valve_settings_normalize_to_ports() {
        let r = rig();
        let mut p = Protocol::new(&r.app);
        p.add(r.valve, Step::new().set("setting", r.pump_a)).unwrap();
        p.add(r.valve, Step::new().set("setting", "pumpB")).unwrap();
        p.add(r.valve, Step::new().set("setting", 2)).unwrap();
        let settings: Vec<_> = p
            .procedures()
            .iter()
            .map(|proc| proc.params["setting"].clone())
            .collect();
        assert_eq!(settings, vec![Value::Int(1), Value::Int(2), Value::Int(2)]);

        for bad in [Value::Int(7), Value::from("flask"), Value::from(r.heater)] {
            let err = p.add(r.valve, Step::new().set("setting", bad)).unwrap_err();
            assert!(matches!(err, ProtocolError::InvalidValveSetting { .. }));
        }
    }

    #[test]
    fn temp_control_sugar() {
        let r = rig();
        let mut p = Protocol::new(&r.app);

        p.add(r.heater, Step::new().set("temp", "60 degC")).unwrap();
        assert_eq!(p.procedures()[0].params["active"], Value::Bool(true));

        p.add(r.heater, Step::new().set("active", false)).unwrap();
        assert_eq!(
            p.procedures()[1].params["temp"],
            Value::Quantity(deg_c(0.0))
        );

        let err = p.add(r.heater, Step::new().set("active", true)).unwrap_err();
        assert!(matches!(err, ProtocolError::TempWithoutSetpoint { .. }));
    }

    #[test]
    fn executed_protocols_keep_their_procedures() {
        let r = rig();
        let mut p = Protocol::new(&r.app);
        p.add(r.pump_a, Step::new().set("rate", "1 mL/min")).unwrap();
        p.set_state(RunState::Done);
        assert!(p.was_executed());
        assert!(matches!(
            p.clear_procedures(),
            Err(ProtocolError::AlreadyExecuted)
        ));
        p.reset();
        p.clear_procedures().unwrap();
        assert!(p.procedures().is_empty());
    }

    #[test]
    fn duration_parsing() {
        assert_eq!(ProtocolDuration::parse("auto").unwrap(), ProtocolDuration::Auto);
        assert_eq!(
            ProtocolDuration::parse("2 min").unwrap(),
            ProtocolDuration::Fixed(120.0)
        );
        assert!(ProtocolDuration::parse("2 mL").is_err());
    }
}

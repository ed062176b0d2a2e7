//! Typed attribute records for each component variant.
//!
//! Components keep their settable state in a small record and expose it by
//! name through [`Attributes`], so protocol parameters (`{"rate": "5 mL/min"}`)
//! can be checked and applied without reflection.

use rf_core::units::{deg_c, hz, ml_per_min};
use rf_core::{Dimension, Quantity};

use crate::error::{ComponentError, ComponentResult};
use crate::value::{AttrKind, AttrSpec, Params, Value};

/// Name-addressed access to a component's settable state.
pub trait Attributes: Send {
    /// Declared attributes, in display order.
    fn specs(&self) -> &'static [AttrSpec];

    fn get(&self, attr: &str) -> Option<Value>;

    /// Store a value that already passed [`AttrKind::coerce`].
    fn set_coerced(&mut self, attr: &str, value: Value) -> ComponentResult<()>;

    fn spec(&self, attr: &str) -> ComponentResult<&'static AttrSpec> {
        let specs = self.specs();
        specs
            .iter()
            .find(|s| s.name == attr)
            .ok_or_else(|| unknown_attribute(attr, specs))
    }

    fn set(&mut self, attr: &str, value: &Value) -> ComponentResult<()> {
        let coerced = self.spec(attr)?.kind.coerce(attr, value)?;
        self.set_coerced(attr, coerced)
    }

    /// Apply every entry of `params`, or none of them if any is invalid.
    fn update_from_params(&mut self, params: &Params) -> ComponentResult<()> {
        let mut staged = Vec::with_capacity(params.len());
        for (attr, value) in params {
            let coerced = self.spec(attr)?.kind.coerce(attr, value)?;
            staged.push((attr.as_str(), coerced));
        }
        for (attr, value) in staged {
            self.set_coerced(attr, value)?;
        }
        Ok(())
    }

    /// Current value of every attribute.
    fn snapshot(&self) -> Params {
        self.specs()
            .iter()
            .filter_map(|s| self.get(s.name).map(|v| (s.name.to_string(), v)))
            .collect()
    }
}

pub fn unknown_attribute(attr: &str, specs: &[AttrSpec]) -> ComponentError {
    ComponentError::UnknownAttribute {
        attr: attr.to_string(),
        valid: specs
            .iter()
            .map(|s| s.name)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn rejected(specs: &[AttrSpec], attr: &str, value: &Value) -> ComponentError {
    match specs.iter().find(|s| s.name == attr) {
        Some(spec) => ComponentError::TypeMismatch {
            attr: attr.to_string(),
            expected: spec.kind.name(),
            found: value.kind_name(),
        },
        None => unknown_attribute(attr, specs),
    }
}

/// Pump: volumetric flow rate.
#[derive(Debug, Clone, PartialEq)]
pub struct PumpState {
    pub rate: Quantity,
}

impl PumpState {
    pub const SPECS: &'static [AttrSpec] =
        &[AttrSpec::new("rate", AttrKind::Quantity(Dimension::FLOW_RATE))];
}

impl Default for PumpState {
    fn default() -> Self {
        Self {
            rate: ml_per_min(0.0),
        }
    }
}

impl Attributes for PumpState {
    fn specs(&self) -> &'static [AttrSpec] {
        Self::SPECS
    }

    fn get(&self, attr: &str) -> Option<Value> {
        match attr {
            "rate" => Some(Value::Quantity(self.rate.clone())),
            _ => None,
        }
    }

    fn set_coerced(&mut self, attr: &str, value: Value) -> ComponentResult<()> {
        match (attr, value) {
            ("rate", Value::Quantity(q)) => {
                self.rate = q;
                Ok(())
            }
            (attr, value) => Err(rejected(Self::SPECS, attr, &value)),
        }
    }
}

/// Valve: selected port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValveState {
    pub setting: i64,
}

impl ValveState {
    pub const SPECS: &'static [AttrSpec] = &[AttrSpec::new("setting", AttrKind::Int)];
}

impl Default for ValveState {
    fn default() -> Self {
        Self { setting: 1 }
    }
}

impl Attributes for ValveState {
    fn specs(&self) -> &'static [AttrSpec] {
        Self::SPECS
    }

    fn get(&self, attr: &str) -> Option<Value> {
        match attr {
            "setting" => Some(Value::Int(self.setting)),
            _ => None,
        }
    }

    fn set_coerced(&mut self, attr: &str, value: Value) -> ComponentResult<()> {
        match (attr, value) {
            ("setting", Value::Int(i)) => {
                self.setting = i;
                Ok(())
            }
            (attr, value) => Err(rejected(Self::SPECS, attr, &value)),
        }
    }
}

/// Temperature controller: setpoint and on/off.
#[derive(Debug, Clone, PartialEq)]
pub struct TempControlState {
    pub temp: Quantity,
    pub active: bool,
}

impl TempControlState {
    pub const SPECS: &'static [AttrSpec] = &[
        AttrSpec::new("temp", AttrKind::Quantity(Dimension::TEMPERATURE)),
        AttrSpec::new("active", AttrKind::Bool),
    ];
}

impl Default for TempControlState {
    fn default() -> Self {
        Self {
            temp: deg_c(0.0),
            active: false,
        }
    }
}

impl Attributes for TempControlState {
    fn specs(&self) -> &'static [AttrSpec] {
        Self::SPECS
    }

    fn get(&self, attr: &str) -> Option<Value> {
        match attr {
            "temp" => Some(Value::Quantity(self.temp.clone())),
            "active" => Some(Value::Bool(self.active)),
            _ => None,
        }
    }

    fn set_coerced(&mut self, attr: &str, value: Value) -> ComponentResult<()> {
        match (attr, value) {
            ("temp", Value::Quantity(q)) => self.temp = q,
            ("active", Value::Bool(b)) => self.active = b,
            (attr, value) => return Err(rejected(Self::SPECS, attr, &value)),
        }
        Ok(())
    }
}

/// Sensor: sampling rate, where 0 Hz means off.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorState {
    pub rate: Quantity,
}

impl SensorState {
    pub const SPECS: &'static [AttrSpec] =
        &[AttrSpec::new("rate", AttrKind::Quantity(Dimension::FREQUENCY))];
}

impl Default for SensorState {
    fn default() -> Self {
        Self { rate: hz(0.0) }
    }
}

impl Attributes for SensorState {
    fn specs(&self) -> &'static [AttrSpec] {
        Self::SPECS
    }

    fn get(&self, attr: &str) -> Option<Value> {
        match attr {
            "rate" => Some(Value::Quantity(self.rate.clone())),
            _ => None,
        }
    }

    fn set_coerced(&mut self, attr: &str, value: Value) -> ComponentResult<()> {
        match (attr, value) {
            ("rate", Value::Quantity(q)) => {
                self.rate = q;
                Ok(())
            }
            (attr, value) => Err(rejected(Self::SPECS, attr, &value)),
        }
    }
}

/// Generic on/off switch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchState {
    pub active: bool,
}

impl SwitchState {
    pub const SPECS: &'static [AttrSpec] = &[AttrSpec::new("active", AttrKind::Bool)];
}

impl Attributes for SwitchState {
    fn specs(&self) -> &'static [AttrSpec] {
        Self::SPECS
    }

    fn get(&self, attr: &str) -> Option<Value> {
        match attr {
            "active" => Some(Value::Bool(self.active)),
            _ => None,
        }
    }

    fn set_coerced(&mut self, attr: &str, value: Value) -> ComponentResult<()> {
        match (attr, value) {
            ("active", Value::Bool(b)) => {
                self.active = b;
                Ok(())
            }
            (attr, value) => Err(rejected(Self::SPECS, attr, &value)),
        }
    }
}

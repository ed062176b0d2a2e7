//! Driver contracts for active components.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use rf_core::{ComponentId, Quantity};
use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;
use crate::error::ComponentResult;
use crate::value::Params;

/// Variant tag of an active component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Pump,
    Valve,
    TempControl,
    Sensor,
    Dummy,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentKind::Pump => "pump",
            ComponentKind::Valve => "valve",
            ComponentKind::TempControl => "temp_control",
            ComponentKind::Sensor => "sensor",
            ComponentKind::Dummy => "dummy",
        };
        f.write_str(s)
    }
}

/// Valve port table: component -> port number.
pub type ValveMapping = BTreeMap<ComponentId, i64>;

/// One sensor datapoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Text(String),
}

impl Reading {
    /// NaN and empty strings count as "no value".
    pub fn is_valid(&self) -> bool {
        match self {
            Reading::Number(x) => !x.is_nan(),
            Reading::Text(t) => !t.is_empty(),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Number(x) => write!(f, "{x}"),
            Reading::Text(t) => f.write_str(t),
        }
    }
}

/// A device with settable state.
///
/// Implementors keep their attributes in a typed record, declare the state
/// they return to when idle, and push the current attributes to hardware in
/// [`apply`](ActiveComponent::apply). Any resource the device holds (a serial
/// port, a socket) is opened in `acquire` and closed in `release`; the
/// executor pairs the two on every exit path of a real run.
#[async_trait]
pub trait ActiveComponent: Send + fmt::Debug {
    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    fn kind(&self) -> ComponentKind;

    fn attributes(&self) -> &dyn Attributes;

    fn attributes_mut(&mut self) -> &mut dyn Attributes;

    /// Idle assignment. Must be non-empty and name existing attributes.
    fn base_state(&self) -> Params;

    /// Port table, for valves.
    fn mapping(&self) -> Option<&ValveMapping> {
        None
    }

    async fn acquire(&mut self) -> ComponentResult<()> {
        Ok(())
    }

    async fn release(&mut self) -> ComponentResult<()> {
        Ok(())
    }

    /// Push the current attribute values to the device.
    async fn apply(&mut self) -> ComponentResult<()>;

    fn readable(&self) -> Option<&dyn Readable> {
        None
    }

    fn readable_mut(&mut self) -> Option<&mut dyn Readable> {
        None
    }

    fn update_from_params(&mut self, params: &Params) -> ComponentResult<()> {
        self.attributes_mut().update_from_params(params)
    }

    fn snapshot(&self) -> Params {
        self.attributes().snapshot()
    }
}

/// A component that produces datapoints.
#[async_trait]
pub trait Readable: Send {
    /// Unit label attached to every reading.
    fn unit(&self) -> &str;

    /// Sampling rate; zero means off.
    fn rate(&self) -> Quantity;

    async fn read(&mut self) -> ComponentResult<Reading>;
}

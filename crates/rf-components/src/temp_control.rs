//! Simulated temperature controller.

use async_trait::async_trait;
use tracing::debug;

use crate::attributes::{Attributes, TempControlState};
use crate::error::ComponentResult;
use crate::traits::{ActiveComponent, ComponentKind};
use crate::tube::Tube;
use crate::value::{Params, Value, params};

/// Heats or cools a coil of tubing.
#[derive(Debug, Clone)]
pub struct TempControl {
    name: String,
    state: TempControlState,
    internal_tubing: Option<Tube>,
}

impl TempControl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: TempControlState::default(),
            internal_tubing: None,
        }
    }

    /// Tubing coiled inside the controller (a reactor coil, for instance).
    pub fn with_internal_tubing(mut self, tube: Tube) -> Self {
        self.internal_tubing = Some(tube);
        self
    }

    pub fn internal_tubing(&self) -> Option<&Tube> {
        self.internal_tubing.as_ref()
    }

    pub fn state(&self) -> &TempControlState {
        &self.state
    }
}

#[async_trait]
impl ActiveComponent for TempControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::TempControl
    }

    fn attributes(&self) -> &dyn Attributes {
        &self.state
    }

    fn attributes_mut(&mut self) -> &mut dyn Attributes {
        &mut self.state
    }

    fn base_state(&self) -> Params {
        params([("temp", Value::from("0 degC")), ("active", Value::from(false))])
    }

    async fn apply(&mut self) -> ComponentResult<()> {
        if self.state.active {
            debug!("TempControl '{}' holding {}", self.name, self.state.temp);
        } else {
            debug!("TempControl '{}' off", self.name);
        }
        Ok(())
    }
}

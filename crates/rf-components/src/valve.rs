//! Simulated selector valve.

use async_trait::async_trait;
use rf_core::ComponentId;
use tracing::debug;

use crate::attributes::{Attributes, ValveState};
use crate::error::ComponentResult;
use crate::traits::{ActiveComponent, ComponentKind, ValveMapping};
use crate::value::{Params, params};

/// A multi-port valve. `mapping` says which port each neighbouring component
/// is plumbed into.
#[derive(Debug, Clone)]
pub struct Valve {
    name: String,
    state: ValveState,
    mapping: ValveMapping,
}

impl Valve {
    pub fn new(name: impl Into<String>, mapping: ValveMapping) -> Self {
        Self {
            name: name.into(),
            state: ValveState::default(),
            mapping,
        }
    }

    pub fn setting(&self) -> i64 {
        self.state.setting
    }

    /// Port of `component`, if it is plumbed into this valve.
    pub fn port_of(&self, component: ComponentId) -> Option<i64> {
        self.mapping.get(&component).copied()
    }
}

#[async_trait]
impl ActiveComponent for Valve {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Valve
    }

    fn attributes(&self) -> &dyn Attributes {
        &self.state
    }

    fn attributes_mut(&mut self) -> &mut dyn Attributes {
        &mut self.state
    }

    fn base_state(&self) -> Params {
        params([("setting", 1)])
    }

    fn mapping(&self) -> Option<&ValveMapping> {
        Some(&self.mapping)
    }

    async fn apply(&mut self) -> ComponentResult<()> {
        debug!("Valve '{}' switched to port {}", self.name, self.state.setting);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_is_exposed() {
        let a = ComponentId::from_index(0);
        let b = ComponentId::from_index(1);
        let valve = Valve::new("V", ValveMapping::from([(a, 1), (b, 2)]));
        assert_eq!(valve.port_of(b), Some(2));
        assert_eq!(valve.port_of(ComponentId::from_index(5)), None);
        assert_eq!(valve.mapping().map(|m| m.len()), Some(2));
        assert_eq!(valve.setting(), 1);
    }
}

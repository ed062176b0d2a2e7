//! Simulated pump.

use async_trait::async_trait;
use rf_core::Quantity;
use tracing::debug;

use crate::attributes::{Attributes, PumpState};
use crate::error::ComponentResult;
use crate::traits::{ActiveComponent, ComponentKind};
use crate::value::{Params, params};

/// A pump that only logs the rate it is set to.
#[derive(Debug, Clone)]
pub struct Pump {
    name: String,
    state: PumpState,
    applied: usize,
}

impl Pump {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: PumpState::default(),
            applied: 0,
        }
    }

    pub fn rate(&self) -> &Quantity {
        &self.state.rate
    }

    /// Number of completed `apply` calls.
    pub fn applied(&self) -> usize {
        self.applied
    }
}

#[async_trait]
impl ActiveComponent for Pump {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Pump
    }

    fn attributes(&self) -> &dyn Attributes {
        &self.state
    }

    fn attributes_mut(&mut self) -> &mut dyn Attributes {
        &mut self.state
    }

    fn base_state(&self) -> Params {
        params([("rate", "0 mL/min")])
    }

    async fn apply(&mut self) -> ComponentResult<()> {
        self.applied += 1;
        debug!("Pump '{}' rate set to {}", self.name, self.state.rate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_component;

    #[tokio::test]
    async fn apply_counts_calls() {
        let mut pump = Pump::new("P1");
        pump.update_from_params(&params([("rate", "10 mL/min")]))
            .unwrap();
        pump.apply().await.unwrap();
        assert_eq!(pump.applied(), 1);
        assert_eq!(pump.rate().to_string(), "10 mL/min");
    }

    #[test]
    fn base_state_validates() {
        assert!(validate_component(&Pump::new("P1")).is_ok());
    }
}

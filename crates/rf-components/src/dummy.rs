//! On/off test components.

use async_trait::async_trait;
use tracing::debug;

use crate::attributes::{Attributes, SwitchState};
use crate::error::{ComponentError, ComponentResult};
use crate::traits::{ActiveComponent, ComponentKind};
use crate::value::{Params, params};

/// A switch with no hardware behind it.
#[derive(Debug, Clone)]
pub struct Dummy {
    name: String,
    state: SwitchState,
}

impl Dummy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: SwitchState::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }
}

#[async_trait]
impl ActiveComponent for Dummy {
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

    async fn apply(&mut self) -> ComponentResult<()> {
        debug!(
            "Dummy '{}' {}",
            self.name,
            if self.state.active { "active" } else { "inactive" }
        );
        Ok(())
    }
}

/// A switch whose `apply` fails whenever it is active.
#[derive(Debug, Clone)]
pub struct BrokenDummy {
    inner: Dummy,
}

impl BrokenDummy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Dummy::new(name),
        }
    }
}

#[async_trait]
impl ActiveComponent for BrokenDummy {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn set_name(&mut self, name: String) {
        self.inner.set_name(name);
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Dummy
    }

    fn attributes(&self) -> &dyn Attributes {
        &self.inner.state
    }

    fn attributes_mut(&mut self) -> &mut dyn Attributes {
        &mut self.inner.state
    }

    fn base_state(&self) -> Params {
        self.inner.base_state()
    }

    async fn apply(&mut self) -> ComponentResult<()> {
        if self.inner.is_active() {
            return Err(ComponentError::Device {
                message: format!("'{}' refused to activate", self.inner.name),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broken_dummy_fails_when_active() {
        let mut d = BrokenDummy::new("bad");
        d.apply().await.unwrap();
        d.update_from_params(&params([("active", true)])).unwrap();
        assert!(d.apply().await.is_err());
    }
}

//! Simulated sensors.

use async_trait::async_trait;
use rf_core::Quantity;
use tracing::trace;

use crate::attributes::{Attributes, SensorState};
use crate::error::{ComponentError, ComponentResult};
use crate::traits::{ActiveComponent, ComponentKind, Readable, Reading};
use crate::value::{Params, params};

/// Reads after which [`BrokenSensor`] starts failing.
pub const BROKEN_SENSOR_READS: u64 = 15;

/// A sensor that reports how many times it has been read.
#[derive(Debug, Clone)]
pub struct DummySensor {
    name: String,
    state: SensorState,
    unit: String,
    reads: u64,
}

impl DummySensor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: SensorState::default(),
            unit: "dimensionless".to_string(),
            reads: 0,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }
}

#[async_trait]
impl ActiveComponent for DummySensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Sensor
    }

    fn attributes(&self) -> &dyn Attributes {
        &self.state
    }

    fn attributes_mut(&mut self) -> &mut dyn Attributes {
        &mut self.state
    }

    fn base_state(&self) -> Params {
        params([("rate", "0 Hz")])
    }

    async fn apply(&mut self) -> ComponentResult<()> {
        Ok(())
    }

    fn readable(&self) -> Option<&dyn Readable> {
        Some(self)
    }

    fn readable_mut(&mut self) -> Option<&mut dyn Readable> {
        Some(self)
    }
}

#[async_trait]
impl Readable for DummySensor {
    fn unit(&self) -> &str {
        &self.unit
    }

    fn rate(&self) -> Quantity {
        self.state.rate.clone()
    }

    async fn read(&mut self) -> ComponentResult<Reading> {
        self.reads += 1;
        trace!("DummySensor '{}' read #{}", self.name, self.reads);
        Ok(Reading::Number(self.reads as f64))
    }
}

/// Like [`DummySensor`], but fails once it has been read more than
/// [`BROKEN_SENSOR_READS`] times while sampling.
#[derive(Debug, Clone)]
pub struct BrokenSensor {
    inner: DummySensor,
}

impl BrokenSensor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: DummySensor::new(name),
        }
    }
}

#[async_trait]
impl ActiveComponent for BrokenSensor {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn set_name(&mut self, name: String) {
        self.inner.name = name;
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Sensor
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
        Ok(())
    }

    fn readable(&self) -> Option<&dyn Readable> {
        Some(self)
    }

    fn readable_mut(&mut self) -> Option<&mut dyn Readable> {
        Some(self)
    }
}

#[async_trait]
impl Readable for BrokenSensor {
    fn unit(&self) -> &str {
        &self.inner.unit
    }

    fn rate(&self) -> Quantity {
        self.inner.state.rate.clone()
    }

    async fn read(&mut self) -> ComponentResult<Reading> {
        let reading = self.inner.read().await?;
        if self.inner.reads > BROKEN_SENSOR_READS && !self.inner.state.rate.is_zero() {
            return Err(ComponentError::Device {
                message: format!("sensor '{}' is broken", self.inner.name),
            });
        }
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dummy_sensor_counts_reads() {
        let mut s = DummySensor::new("S");
        assert_eq!(s.read().await.unwrap(), Reading::Number(1.0));
        assert_eq!(s.read().await.unwrap(), Reading::Number(2.0));
        assert_eq!(s.reads(), 2);
        assert!(s.rate().is_zero());
    }

    #[tokio::test]
    async fn broken_sensor_fails_only_while_sampling() {
        let mut s = BrokenSensor::new("B");
        for _ in 0..20 {
            s.read().await.unwrap();
        }

        s.update_from_params(&params([("rate", "5 Hz")])).unwrap();
        assert!(matches!(
            s.read().await,
            Err(ComponentError::Device { .. })
        ));
    }

    #[test]
    fn sensors_are_readable() {
        let s = DummySensor::new("S").with_unit("mAU");
        assert_eq!(s.readable().map(|r| r.unit().to_string()), Some("mAU".into()));
    }
}

//! rf-components: component model for flow chemistry apparatus.
//!
//! Provides:
//! - `Value`, `Params` and `AttrSpec` for name-addressed attribute assignment
//! - typed state records (`PumpState`, `ValveState`, ...) behind `Attributes`
//! - the `ActiveComponent` and `Readable` driver traits
//! - base-state validation
//! - passive parts (vessels, mixers) and `Tube`
//! - simulated devices for dry runs and tests
//!
//! # Example
//!
//! ```
//! use rf_components::{ActiveComponent, Pump, params};
//!
//! let mut pump = Pump::new("P1");
//! pump.update_from_params(&params([("rate", "10 mL/min")])).unwrap();
//! assert_eq!(pump.rate().to_string(), "10 mL/min");
//! ```

pub mod attributes;
pub mod dummy;
pub mod error;
pub mod passive;
pub mod pump;
pub mod sensor;
pub mod temp_control;
pub mod traits;
pub mod tube;
pub mod validate;
pub mod valve;
pub mod value;

// Re-exports
pub use attributes::{
    Attributes, PumpState, SensorState, SwitchState, TempControlState, ValveState,
};
pub use dummy::{BrokenDummy, Dummy};
pub use error::{ComponentError, ComponentResult};
pub use passive::{MixerShape, PassiveComponent};
pub use pump::Pump;
pub use sensor::{BROKEN_SENSOR_READS, BrokenSensor, DummySensor};
pub use temp_control::TempControl;
pub use traits::{ActiveComponent, ComponentKind, Readable, Reading, ValveMapping};
pub use tube::Tube;
pub use validate::{ValidationFailure, ValidationRule, validate_base_state, validate_component};
pub use valve::Valve;
pub use value::{AttrKind, AttrSpec, Params, Value, params};

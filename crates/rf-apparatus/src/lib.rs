//! rf-apparatus: the apparatus a protocol runs on.
//!
//! Provides:
//! - `ApparatusBuilder` for incremental construction with validation
//! - the immutable `Apparatus` (components, connections, adjacency)
//! - per-apparatus default naming
//! - YAML apparatus files
//! - summary tables and prose descriptions
//!
//! # Example
//!
//! ```
//! use rf_apparatus::ApparatusBuilder;
//! use rf_components::{PassiveComponent, Pump, Tube};
//!
//! let mut builder = ApparatusBuilder::new("demo");
//! let pump = builder.add_active(Pump::new("P1"));
//! let flask = builder.add_passive(PassiveComponent::vessel("flask", "product"));
//! builder.connect(pump, flask, Tube::new("1 m", "1 mm", "1.6 mm", "PFA").unwrap());
//! let apparatus = builder.build().unwrap();
//!
//! assert_eq!(apparatus.active_components().count(), 1);
//! assert_eq!(apparatus.id_of("flask"), Some(flask));
//! ```

pub mod apparatus;
pub mod builder;
pub mod error;
pub mod names;
pub mod schema;
pub mod summary;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use apparatus::{ActiveEntry, Apparatus, ComponentEntry, ComponentInfo, Connection};
pub use builder::ApparatusBuilder;
pub use error::{ApparatusError, ApparatusResult};
pub use names::NameGenerator;
pub use schema::{
    ApparatusDef, ComponentDef, ConnectionDef, Endpoints, TubeDef, build_apparatus, from_yaml_str,
    load_yaml,
};

//! rf-core: stable foundation for reflux.
//!
//! Contains:
//! - units (unit-aware `Quantity` with dimensional analysis)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for apparatus objects)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{RfError, RfResult};
pub use ids::*;
pub use numeric::*;
pub use units::{Dimension, Quantity, UnitError, UnitExpr, UnitResult};

//! Tubing between two components.

use core::f64::consts::PI;

use rf_core::{Dimension, Quantity};
use serde::Serialize;
use tracing::warn;

use crate::error::{ComponentError, ComponentResult};

/// A length of tubing. Every measurement is a length; `volume` is derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tube {
    pub length: Quantity,
    pub inner_diameter: Quantity,
    pub outer_diameter: Quantity,
    pub material: String,
    /// Internal volume, in mL.
    pub volume: Quantity,
}

impl Tube {
    /// Build from quantity strings such as `"3 ft"` or `"0.04 in"`.
    pub fn new(
        length: &str,
        inner_diameter: &str,
        outer_diameter: &str,
        material: impl Into<String>,
    ) -> ComponentResult<Self> {
        Self::from_quantities(
            parse_length("length", length)?,
            parse_length("inner_diameter", inner_diameter)?,
            parse_length("outer_diameter", outer_diameter)?,
            material,
        )
    }

    pub fn from_quantities(
        length: Quantity,
        inner_diameter: Quantity,
        outer_diameter: Quantity,
        material: impl Into<String>,
    ) -> ComponentResult<Self> {
        for (attr, q) in [
            ("length", &length),
            ("inner_diameter", &inner_diameter),
            ("outer_diameter", &outer_diameter),
        ] {
            ensure_length(attr, q)?;
            if q.value() <= 0.0 {
                return Err(ComponentError::InvalidTube {
                    reason: format!("{attr} must be positive, got {q}"),
                });
            }
        }

        if outer_diameter <= inner_diameter {
            return Err(ComponentError::InvalidTube {
                reason: format!(
                    "outer diameter ({outer_diameter}) must be greater than inner diameter ({inner_diameter})"
                ),
            });
        }
        if length < outer_diameter || length < inner_diameter {
            warn!(
                "Tube length ({length}) is less than diameter. Make sure that this is not in error."
            );
        }

        let volume = tube_volume(&length, &inner_diameter)?;
        Ok(Self {
            length,
            inner_diameter,
            outer_diameter,
            material: material.into(),
            volume,
        })
    }
}

fn unit_err(attr: &str) -> impl FnOnce(rf_core::UnitError) -> ComponentError + '_ {
    move |source| ComponentError::Unit {
        attr: attr.to_string(),
        source,
    }
}

fn parse_length(attr: &str, text: &str) -> ComponentResult<Quantity> {
    let q = Quantity::parse(text).map_err(unit_err(attr))?;
    ensure_length(attr, &q)?;
    Ok(q)
}

fn ensure_length(attr: &str, q: &Quantity) -> ComponentResult<()> {
    if q.dimension() == Dimension::LENGTH {
        Ok(())
    } else {
        Err(ComponentError::DimensionMismatch {
            attr: attr.to_string(),
            expected: Dimension::LENGTH,
            found: q.dimension(),
        })
    }
}

/// π (ID/2)² L, in mL.
fn tube_volume(length: &Quantity, inner_diameter: &Quantity) -> ComponentResult<Quantity> {
    let radius = inner_diameter.clone() * 0.5;
    let volume = radius
        .powi(2)
        .and_then(|area| area.try_mul(length))
        .and_then(|v| v.convert_to("mL"))
        .map_err(unit_err("volume"))?;
    Ok(volume * PI)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_of_a_metre_of_one_mm_tubing() {
        let tube = Tube::new("1 m", "1 mm", "1.6 mm", "PFA").unwrap();
        assert_eq!(tube.volume.unit().text(), "mL");
        assert!((tube.volume.value() - PI / 4.0).abs() < 1e-9);
    }

    #[test]
    fn mixed_units_are_fine() {
        let tube = Tube::new("3 ft", "0.04 in", "0.0625 in", "PFA").unwrap();
        assert!(tube.volume.value() > 0.7 && tube.volume.value() < 0.75);
    }

    #[test]
    fn outer_must_exceed_inner() {
        let err = Tube::new("1 m", "2 mm", "1 mm", "PFA").unwrap_err();
        assert!(matches!(err, ComponentError::InvalidTube { .. }));
        assert!(Tube::new("1 m", "1 mm", "1 mm", "PFA").is_err());
    }

    #[test]
    fn non_lengths_are_rejected() {
        let err = Tube::new("1 mL", "1 mm", "2 mm", "PFA").unwrap_err();
        match err {
            ComponentError::DimensionMismatch { attr, .. } => assert_eq!(attr, "length"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

//! Physical dimensions as exponent vectors over the base quantities.

use core::fmt;
use core::ops::{Div, Mul};

/// Exponents of length, mass, time and temperature.
///
/// Volume is `length^3`, flow rate `length^3 / time`, frequency `1 / time`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub temperature: i8,
}

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension::new(0, 0, 0, 0);
    pub const LENGTH: Dimension = Dimension::new(1, 0, 0, 0);
    pub const MASS: Dimension = Dimension::new(0, 1, 0, 0);
    pub const TIME: Dimension = Dimension::new(0, 0, 1, 0);
    pub const TEMPERATURE: Dimension = Dimension::new(0, 0, 0, 1);
    pub const VOLUME: Dimension = Dimension::new(3, 0, 0, 0);
    pub const FLOW_RATE: Dimension = Dimension::new(3, 0, -1, 0);
    pub const FREQUENCY: Dimension = Dimension::new(0, 0, -1, 0);

    pub const fn new(length: i8, mass: i8, time: i8, temperature: i8) -> Self {
        Self {
            length,
            mass,
            time,
            temperature,
        }
    }

    pub fn is_dimensionless(self) -> bool {
        self == Self::DIMENSIONLESS
    }

    pub fn powi(self, n: i8) -> Self {
        Self::new(
            self.length * n,
            self.mass * n,
            self.time * n,
            self.temperature * n,
        )
    }

    fn exponents(self) -> [(&'static str, i8); 4] {
        [
            ("length", self.length),
            ("mass", self.mass),
            ("time", self.time),
            ("temperature", self.temperature),
        ]
    }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Dimension) -> Dimension {
        Dimension::new(
            self.length + rhs.length,
            self.mass + rhs.mass,
            self.time + rhs.time,
            self.temperature + rhs.temperature,
        )
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Dimension) -> Dimension {
        self * rhs.powi(-1)
    }
}

/// Renders like `[length]^3 / [time]`.
impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }

        let render = |terms: Vec<(&str, i8)>| -> String {
            terms
                .into_iter()
                .map(|(name, exp)| {
                    if exp == 1 {
                        format!("[{name}]")
                    } else {
                        format!("[{name}]^{exp}")
                    }
                })
                .collect::<Vec<_>>()
                .join(" * ")
        };

        let numerator: Vec<_> = self
            .exponents()
            .into_iter()
            .filter(|&(_, e)| e > 0)
            .collect();
        let denominator: Vec<_> = self
            .exponents()
            .into_iter()
            .filter(|&(_, e)| e < 0)
            .map(|(n, e)| (n, -e))
            .collect();

        if numerator.is_empty() {
            write!(f, "1")?;
        } else {
            write!(f, "{}", render(numerator))?;
        }
        if !denominator.is_empty() {
            write!(f, " / {}", render(denominator))?;
        }
        Ok(())
    }
}

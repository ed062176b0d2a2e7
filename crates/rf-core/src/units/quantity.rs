//! Unit-aware scalar values.
//!
//! A `Quantity` keeps the magnitude exactly as entered ("5 mL/min") next to a
//! parsed unit expression. Comparisons and arithmetic happen on the canonical
//! base magnitude, so `1 min == 60 s`.

use core::cmp::Ordering;
use core::fmt;
use core::ops::Mul;
use core::str::FromStr;
use std::time::Duration;

use super::registry::{self, UnitDef};
use super::{Dimension, UnitError, UnitResult};
use crate::numeric::{Tolerances, nearly_equal};

/// A parsed unit expression such as `mL/min` or `cm^3`.
#[derive(Clone, Debug)]
pub struct UnitExpr {
    text: String,
    dimension: Dimension,
    factor: f64,
    offset: f64,
}

impl UnitExpr {
    /// The empty unit (plain numbers).
    pub fn dimensionless() -> Self {
        Self {
            text: String::new(),
            dimension: Dimension::DIMENSIONLESS,
            factor: 1.0,
            offset: 0.0,
        }
    }

    /// The base unit of `dimension`: cm, g, s and K, with mL for volume.
    pub fn base(dimension: Dimension) -> Self {
        let text = match dimension {
            Dimension::TIME => "s".to_string(),
            Dimension::VOLUME => "mL".to_string(),
            Dimension::FLOW_RATE => "mL/s".to_string(),
            Dimension::FREQUENCY => "Hz".to_string(),
            Dimension::TEMPERATURE => "K".to_string(),
            Dimension::LENGTH => "cm".to_string(),
            Dimension::MASS => "g".to_string(),
            other => base_text(other),
        };
        Self {
            text,
            dimension,
            factor: 1.0,
            offset: 0.0,
        }
    }

    /// Parse a unit expression built from `*`, `/` and `^n`.
    ///
    /// Offset units (°C, °F) are only accepted on their own.
    pub fn parse(input: &str) -> UnitResult<Self> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .replace("**", "^")
            .replace('·', "*");
        if compact.is_empty() {
            return Ok(Self::dimensionless());
        }

        let mut terms: Vec<(bool, &str)> = Vec::new();
        let mut divide = false;
        let mut begin = 0;
        for (i, c) in compact.char_indices() {
            if c == '*' || c == '/' {
                terms.push((divide, &compact[begin..i]));
                divide = c == '/';
                begin = i + c.len_utf8();
            }
        }
        terms.push((divide, &compact[begin..]));

        let mut expr = Self::dimensionless();
        let mut text = String::new();
        let single = terms.len() == 1;

        for (index, (divide, term)) in terms.into_iter().enumerate() {
            if term.is_empty() {
                return Err(UnitError::Parse {
                    input: input.to_string(),
                    reason: "empty unit term",
                });
            }
            let (name, exponent) = split_exponent(input, term)?;
            let signed = if divide { -exponent } else { exponent };

            let (symbol, dimension, factor, offset) = if name == "1" {
                ("1", Dimension::DIMENSIONLESS, 1.0, 0.0)
            } else {
                let def: &UnitDef =
                    registry::lookup(name).ok_or_else(|| UnitError::UnknownUnit {
                        unit: name.to_string(),
                    })?;
                (def.symbol, def.dimension, def.factor, def.offset)
            };

            if offset != 0.0 {
                if !single || exponent != 1 {
                    return Err(UnitError::OffsetUnit {
                        unit: symbol.to_string(),
                        what: "a compound unit",
                    });
                }
                expr.offset = offset;
            }

            expr.dimension = expr.dimension * dimension.powi(signed);
            expr.factor *= factor.powi(i32::from(signed));

            if index > 0 {
                text.push(if divide { '/' } else { '*' });
            } else if divide {
                return Err(UnitError::Parse {
                    input: input.to_string(),
                    reason: "unit expression starts with an operator",
                });
            }
            text.push_str(symbol);
            if exponent != 1 {
                text.push('^');
                text.push_str(&exponent.to_string());
            }
        }

        expr.text = text;
        Ok(expr)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn is_offset(&self) -> bool {
        self.offset != 0.0
    }

    fn to_base(&self, value: f64) -> f64 {
        value * self.factor + self.offset
    }

    fn from_base(&self, base: f64) -> f64 {
        (base - self.offset) / self.factor
    }
}

impl PartialEq for UnitExpr {
    fn eq(&self, other: &Self) -> bool {
        self.dimension == other.dimension
            && nearly_equal(self.factor, other.factor, Tolerances::default())
            && nearly_equal(self.offset, other.offset, Tolerances::default())
    }
}

fn base_text(dimension: Dimension) -> String {
    let symbols = [
        ("cm", dimension.length),
        ("g", dimension.mass),
        ("s", dimension.time),
        ("K", dimension.temperature),
    ];
    let mut text = String::new();
    for (symbol, exp) in symbols.iter().filter(|(_, e)| *e > 0) {
        if !text.is_empty() {
            text.push('*');
        }
        text.push_str(symbol);
        if *exp != 1 {
            text.push_str(&format!("^{exp}"));
        }
    }
    for (symbol, exp) in symbols.iter().filter(|(_, e)| *e < 0) {
        if text.is_empty() {
            text.push('1');
        }
        text.push('/');
        text.push_str(symbol);
        if *exp != -1 {
            text.push_str(&format!("^{}", -exp));
        }
    }
    text
}

fn split_exponent<'a>(input: &str, term: &'a str) -> UnitResult<(&'a str, i8)> {
    match term.split_once('^') {
        None => Ok((term, 1)),
        Some((name, exp)) => {
            let exponent = exp.parse::<i8>().map_err(|_| UnitError::Parse {
                input: input.to_string(),
                reason: "exponent must be a small integer",
            })?;
            if name.is_empty() || exponent == 0 {
                return Err(UnitError::Parse {
                    input: input.to_string(),
                    reason: "invalid exponent term",
                });
            }
            Ok((name, exponent))
        }
    }
}

/// Split "12.5 mL/min" into the leading number and the unit text.
fn split_number(input: &str) -> UnitResult<(f64, &str)> {
    let s = input.trim();
    let end = s
        .char_indices()
        .find(|&(i, c)| {
            !(c.is_ascii_digit()
                || c == '.'
                || c == '+'
                || c == '-'
                || ((c == 'e' || c == 'E') && i > 0))
        })
        .map_or(s.len(), |(i, _)| i);

    // the scanned prefix is ASCII, so stepping back one byte at a time is safe
    let mut cut = end;
    while cut > 0 {
        if let Ok(value) = s[..cut].parse::<f64>() {
            return Ok((value, s[cut..].trim()));
        }
        cut -= 1;
    }
    Err(UnitError::Parse {
        input: input.to_string(),
        reason: "expected a leading number",
    })
}

/// Magnitude plus unit.
#[derive(Clone, Debug)]
pub struct Quantity {
    value: f64,
    unit: UnitExpr,
}

impl Quantity {
    /// Build from a magnitude and a unit expression string.
    pub fn new(value: f64, unit: &str) -> UnitResult<Self> {
        Self::from_parts(value, UnitExpr::parse(unit)?)
    }

    pub fn from_parts(value: f64, unit: UnitExpr) -> UnitResult<Self> {
        if !value.is_finite() {
            return Err(UnitError::NonFinite { value });
        }
        Ok(Self { value, unit })
    }

    /// Zero in the base unit of `dimension`.
    pub fn zero(dimension: Dimension) -> Self {
        Self {
            value: 0.0,
            unit: UnitExpr::base(dimension),
        }
    }

    /// Infallible constructor for registry units named in code. Falls back to
    /// the base unit of `dimension` if `unit` does not describe it, and to zero
    /// for non-finite magnitudes.
    pub(crate) fn known(value: f64, unit: &str, dimension: Dimension) -> Self {
        let unit = UnitExpr::parse(unit)
            .ok()
            .filter(|u| u.dimension == dimension)
            .unwrap_or_else(|| UnitExpr::base(dimension));
        let value = if value.is_finite() { value } else { 0.0 };
        Self { value, unit }
    }

    pub fn dimensionless(value: f64) -> UnitResult<Self> {
        Self::from_parts(value, UnitExpr::dimensionless())
    }

    /// Parse "number unit-expression", e.g. `"5 mL/min"` or `"25 °C"`.
    pub fn parse(input: &str) -> UnitResult<Self> {
        let (value, unit) = split_number(input)?;
        Self::new(value, unit)
    }

    pub fn from_seconds(secs: f64) -> UnitResult<Self> {
        Self::new(secs, "s")
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self {
            value: duration.as_secs_f64(),
            unit: UnitExpr {
                text: "s".to_string(),
                dimension: Dimension::TIME,
                factor: 1.0,
                offset: 0.0,
            },
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &UnitExpr {
        &self.unit
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension
    }

    /// Magnitude in base units (s, mL, Hz, K, g, cm).
    pub fn base_value(&self) -> f64 {
        self.unit.to_base(self.value)
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }

    pub fn ensure_dimension(&self, expected: Dimension) -> UnitResult<()> {
        if self.dimension() == expected {
            Ok(())
        } else {
            Err(UnitError::DimensionMismatch {
                expected,
                found: self.dimension(),
            })
        }
    }

    /// Express this quantity in another unit of the same dimension.
    pub fn convert_to(&self, unit: &str) -> UnitResult<Quantity> {
        let target = UnitExpr::parse(unit)?;
        self.ensure_dimension(target.dimension)?;
        let value = target.from_base(self.base_value());
        Self::from_parts(value, target)
    }

    /// Time quantities only: the magnitude in seconds.
    pub fn seconds(&self) -> UnitResult<f64> {
        self.ensure_dimension(Dimension::TIME)?;
        Ok(self.base_value())
    }

    pub fn to_duration(&self) -> UnitResult<Duration> {
        let secs = self.seconds()?;
        if secs < 0.0 {
            return Err(UnitError::Negative { value: secs });
        }
        Duration::try_from_secs_f64(secs).map_err(|_| UnitError::TooLong { value: secs })
    }

    fn ensure_linear(&self, what: &'static str) -> UnitResult<()> {
        if self.unit.is_offset() {
            Err(UnitError::OffsetUnit {
                unit: self.unit.text.clone(),
                what,
            })
        } else {
            Ok(())
        }
    }

    /// Sum expressed in `self`'s unit.
    pub fn try_add(&self, other: &Quantity) -> UnitResult<Quantity> {
        self.ensure_dimension(other.dimension())?;
        self.ensure_linear("addition")?;
        other.ensure_linear("addition")?;
        let value = self.value + other.base_value() / self.unit.factor;
        Self::from_parts(value, self.unit.clone())
    }

    /// Difference expressed in `self`'s unit.
    pub fn try_sub(&self, other: &Quantity) -> UnitResult<Quantity> {
        self.ensure_dimension(other.dimension())?;
        self.ensure_linear("subtraction")?;
        other.ensure_linear("subtraction")?;
        let value = self.value - other.base_value() / self.unit.factor;
        Self::from_parts(value, self.unit.clone())
    }

    pub fn try_mul(&self, other: &Quantity) -> UnitResult<Quantity> {
        self.ensure_linear("multiplication")?;
        other.ensure_linear("multiplication")?;
        let unit = UnitExpr {
            text: join_units(&self.unit.text, '*', &other.unit.text),
            dimension: self.dimension() * other.dimension(),
            factor: self.unit.factor * other.unit.factor,
            offset: 0.0,
        };
        Self::from_parts(self.value * other.value, unit)
    }

    pub fn try_div(&self, other: &Quantity) -> UnitResult<Quantity> {
        self.ensure_linear("division")?;
        other.ensure_linear("division")?;
        let unit = UnitExpr {
            text: join_units(&self.unit.text, '/', &other.unit.text),
            dimension: self.dimension() / other.dimension(),
            factor: self.unit.factor / other.unit.factor,
            offset: 0.0,
        };
        Self::from_parts(self.value / other.value, unit)
    }

    pub fn powi(&self, n: i8) -> UnitResult<Quantity> {
        self.ensure_linear("exponentiation")?;
        let text = match (self.unit.text.is_empty(), n) {
            (true, _) | (false, 1) => self.unit.text.clone(),
            (false, _) if self.unit.text.contains(['*', '/']) => {
                format!("({})^{n}", self.unit.text)
            }
            (false, _) => format!("{}^{n}", self.unit.text),
        };
        let unit = UnitExpr {
            text,
            dimension: self.dimension().powi(n),
            factor: self.unit.factor.powi(i32::from(n)),
            offset: 0.0,
        };
        Self::from_parts(self.value.powi(i32::from(n)), unit)
    }

    /// Ordering on base magnitudes; fails across dimensions.
    pub fn try_cmp(&self, other: &Quantity) -> UnitResult<Ordering> {
        self.ensure_dimension(other.dimension())?;
        self.base_value()
            .partial_cmp(&other.base_value())
            .ok_or(UnitError::NonFinite { value: f64::NAN })
    }
}

fn join_units(lhs: &str, op: char, rhs: &str) -> String {
    match (lhs.is_empty(), rhs.is_empty()) {
        (_, true) => lhs.to_string(),
        (true, false) if op == '/' => format!("1/{rhs}"),
        (true, false) => rhs.to_string(),
        (false, false) => format!("{lhs}{op}{rhs}"),
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.dimension() == other.dimension()
            && nearly_equal(
                self.base_value(),
                other.base_value(),
                Tolerances::default(),
            )
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.dimension() != other.dimension() {
            return None;
        }
        if self == other {
            return Some(Ordering::Equal);
        }
        self.base_value().partial_cmp(&other.base_value())
    }
}

impl Mul<f64> for Quantity {
    type Output = Quantity;

    fn mul(mut self, rhs: f64) -> Quantity {
        self.value *= rhs;
        self
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.text.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} {}", self.value, self.unit.text)
        }
    }
}

impl FromStr for Quantity {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Quantity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Quantity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const UNITS: [&str; 8] = ["s", "min", "h", "mL/min", "uL/s", "Hz", "degC", "mm"];

    proptest! {
        #[test]
        fn display_then_parse_is_identity(
            value in -1.0e6_f64..1.0e6_f64,
            unit in prop::sample::select(UNITS.to_vec()),
        ) {
            let original = Quantity::new(value, unit).unwrap();
            let reparsed = Quantity::parse(&original.to_string()).unwrap();
            prop_assert_eq!(reparsed.unit().text(), original.unit().text());
            prop_assert!(reparsed == original);
        }

        #[test]
        fn time_conversion_preserves_seconds(secs in 0.0_f64..1.0e6_f64) {
            let original = Quantity::from_seconds(secs).unwrap();
            let minutes = original.convert_to("min").unwrap();
            let tol = Tolerances { abs: 1e-9, rel: 1e-12 };
            prop_assert!(nearly_equal(minutes.seconds().unwrap(), secs, tol));
        }
    }
}

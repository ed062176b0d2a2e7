//! Attribute values and the type descriptors used to check them.

use std::collections::BTreeMap;
use std::fmt;

use rf_core::{ComponentId, Dimension, Quantity};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ComponentError, ComponentResult};

/// A value assigned to a component attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Quantity(Quantity),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Another component of the apparatus. Only meaningful as a valve
    /// `setting`, and replaced by a port number before compilation.
    Component(ComponentId),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Quantity(_) => "quantity",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Component(_) => "component",
        }
    }

    pub fn as_quantity(&self) -> Option<&Quantity> {
        match self {
            Value::Quantity(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Quantity(q) => write!(f, "{q}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(t) => write!(f, "{t}"),
            Value::Component(id) => write!(f, "component #{id}"),
        }
    }
}

impl From<Quantity> for Value {
    fn from(q: Quantity) -> Self {
        Value::Quantity(q)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<ComponentId> for Value {
    fn from(id: ComponentId) -> Self {
        Value::Component(id)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Quantity(q) => serializer.collect_str(q),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(t) => serializer.serialize_str(t),
            Value::Component(_) => Err(serde::ser::Error::custom(
                "component references must be resolved before serialization",
            )),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Quantities come back as text; attribute coercion parses them.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawValue::deserialize(deserializer)? {
            RawValue::Bool(b) => Value::Bool(b),
            RawValue::Int(i) => Value::Int(i),
            RawValue::Float(x) => Value::Float(x),
            RawValue::Text(t) => Value::Text(t),
        })
    }
}

/// A partial attribute assignment, keyed by attribute name.
pub type Params = BTreeMap<String, Value>;

/// Build `Params` from `(name, value)` pairs.
pub fn params<K, V, I>(entries: I) -> Params
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// The declared type of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Quantity(Dimension),
    Bool,
    Int,
    Float,
    Text,
}

impl AttrKind {
    pub fn name(&self) -> &'static str {
        match self {
            AttrKind::Quantity(_) => "quantity",
            AttrKind::Bool => "bool",
            AttrKind::Int => "int",
            AttrKind::Float => "float",
            AttrKind::Text => "text",
        }
    }

    /// Check `value` against this kind, parsing quantity strings.
    ///
    /// Plain numbers given for a quantity attribute are dimensionless and only
    /// pass for dimensionless attributes.
    pub fn coerce(&self, attr: &str, value: &Value) -> ComponentResult<Value> {
        match (self, value) {
            (AttrKind::Quantity(dim), Value::Quantity(q)) => check_dimension(attr, *dim, q.clone()),
            (AttrKind::Quantity(dim), Value::Text(text)) => {
                let q = Quantity::parse(text).map_err(|source| ComponentError::Unit {
                    attr: attr.to_string(),
                    source,
                })?;
                check_dimension(attr, *dim, q)
            }
            (AttrKind::Quantity(dim), Value::Int(i)) => {
                dimensionless(attr, *i as f64).and_then(|q| check_dimension(attr, *dim, q))
            }
            (AttrKind::Quantity(dim), Value::Float(x)) => {
                dimensionless(attr, *x).and_then(|q| check_dimension(attr, *dim, q))
            }
            (AttrKind::Bool, Value::Bool(_))
            | (AttrKind::Int, Value::Int(_))
            | (AttrKind::Float, Value::Float(_))
            | (AttrKind::Text, Value::Text(_)) => Ok(value.clone()),
            (kind, value) => Err(ComponentError::TypeMismatch {
                attr: attr.to_string(),
                expected: kind.name(),
                found: value.kind_name(),
            }),
        }
    }
}

fn dimensionless(attr: &str, x: f64) -> ComponentResult<Quantity> {
    Quantity::dimensionless(x).map_err(|source| ComponentError::Unit {
        attr: attr.to_string(),
        source,
    })
}

fn check_dimension(attr: &str, expected: Dimension, q: Quantity) -> ComponentResult<Value> {
    if q.dimension() == expected {
        Ok(Value::Quantity(q))
    } else {
        Err(ComponentError::DimensionMismatch {
            attr: attr.to_string(),
            expected,
            found: q.dimension(),
        })
    }
}

/// Name and type of one settable attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub kind: AttrKind,
}

impl AttrSpec {
    pub const fn new(name: &'static str, kind: AttrKind) -> Self {
        Self { name, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: AttrKind = AttrKind::Quantity(Dimension::FLOW_RATE);

    #[test]
    fn quantity_strings_are_parsed() {
        let v = RATE.coerce("rate", &"5 ml/min".into()).unwrap();
        assert_eq!(v.as_quantity().unwrap().to_string(), "5 mL/min");
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let err = RATE.coerce("rate", &"5 mL".into()).unwrap_err();
        assert!(matches!(err, ComponentError::DimensionMismatch { .. }));

        let err = RATE.coerce("rate", &Value::Int(5)).unwrap_err();
        assert!(matches!(err, ComponentError::DimensionMismatch { .. }));
    }

    #[test]
    fn unparsable_quantity_reports_the_attribute() {
        let err = RATE.coerce("rate", &"fast".into()).unwrap_err();
        match err {
            ComponentError::Unit { attr, .. } => assert_eq!(attr, "rate"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn plain_types_must_match_exactly() {
        assert!(AttrKind::Bool.coerce("active", &true.into()).is_ok());
        assert!(AttrKind::Int.coerce("setting", &Value::Int(2)).is_ok());
        let err = AttrKind::Bool.coerce("active", &"yes".into()).unwrap_err();
        assert!(matches!(
            err,
            ComponentError::TypeMismatch {
                expected: "bool",
                found: "text",
                ..
            }
        ));
        assert!(AttrKind::Float.coerce("gain", &Value::Int(1)).is_err());
    }

    #[test]
    fn serde_round_trip_keeps_plain_values() {
        let p = params([
            ("rate", Value::from(Quantity::parse("5 mL/min").unwrap())),
            ("active", Value::from(true)),
            ("setting", Value::from(3)),
        ]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"active":true,"rate":"5 mL/min","setting":3}"#);

        let back: Params = serde_json::from_str(&json).unwrap();
        assert_eq!(back["rate"], Value::Text("5 mL/min".into()));
        assert_eq!(back["setting"], Value::Int(3));
    }

    #[test]
    fn component_references_do_not_serialize() {
        let v = Value::Component(ComponentId::from_index(0));
        assert!(serde_json::to_string(&v).is_err());
    }
}

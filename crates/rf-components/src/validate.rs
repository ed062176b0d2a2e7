//! Static checks on a component's declared base state.

use std::fmt;

use thiserror::Error;

use crate::attributes::unknown_attribute;
use crate::traits::ActiveComponent;
use crate::value::{AttrSpec, Params};

/// Which check a component failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    NonEmptyBaseState,
    KnownAttribute,
    MatchingKind,
    /// Applying the base state (or reading a sensor) on live hardware.
    Preflight,
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationRule::NonEmptyBaseState => "base state is non-empty",
            ValidationRule::KnownAttribute => "base state names existing attributes",
            ValidationRule::MatchingKind => "base state values match attribute types",
            ValidationRule::Preflight => "device accepts its base state",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("check '{rule}' failed: {reason}")]
pub struct ValidationFailure {
    pub rule: ValidationRule,
    pub reason: String,
}

impl ValidationFailure {
    pub fn new(rule: ValidationRule, reason: impl Into<String>) -> Self {
        Self {
            rule,
            reason: reason.into(),
        }
    }
}

/// Check a base state against attribute specs and return it coerced.
pub fn validate_base_state(specs: &[AttrSpec], base: &Params) -> Result<Params, ValidationFailure> {
    if base.is_empty() {
        return Err(ValidationFailure::new(
            ValidationRule::NonEmptyBaseState,
            "base state is empty",
        ));
    }

    let mut coerced = Params::new();
    for (attr, value) in base {
        let spec = specs.iter().find(|s| s.name == attr).ok_or_else(|| {
            ValidationFailure::new(
                ValidationRule::KnownAttribute,
                unknown_attribute(attr, specs).to_string(),
            )
        })?;
        let value = spec
            .kind
            .coerce(attr, value)
            .map_err(|e| ValidationFailure::new(ValidationRule::MatchingKind, e.to_string()))?;
        coerced.insert(attr.clone(), value);
    }
    Ok(coerced)
}

/// Rules 1 to 3 for one component.
pub fn validate_component(component: &dyn ActiveComponent) -> Result<Params, ValidationFailure> {
    validate_base_state(component.attributes().specs(), &component.base_state())
}

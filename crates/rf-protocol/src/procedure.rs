//! Procedures and the arguments used to declare them.

use std::time::Duration;

use rf_components::{Params, Value};
use rf_core::{ComponentId, Quantity, ensure_schedulable};

use crate::error::{ProtocolError, ProtocolResult};

/// "Set these attributes of `component` between `start` and `stop`."
///
/// Times are seconds from the protocol start. `None` means "infer": a
/// missing start is the beginning of the protocol, a missing stop is filled
/// in by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub component: ComponentId,
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub params: Params,
}

impl Procedure {
    pub fn start_or_zero(&self) -> f64 {
        self.start.unwrap_or(0.0)
    }
}

/// A point in time or a span, as accepted by [`Step`].
#[derive(Debug, Clone, PartialEq)]
pub enum TimeArg {
    /// A quantity string such as `"5 min"`.
    Text(String),
    Duration(Duration),
    Quantity(Quantity),
    Seconds(f64),
}

impl TimeArg {
    /// Magnitude in seconds, bounded by what a run can schedule.
    pub fn seconds(&self, what: &'static str) -> ProtocolResult<f64> {
        let invalid = |source| ProtocolError::InvalidTime { what, source };
        let secs = match self {
            TimeArg::Text(text) => Quantity::parse(text)
                .and_then(|q| q.seconds())
                .map_err(invalid),
            TimeArg::Duration(d) => Ok(d.as_secs_f64()),
            TimeArg::Quantity(q) => q.seconds().map_err(invalid),
            TimeArg::Seconds(s) => Quantity::from_seconds(*s)
                .map(|q| q.value())
                .map_err(invalid),
        }?;
        schedulable(secs, what)
    }
}

pub(crate) fn schedulable(secs: f64, what: &'static str) -> ProtocolResult<f64> {
    ensure_schedulable(secs, what).map_err(|source| ProtocolError::Unschedulable { what, source })
}

impl From<&str> for TimeArg {
    fn from(s: &str) -> Self {
        TimeArg::Text(s.to_string())
    }
}

impl From<String> for TimeArg {
    fn from(s: String) -> Self {
        TimeArg::Text(s)
    }
}

impl From<Duration> for TimeArg {
    fn from(d: Duration) -> Self {
        TimeArg::Duration(d)
    }
}

impl From<Quantity> for TimeArg {
    fn from(q: Quantity) -> Self {
        TimeArg::Quantity(q)
    }
}

impl From<f64> for TimeArg {
    fn from(s: f64) -> Self {
        TimeArg::Seconds(s)
    }
}

/// Arguments of one `Protocol::add` call.
///
/// ```
/// use rf_protocol::Step;
///
/// let step = Step::new().set("rate", "10 mL/min").start("1 min").duration("5 min");
/// assert_eq!(step.params().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    pub(crate) start: Option<TimeArg>,
    pub(crate) stop: Option<TimeArg>,
    pub(crate) duration: Option<TimeArg>,
    pub(crate) params: Params,
}

impl Step {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign one attribute.
    pub fn set(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(attr.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    pub fn start(mut self, t: impl Into<TimeArg>) -> Self {
        self.start = Some(t.into());
        self
    }

    pub fn stop(mut self, t: impl Into<TimeArg>) -> Self {
        self.stop = Some(t.into());
        self
    }

    pub fn duration(mut self, t: impl Into<TimeArg>) -> Self {
        self.duration = Some(t.into());
        self
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Id(ComponentId),
    Name(String),
}

/// One or more components a step applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets(pub Vec<Target>);

impl From<ComponentId> for Targets {
    fn from(id: ComponentId) -> Self {
        Targets(vec![Target::Id(id)])
    }
}

impl From<&[ComponentId]> for Targets {
    fn from(ids: &[ComponentId]) -> Self {
        Targets(ids.iter().copied().map(Target::Id).collect())
    }
}

impl From<Vec<ComponentId>> for Targets {
    fn from(ids: Vec<ComponentId>) -> Self {
        Targets(ids.into_iter().map(Target::Id).collect())
    }
}

impl<const N: usize> From<[ComponentId; N]> for Targets {
    fn from(ids: [ComponentId; N]) -> Self {
        Targets(ids.into_iter().map(Target::Id).collect())
    }
}

impl From<&str> for Targets {
    fn from(name: &str) -> Self {
        Targets(vec![Target::Name(name.to_string())])
    }
}

impl From<String> for Targets {
    fn from(name: String) -> Self {
        Targets(vec![Target::Name(name)])
    }
}

impl<const N: usize> From<[&str; N]> for Targets {
    fn from(names: [&str; N]) -> Self {
        Targets(
            names
                .into_iter()
                .map(|n| Target::Name(n.to_string()))
                .collect(),
        )
    }
}

impl From<Vec<String>> for Targets {
    fn from(names: Vec<String>) -> Self {
        Targets(names.into_iter().map(Target::Name).collect())
    }
}

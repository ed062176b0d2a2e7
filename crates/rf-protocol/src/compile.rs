//! Protocol compiler.
//!
//! Turns the unordered procedures of a protocol into a per-component list of
//! `(time, params)` instructions: stops are inferred, overlaps rejected, and a
//! return to the base state is inserted after every procedure that is not
//! immediately followed by another one.

use std::collections::BTreeMap;
use std::fmt;

use rf_apparatus::Apparatus;
use rf_components::{Params, validate_base_state};
use rf_core::{ComponentId, SCHEDULE_EPSILON, same_instant};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProtocolError, ProtocolResult};
use crate::procedure::{Procedure, schedulable};
use crate::protocol::{Protocol, ProtocolDuration};

/// "At `time` seconds from the start, set `params`."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedInstruction {
    pub time: f64,
    pub params: Params,
}

/// Where an inferred stop came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSource {
    NextStart,
    ProtocolEnd,
}

/// Non-fatal findings. Each one is also logged at warn level.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileWarning {
    UnusedComponent {
        component: String,
    },
    InferredStop {
        component: String,
        stop: f64,
        source: StopSource,
    },
    ZeroLength {
        component: String,
        time: f64,
    },
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileWarning::UnusedComponent { component } => write!(
                f,
                "{component} is an active component but was not used in this protocol"
            ),
            CompileWarning::InferredStop {
                component,
                stop,
                source: StopSource::NextStart,
            } => write!(
                f,
                "Inferred stop of {component} at {stop} s from the start of its next procedure"
            ),
            CompileWarning::InferredStop {
                component,
                stop,
                source: StopSource::ProtocolEnd,
            } => write!(
                f,
                "Inferred stop of {component} at {stop} s, the end of the protocol"
            ),
            CompileWarning::ZeroLength { component, time } => write!(
                f,
                "Procedure for {component} at {time} s has zero length and was skipped"
            ),
        }
    }
}

/// One procedure after stop inference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub component: String,
    pub start: f64,
    pub stop: f64,
    pub params: Params,
}

/// Output of [`Protocol::compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// Seconds until the end-of-run.
    pub duration: f64,
    /// Time-sorted instructions per active component that has procedures.
    pub schedule: BTreeMap<ComponentId, Vec<TimedInstruction>>,
    pub warnings: Vec<CompileWarning>,
}

impl Compiled {
    pub fn instructions(&self, component: ComponentId) -> &[TimedInstruction] {
        self.schedule.get(&component).map_or(&[], Vec::as_slice)
    }

    pub fn instruction_count(&self) -> usize {
        self.schedule.values().map(Vec::len).sum()
    }

    /// Keyed by component name.
    pub fn to_named(&self, apparatus: &Apparatus) -> BTreeMap<String, Vec<TimedInstruction>> {
        self.schedule
            .iter()
            .map(|(id, list)| {
                let name = apparatus
                    .name_of(*id)
                    .map_or_else(|| id.to_string(), str::to_string);
                (name, list.clone())
            })
            .collect()
    }

    pub fn to_yaml(&self, apparatus: &Apparatus) -> ProtocolResult<String> {
        Ok(serde_yaml::to_string(&self.to_named(apparatus))?)
    }

    pub fn to_json(&self, apparatus: &Apparatus) -> ProtocolResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_named(apparatus))?)
    }
}

struct Resolved {
    component: ComponentId,
    spans: Vec<Span>,
    base: Params,
}

struct Plan {
    components: Vec<Resolved>,
    warnings: Vec<CompileWarning>,
    bound: Option<f64>,
}

fn note(warnings: &mut Vec<CompileWarning>, warning: CompileWarning) {
    warn!("{warning}");
    warnings.push(warning);
}

impl Protocol<'_> {
    /// Latest stop over all procedures, with missing stops counted as 0.
    pub fn inferred_duration(&self) -> ProtocolResult<f64> {
        if self.procedures().iter().all(|p| p.stop.is_none()) {
            return Err(ProtocolError::UnderspecifiedDuration);
        }
        Ok(self
            .procedures()
            .iter()
            .map(|p| p.stop.unwrap_or(0.0))
            .fold(0.0, f64::max))
    }

    /// Compile into a per-component schedule. Pure; touches no hardware.
    pub fn compile(&self) -> ProtocolResult<Compiled> {
        let plan = self.plan()?;
        let mut schedule = BTreeMap::new();
        let mut latest: f64 = 0.0;

        for resolved in plan.components {
            let spans = &resolved.spans;
            let mut out = Vec::with_capacity(spans.len() * 2);
            for (i, span) in spans.iter().enumerate() {
                out.push(TimedInstruction {
                    time: span.start,
                    params: span.params.clone(),
                });
                let back_to_back = spans
                    .get(i + 1)
                    .is_some_and(|next| same_instant(next.start, span.stop));
                if !back_to_back {
                    out.push(TimedInstruction {
                        time: span.stop,
                        params: resolved.base.clone(),
                    });
                }
            }
            if let Some(last) = out.last() {
                latest = latest.max(last.time);
            }
            schedule.insert(resolved.component, out);
        }

        let duration = plan.bound.unwrap_or(latest);
        debug!(
            "Compiled protocol '{}': {} components, {} s",
            self.name(),
            schedule.len(),
            duration
        );
        Ok(Compiled {
            duration,
            schedule,
            warnings: plan.warnings,
        })
    }

    /// Every procedure with its inferred stop, ordered by component then start.
    pub fn timeline(&self) -> ProtocolResult<Vec<Span>> {
        Ok(self
            .plan()?
            .components
            .into_iter()
            .flat_map(|r| r.spans)
            .collect())
    }

    fn plan(&self) -> ProtocolResult<Plan> {
        let bound = match self.duration() {
            ProtocolDuration::Fixed(secs) => Some(schedulable(secs, "duration")?),
            ProtocolDuration::Auto => Some(self.inferred_duration()?),
            ProtocolDuration::Unset => None,
        };
        let mut warnings = Vec::new();
        let mut components = Vec::new();

        for entry in self.apparatus().active_components() {
            let name = entry.info.name.clone();
            let mut procs: Vec<&Procedure> = self
                .procedures()
                .iter()
                .filter(|p| p.component == entry.id)
                .collect();
            if procs.is_empty() {
                note(
                    &mut warnings,
                    CompileWarning::UnusedComponent { component: name },
                );
                continue;
            }
            procs.sort_by(|a, b| a.start_or_zero().total_cmp(&b.start_or_zero()));

            let base = validate_base_state(entry.info.specs, &entry.info.base_state).map_err(
                |failure| ProtocolError::InvalidComponent {
                    component: name.clone(),
                    failure,
                },
            )?;

            let continuous = procs
                .iter()
                .filter(|p| p.start.is_none() && p.stop.is_none())
                .count();
            if continuous > 1 {
                return Err(ProtocolError::ContinuousConflict { component: name });
            }

            check_times(&name, &procs, bound)?;
            let spans = self.infer_stops(&name, &procs, bound, &mut warnings)?;

            let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
            for span in spans {
                if span.stop - span.start <= SCHEDULE_EPSILON {
                    note(
                        &mut warnings,
                        CompileWarning::ZeroLength {
                            component: name.clone(),
                            time: span.start,
                        },
                    );
                    continue;
                }
                if let Some(prev) = kept.last() {
                    if prev.stop > span.start + SCHEDULE_EPSILON {
                        return Err(ProtocolError::OverlappingProcedures {
                            component: name,
                            stop: prev.stop,
                            next_start: span.start,
                        });
                    }
                }
                kept.push(span);
            }

            components.push(Resolved {
                component: entry.id,
                spans: kept,
                base,
            });
        }

        Ok(Plan {
            components,
            warnings,
            bound,
        })
    }

    fn infer_stops(
        &self,
        name: &str,
        procs: &[&Procedure],
        bound: Option<f64>,
        warnings: &mut Vec<CompileWarning>,
    ) -> ProtocolResult<Vec<Span>> {
        let mut spans = Vec::with_capacity(procs.len());
        for (i, proc) in procs.iter().enumerate() {
            let start = proc.start_or_zero();
            let stop = match (proc.stop, procs.get(i + 1)) {
                (Some(stop), _) => stop,
                (None, Some(next)) => {
                    let next_start = next.start_or_zero();
                    if same_instant(next_start, 0.0) {
                        return Err(ProtocolError::AmbiguousStop {
                            component: name.to_string(),
                        });
                    }
                    note(
                        warnings,
                        CompileWarning::InferredStop {
                            component: name.to_string(),
                            stop: next_start,
                            source: StopSource::NextStart,
                        },
                    );
                    next_start
                }
                (None, None) => {
                    let end = match bound {
                        Some(end) => end,
                        None => self.inferred_duration()?,
                    };
                    note(
                        warnings,
                        CompileWarning::InferredStop {
                            component: name.to_string(),
                            stop: end,
                            source: StopSource::ProtocolEnd,
                        },
                    );
                    end
                }
            };
            if start > stop + SCHEDULE_EPSILON {
                return Err(ProtocolError::StartAfterStop {
                    component: name.to_string(),
                    start,
                    stop,
                });
            }
            spans.push(Span {
                component: name.to_string(),
                start,
                stop: stop.max(start),
                params: proc.params.clone(),
            });
        }
        Ok(spans)
    }
}

/// `start <= stop`, and every known time inside `[0, bound]`.
fn check_times(name: &str, procs: &[&Procedure], bound: Option<f64>) -> ProtocolResult<()> {
    let upper = bound.unwrap_or(f64::INFINITY);
    for proc in procs {
        let start = proc.start_or_zero();
        if let Some(stop) = proc.stop {
            if start > stop {
                return Err(ProtocolError::StartAfterStop {
                    component: name.to_string(),
                    start,
                    stop,
                });
            }
        }
        for time in [Some(start), proc.stop].into_iter().flatten() {
            if time < 0.0 || time > upper + SCHEDULE_EPSILON {
                return Err(ProtocolError::OutOfRange {
                    component: name.to_string(),
                    time,
                    duration: upper,
                });
            }
        }
    }
    Ok(())
}

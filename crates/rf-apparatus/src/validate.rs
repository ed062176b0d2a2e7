//! Apparatus validation logic.

use std::collections::BTreeSet;

use rf_components::{ActiveComponent, Tube};
use rf_core::{ComponentId, ConnectionId};
use tracing::warn;

use crate::error::{ApparatusError, ApparatusResult};

pub(crate) fn unique_names(names: &[&str]) -> ApparatusResult<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(*name) {
            return Err(ApparatusError::DuplicateName {
                name: (*name).to_string(),
            });
        }
    }
    Ok(())
}

pub(crate) fn connection_refs(
    count: usize,
    connections: &[(ComponentId, ComponentId, Tube)],
) -> ApparatusResult<()> {
    for (i, (from, to, _)) in connections.iter().enumerate() {
        for component in [from, to] {
            if component.index() as usize >= count {
                return Err(ApparatusError::InvalidRef {
                    connection: ConnectionId::from_index(i as u32),
                    component: *component,
                });
            }
        }
    }
    Ok(())
}

/// Every component a valve maps must belong to the apparatus.
pub(crate) fn valve_mapping(component: &dyn ActiveComponent, count: usize) -> ApparatusResult<()> {
    let Some(mapping) = component.mapping() else {
        return Ok(());
    };
    match mapping.keys().find(|id| id.index() as usize >= count) {
        Some(id) => Err(ApparatusError::InvalidMapping {
            valve: component.name().to_string(),
            component: *id,
        }),
        None => Ok(()),
    }
}

pub(crate) fn warn_if_disconnected(names: &[&str], connections: &[(ComponentId, ComponentId, Tube)]) {
    if names.len() < 2 {
        return;
    }
    let connected: BTreeSet<ComponentId> = connections
        .iter()
        .flat_map(|(from, to, _)| [*from, *to])
        .collect();
    let loose: Vec<&str> = names
        .iter()
        .enumerate()
        .filter(|(i, _)| !connected.contains(&ComponentId::from_index(*i as u32)))
        .map(|(_, name)| *name)
        .collect();
    if !loose.is_empty() {
        warn!(
            "Not all components are connected. Unconnected: {}",
            loose.join(", ")
        );
    }
}

//! The validated, immutable apparatus.

use rf_components::{
    ActiveComponent, AttrSpec, ComponentKind, Params, PassiveComponent, Tube, ValveMapping,
};
use rf_core::{ComponentId, ConnectionId};
use tokio::sync::Mutex;

use crate::names::NameGenerator;

/// Static facts about an active component, readable without locking it.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub name: String,
    pub kind: ComponentKind,
    pub specs: &'static [AttrSpec],
    pub base_state: Params,
    pub mapping: Option<ValveMapping>,
    /// Unit label, for components that can be read.
    pub sensor_unit: Option<String>,
}

impl ComponentInfo {
    pub(crate) fn of(component: &dyn ActiveComponent) -> Self {
        Self {
            name: component.name().to_string(),
            kind: component.kind(),
            specs: component.attributes().specs(),
            base_state: component.base_state(),
            mapping: component.mapping().cloned(),
            sensor_unit: component.readable().map(|r| r.unit().to_string()),
        }
    }

    pub fn is_sensor(&self) -> bool {
        self.sensor_unit.is_some()
    }

    pub fn spec(&self, attr: &str) -> Option<&'static AttrSpec> {
        self.specs.iter().find(|s| s.name == attr)
    }
}

/// An active component and the lock that serializes access to it during a run.
#[derive(Debug)]
pub struct ActiveEntry {
    pub id: ComponentId,
    pub info: ComponentInfo,
    pub component: Mutex<Box<dyn ActiveComponent>>,
}

#[derive(Debug)]
pub enum ComponentEntry {
    Active(ActiveEntry),
    Passive {
        id: ComponentId,
        component: PassiveComponent,
    },
}

impl ComponentEntry {
    pub fn id(&self) -> ComponentId {
        match self {
            ComponentEntry::Active(entry) => entry.id,
            ComponentEntry::Passive { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ComponentEntry::Active(entry) => &entry.info.name,
            ComponentEntry::Passive { component, .. } => component.name(),
        }
    }

    /// "pump", "valve", "vessel", ...
    pub fn kind_label(&self) -> String {
        match self {
            ComponentEntry::Active(entry) => entry.info.kind.to_string(),
            ComponentEntry::Passive { component, .. } => component.kind_name().to_lowercase(),
        }
    }

    pub fn as_active(&self) -> Option<&ActiveEntry> {
        match self {
            ComponentEntry::Active(entry) => Some(entry),
            ComponentEntry::Passive { .. } => None,
        }
    }
}

/// A directed tubing connection between two components.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: ComponentId,
    pub to: ComponentId,
    pub tube: Tube,
}

/// Components plus connectivity.
///
/// Components are stored in a vector indexed by their ids. Outgoing
/// connections use compact adjacency: component i's connections are
/// `out_edges[out_offsets[i]..out_offsets[i + 1]]`.
#[derive(Debug)]
pub struct Apparatus {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) components: Vec<ComponentEntry>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) out_offsets: Vec<usize>,
    pub(crate) out_edges: Vec<ConnectionId>,
    pub(crate) names: NameGenerator,
}

impl Apparatus {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn components(&self) -> &[ComponentEntry] {
        &self.components
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn component(&self, id: ComponentId) -> Option<&ComponentEntry> {
        self.components.get(id.index() as usize)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id.index() as usize)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.component(id).is_some()
    }

    /// The active component with this id, if it is active.
    pub fn active(&self, id: ComponentId) -> Option<&ActiveEntry> {
        self.component(id).and_then(ComponentEntry::as_active)
    }

    /// Active components in id order.
    pub fn active_components(&self) -> impl Iterator<Item = &ActiveEntry> {
        self.components.iter().filter_map(ComponentEntry::as_active)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &ActiveEntry> {
        self.active_components().filter(|e| e.info.is_sensor())
    }

    pub fn id_of(&self, name: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .find(|c| c.name() == name)
            .map(ComponentEntry::id)
    }

    pub fn name_of(&self, id: ComponentId) -> Option<&str> {
        self.component(id).map(ComponentEntry::name)
    }

    /// Connections leaving `id`.
    pub fn downstream(&self, id: ComponentId) -> &[ConnectionId] {
        let i = id.index() as usize;
        match (self.out_offsets.get(i), self.out_offsets.get(i + 1)) {
            (Some(&start), Some(&end)) => &self.out_edges[start..end],
            _ => &[],
        }
    }

    /// Connections entering `id`.
    pub fn upstream(&self, id: ComponentId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.to == id)
    }

    /// Per-apparatus name counters, shared with protocols built on it.
    pub fn names(&self) -> &NameGenerator {
        &self.names
    }
}

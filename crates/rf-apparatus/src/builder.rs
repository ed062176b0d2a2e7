//! Incremental apparatus builder.

use rf_components::{ActiveComponent, ComponentKind, PassiveComponent, Tube};
use rf_core::{ComponentId, ConnectionId};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::apparatus::{ActiveEntry, Apparatus, ComponentEntry, ComponentInfo, Connection};
use crate::error::ApparatusResult;
use crate::names::NameGenerator;
use crate::validate;

#[derive(Debug)]
enum Pending {
    Active(Box<dyn ActiveComponent>),
    Passive(PassiveComponent),
}

impl Pending {
    fn name(&self) -> &str {
        match self {
            Pending::Active(c) => c.name(),
            Pending::Passive(c) => c.name(),
        }
    }
}

/// Builder for constructing an apparatus incrementally.
///
/// Add components and connections, then call `build()` to validate and
/// freeze everything into an immutable `Apparatus`. Components added without
/// a name get one from the apparatus' `NameGenerator`.
#[derive(Debug, Default)]
pub struct ApparatusBuilder {
    name: String,
    description: Option<String>,
    components: Vec<Pending>,
    connections: Vec<(ComponentId, ComponentId, Tube)>,
    names: NameGenerator,
}

fn prefix(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::Pump => "Pump",
        ComponentKind::Valve => "Valve",
        ComponentKind::TempControl => "TempControl",
        ComponentKind::Sensor => "Sensor",
        ComponentKind::Dummy => "Dummy",
    }
}

impl ApparatusBuilder {
    /// An empty name is replaced by `Apparatus_N`.
    pub fn new(name: impl Into<String>) -> Self {
        let names = NameGenerator::new();
        let mut name = name.into();
        if name.is_empty() {
            name = names.next("Apparatus");
        }
        Self {
            name,
            names,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn next_id(&self) -> ComponentId {
        ComponentId::from_index(self.components.len() as u32)
    }

    /// Add an active component and return its id.
    pub fn add_active(&mut self, component: impl ActiveComponent + 'static) -> ComponentId {
        self.add_boxed(Box::new(component))
    }

    pub fn add_boxed(&mut self, mut component: Box<dyn ActiveComponent>) -> ComponentId {
        if component.name().is_empty() {
            component.set_name(self.names.next(prefix(component.kind())));
        }
        let id = self.next_id();
        self.components.push(Pending::Active(component));
        id
    }

    pub fn add_passive(&mut self, mut component: PassiveComponent) -> ComponentId {
        if component.name().is_empty() {
            component.set_name(self.names.next(component.kind_name()));
        }
        let id = self.next_id();
        self.components.push(Pending::Passive(component));
        id
    }

    /// Connect `from` to `to`. Returns false (and keeps the first tube) if the
    /// pair is already connected.
    pub fn connect(&mut self, from: ComponentId, to: ComponentId, tube: Tube) -> bool {
        if self.connections.iter().any(|(f, t, _)| *f == from && *t == to) {
            warn!(
                "Components {} and {} are already connected. Ignoring the new connection.",
                self.label(from),
                self.label(to)
            );
            return false;
        }
        self.connections.push((from, to, tube));
        true
    }

    /// Connect every `from` to every `to` with copies of `tube`.
    pub fn connect_many(&mut self, from: &[ComponentId], to: &[ComponentId], tube: &Tube) {
        for &f in from {
            for &t in to {
                self.connect(f, t, tube.clone());
            }
        }
    }

    fn label(&self, id: ComponentId) -> String {
        self.components
            .get(id.index() as usize)
            .map_or_else(|| id.to_string(), |c| format!("'{}'", c.name()))
    }

    /// Validate and freeze.
    pub fn build(self) -> ApparatusResult<Apparatus> {
        let names: Vec<&str> = self.components.iter().map(Pending::name).collect();
        validate::unique_names(&names)?;
        validate::connection_refs(self.components.len(), &self.connections)?;
        for component in &self.components {
            if let Pending::Active(c) = component {
                validate::valve_mapping(c.as_ref(), self.components.len())?;
            }
        }
        validate::warn_if_disconnected(&names, &self.connections);

        let connections: Vec<Connection> = self
            .connections
            .into_iter()
            .enumerate()
            .map(|(i, (from, to, tube))| Connection {
                id: ConnectionId::from_index(i as u32),
                from,
                to,
                tube,
            })
            .collect();
        let (out_offsets, out_edges) = build_adjacency(self.components.len(), &connections);

        let components = self
            .components
            .into_iter()
            .enumerate()
            .map(|(i, pending)| {
                let id = ComponentId::from_index(i as u32);
                match pending {
                    Pending::Active(component) => ComponentEntry::Active(ActiveEntry {
                        id,
                        info: ComponentInfo::of(component.as_ref()),
                        component: Mutex::new(component),
                    }),
                    Pending::Passive(component) => ComponentEntry::Passive { id, component },
                }
            })
            .collect::<Vec<_>>();

        debug!(
            "Built apparatus '{}' with {} components and {} connections",
            self.name,
            components.len(),
            connections.len()
        );

        Ok(Apparatus {
            name: self.name,
            description: self.description,
            components,
            connections,
            out_offsets,
            out_edges,
            names: self.names,
        })
    }
}

/// Offsets and flat list of outgoing connections per component.
fn build_adjacency(count: usize, connections: &[Connection]) -> (Vec<usize>, Vec<ConnectionId>) {
    let mut per_component: Vec<Vec<ConnectionId>> = vec![Vec::new(); count];
    for conn in connections {
        if let Some(list) = per_component.get_mut(conn.from.index() as usize) {
            list.push(conn.id);
        }
    }

    let mut offsets = Vec::with_capacity(count + 1);
    let mut flat = Vec::with_capacity(connections.len());
    offsets.push(0);
    for list in per_component {
        flat.extend(list);
        offsets.push(flat.len());
    }
    (offsets, flat)
}

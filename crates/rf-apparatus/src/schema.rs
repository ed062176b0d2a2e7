//! YAML apparatus files.
//!
//! ```yaml
//! name: Hydrogenation rig
//! components:
//!   - { type: vessel, name: substrate, description: alkene in MeOH }
//!   - { type: pump, name: P1 }
//!   - { type: valve, name: V1, mapping: { P1: 1 } }
//! connections:
//!   - from: substrate
//!     to: P1
//!     tube: { length: 1 m, inner_diameter: 1 mm, outer_diameter: 1.6 mm }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use rf_components::{
    ActiveComponent, Dummy, DummySensor, MixerShape, PassiveComponent, Pump, TempControl, Tube,
    Valve, ValveMapping,
};
use rf_core::ComponentId;
use serde::{Deserialize, Serialize};

use crate::apparatus::Apparatus;
use crate::builder::ApparatusBuilder;
use crate::error::{ApparatusError, ApparatusResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApparatusDef {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub components: Vec<ComponentDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentDef {
    Pump {
        name: String,
    },
    Valve {
        name: String,
        /// Component name -> port number.
        #[serde(default)]
        mapping: BTreeMap<String, i64>,
    },
    TempControl {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        internal_tubing: Option<TubeDef>,
    },
    Sensor {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Dummy {
        name: String,
    },
    Vessel {
        name: String,
        #[serde(default)]
        description: String,
    },
    Mixer {
        name: String,
        #[serde(default)]
        shape: MixerShape,
    },
}

impl ComponentDef {
    pub fn name(&self) -> &str {
        match self {
            ComponentDef::Pump { name }
            | ComponentDef::Valve { name, .. }
            | ComponentDef::TempControl { name, .. }
            | ComponentDef::Sensor { name, .. }
            | ComponentDef::Dummy { name }
            | ComponentDef::Vessel { name, .. }
            | ComponentDef::Mixer { name, .. } => name,
        }
    }
}

fn default_material() -> String {
    "PFA".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TubeDef {
    pub length: String,
    pub inner_diameter: String,
    pub outer_diameter: String,
    #[serde(default = "default_material")]
    pub material: String,
}

impl TubeDef {
    pub fn to_tube(&self) -> ApparatusResult<Tube> {
        Ok(Tube::new(
            &self.length,
            &self.inner_diameter,
            &self.outer_diameter,
            self.material.clone(),
        )?)
    }
}

/// One name or a list; lists connect every pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoints {
    One(String),
    Many(Vec<String>),
}

impl Endpoints {
    pub fn names(&self) -> &[String] {
        match self {
            Endpoints::One(name) => std::slice::from_ref(name),
            Endpoints::Many(names) => names,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDef {
    pub from: Endpoints,
    pub to: Endpoints,
    pub tube: TubeDef,
}

/// Build an apparatus from its definition. Components get ids in file order.
pub fn build_apparatus(def: &ApparatusDef) -> ApparatusResult<Apparatus> {
    let mut ids: BTreeMap<&str, ComponentId> = BTreeMap::new();
    for (i, component) in def.components.iter().enumerate() {
        if ids
            .insert(component.name(), ComponentId::from_index(i as u32))
            .is_some()
        {
            return Err(ApparatusError::DuplicateName {
                name: component.name().to_string(),
            });
        }
    }
    let resolve = |name: &str| -> ApparatusResult<ComponentId> {
        ids.get(name)
            .copied()
            .ok_or_else(|| ApparatusError::UnknownComponent {
                name: name.to_string(),
            })
    };

    let mut builder = ApparatusBuilder::new(def.name.clone());
    if let Some(description) = &def.description {
        builder = builder.with_description(description.clone());
    }

    for component in &def.components {
        match component {
            ComponentDef::Vessel { name, description } => {
                builder.add_passive(PassiveComponent::vessel(name.clone(), description.clone()));
            }
            ComponentDef::Mixer { name, shape } => {
                builder.add_passive(PassiveComponent::mixer(name.clone(), *shape));
            }
            active => {
                let boxed = active_component(active, &resolve)?;
                builder.add_boxed(boxed);
            }
        }
    }

    for conn in &def.connections {
        let tube = conn.tube.to_tube()?;
        let from = conn
            .from
            .names()
            .iter()
            .map(|n| resolve(n.as_str()))
            .collect::<ApparatusResult<Vec<_>>>()?;
        let to = conn
            .to
            .names()
            .iter()
            .map(|n| resolve(n.as_str()))
            .collect::<ApparatusResult<Vec<_>>>()?;
        builder.connect_many(&from, &to, &tube);
    }

    builder.build()
}

fn active_component(
    def: &ComponentDef,
    resolve: &dyn Fn(&str) -> ApparatusResult<ComponentId>,
) -> ApparatusResult<Box<dyn ActiveComponent>> {
    Ok(match def {
        ComponentDef::Pump { name } => Box::new(Pump::new(name.clone())),
        ComponentDef::Valve { name, mapping } => {
            let mut ports = ValveMapping::new();
            for (target, port) in mapping {
                ports.insert(resolve(target)?, *port);
            }
            Box::new(Valve::new(name.clone(), ports))
        }
        ComponentDef::TempControl {
            name,
            internal_tubing,
        } => {
            let mut tc = TempControl::new(name.clone());
            if let Some(tube) = internal_tubing {
                tc = tc.with_internal_tubing(tube.to_tube()?);
            }
            Box::new(tc)
        }
        ComponentDef::Sensor { name, unit } => {
            let sensor = DummySensor::new(name.clone());
            match unit {
                Some(unit) => Box::new(sensor.with_unit(unit.clone())),
                None => Box::new(sensor),
            }
        }
        ComponentDef::Dummy { name } => Box::new(Dummy::new(name.clone())),
        ComponentDef::Vessel { name, .. } | ComponentDef::Mixer { name, .. } => {
            return Err(ApparatusError::UnknownComponent { name: name.clone() });
        }
    })
}

pub fn from_yaml_str(content: &str) -> ApparatusResult<Apparatus> {
    let def: ApparatusDef = serde_yaml::from_str(content)?;
    build_apparatus(&def)
}

pub fn load_yaml(path: &Path) -> ApparatusResult<Apparatus> {
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

//! Protocol file schema and the list form.
//!
//! The list form is an ordered sequence of
//! `{component, start, stop, params}` records with times in seconds. It is
//! what protocol files store and what the experiment id is hashed from.

use rf_apparatus::{Apparatus, Endpoints};
use rf_components::Params;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolResult;
use crate::procedure::{Step, TimeArg};
use crate::protocol::{Protocol, ProtocolDuration};

/// One procedure in list form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureRecord {
    pub component: String,
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub params: Params,
}

/// Seconds, or a quantity string such as `"5 min"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeDef {
    Seconds(f64),
    Text(String),
}

impl TimeDef {
    fn to_arg(&self) -> TimeArg {
        match self {
            TimeDef::Seconds(s) => TimeArg::Seconds(*s),
            TimeDef::Text(t) => TimeArg::Text(t.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureDef {
    /// One component name or a list of them.
    pub component: Endpoints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<TimeDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<TimeDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<TimeDef>,
    #[serde(default)]
    pub params: Params,
}

impl From<ProcedureRecord> for ProcedureDef {
    fn from(record: ProcedureRecord) -> Self {
        Self {
            component: Endpoints::One(record.component),
            start: record.start.map(TimeDef::Seconds),
            stop: record.stop.map(TimeDef::Seconds),
            duration: None,
            params: record.params,
        }
    }
}

/// A protocol file (YAML or JSON).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `"auto"`, seconds or a time quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<TimeDef>,
    #[serde(default)]
    pub procedures: Vec<ProcedureDef>,
}

impl ProtocolFile {
    pub fn from_yaml_str(text: &str) -> ProtocolResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Snapshot of `protocol` with every time in seconds.
    pub fn from_protocol(protocol: &Protocol<'_>) -> Self {
        let duration = match protocol.duration() {
            ProtocolDuration::Unset => None,
            ProtocolDuration::Auto => Some(TimeDef::Text("auto".to_string())),
            ProtocolDuration::Fixed(secs) => Some(TimeDef::Seconds(secs)),
        };
        Self {
            name: Some(protocol.name().to_string()),
            description: protocol.description().map(str::to_string),
            duration,
            procedures: protocol.to_list().into_iter().map(Into::into).collect(),
        }
    }

    /// Build the protocol over `apparatus`, adding procedures in file order.
    pub fn build<'a>(&self, apparatus: &'a Apparatus) -> ProtocolResult<Protocol<'a>> {
        let mut protocol = match &self.name {
            Some(name) => Protocol::new(apparatus).named(name.clone()),
            None => Protocol::new(apparatus),
        };
        if let Some(description) = &self.description {
            protocol = protocol.with_description(description.clone());
        }
        if let Some(duration) = &self.duration {
            let duration = match duration {
                TimeDef::Seconds(s) => {
                    ProtocolDuration::Fixed(TimeArg::Seconds(*s).seconds("duration")?)
                }
                TimeDef::Text(t) => ProtocolDuration::parse(t)?,
            };
            protocol.set_duration(duration);
        }

        for def in &self.procedures {
            let mut step = Step::new().with_params(def.params.clone());
            if let Some(start) = &def.start {
                step = step.start(start.to_arg());
            }
            if let Some(stop) = &def.stop {
                step = step.stop(stop.to_arg());
            }
            if let Some(duration) = &def.duration {
                step = step.duration(duration.to_arg());
            }
            protocol.add(def.component.names().to_vec(), step)?;
        }
        Ok(protocol)
    }
}

impl<'a> Protocol<'a> {
    /// The procedures in insertion order.
    pub fn to_list(&self) -> Vec<ProcedureRecord> {
        self.procedures()
            .iter()
            .map(|p| ProcedureRecord {
                component: self.name_of(p.component),
                start: p.start,
                stop: p.stop,
                params: p.params.clone(),
            })
            .collect()
    }

    /// Rebuild a protocol from its list form.
    pub fn from_list(apparatus: &'a Apparatus, records: &[ProcedureRecord]) -> ProtocolResult<Self> {
        let mut protocol = Protocol::new(apparatus);
        for record in records {
            let mut step = Step::new().with_params(record.params.clone());
            if let Some(start) = record.start {
                step = step.start(start);
            }
            if let Some(stop) = record.stop {
                step = step.stop(stop);
            }
            protocol.add(record.component.as_str(), step)?;
        }
        Ok(protocol)
    }

    pub fn to_yaml(&self) -> ProtocolResult<String> {
        Ok(serde_yaml::to_string(&self.to_list())?)
    }

    /// Pretty JSON with sorted keys.
    pub fn to_json(&self) -> ProtocolResult<String> {
        let value = serde_json::to_value(self.to_list())?;
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Compact JSON with sorted keys. Equal protocols give equal text.
    pub fn canonical_json(&self) -> ProtocolResult<String> {
        let value = serde_json::to_value(self.to_list())?;
        Ok(serde_json::to_string(&value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_apparatus::ApparatusBuilder;
    use rf_components::{Pump, Value};

    fn rig() -> Apparatus {
        let mut b = ApparatusBuilder::new("rig");
        b.add_active(Pump::new("A"));
        b.add_active(Pump::new("B"));
        b.build().unwrap()
    }

    const FILE: &str = r#"
name: flush
duration: 10 min
procedures:
  - component: [A, B]
    params: { rate: 1 mL/min }
    duration: 2 min
  - component: A
    start: 180
    stop: 4 min
    params: { rate: "2 mL/min" }
"#;

    #[test]
    fn file_builds_a_protocol() {
        let app = rig();
        let file = ProtocolFile::from_yaml_str(FILE).unwrap();
        let proto = file.build(&app).unwrap();

        assert_eq!(proto.name(), "flush");
        assert_eq!(proto.duration(), ProtocolDuration::Fixed(600.0));
        assert_eq!(proto.procedures().len(), 3);
        assert_eq!(proto.procedures()[2].start, Some(180.0));
        assert_eq!(proto.procedures()[2].stop, Some(240.0));
        assert!(matches!(
            proto.procedures()[0].params["rate"],
            Value::Quantity(_)
        ));
    }

    #[test]
    fn list_form_uses_names_and_seconds() {
        let app = rig();
        let proto = ProtocolFile::from_yaml_str(FILE).unwrap().build(&app).unwrap();
        let list = proto.to_list();
        assert_eq!(list[1].component, "B");
        assert_eq!(list[1].start, None);
        assert_eq!(list[1].stop, Some(120.0));

        let json = proto.to_json().unwrap();
        assert!(json.contains("\"rate\": \"1 mL/min\""));
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let app = rig();
        let proto = ProtocolFile::from_yaml_str(FILE).unwrap().build(&app).unwrap();
        let text = proto.canonical_json().unwrap();
        let component = text.find("\"component\"").unwrap();
        let params = text.find("\"params\"").unwrap();
        let start = text.find("\"start\"").unwrap();
        assert!(component < params && params < start);
        assert!(!text.contains('\n'));
    }

    #[test]
    fn auto_duration_survives_a_file_round_trip() {
        let app = rig();
        let file = ProtocolFile {
            duration: Some(TimeDef::Text("auto".into())),
            ..ProtocolFile::default()
        };
        let proto = file.build(&app).unwrap();
        assert_eq!(proto.duration(), ProtocolDuration::Auto);
        let back = ProtocolFile::from_protocol(&proto);
        assert_eq!(back.duration, Some(TimeDef::Text("auto".into())));
    }
}

//! Components without state: vessels and mixers.

use serde::{Deserialize, Serialize};

/// Mixer geometry. Only used for descriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixerShape {
    #[default]
    Generic,
    T,
    Y,
    Cross,
}

impl MixerShape {
    fn label(self) -> &'static str {
        match self {
            MixerShape::Generic => "mixer",
            MixerShape::T => "T mixer",
            MixerShape::Y => "Y mixer",
            MixerShape::Cross => "cross mixer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PassiveComponent {
    /// A flask, reservoir or collection vessel; `description` names its contents.
    Vessel { name: String, description: String },
    Mixer {
        name: String,
        #[serde(default)]
        shape: MixerShape,
    },
}

impl PassiveComponent {
    pub fn vessel(name: impl Into<String>, description: impl Into<String>) -> Self {
        PassiveComponent::Vessel {
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn mixer(name: impl Into<String>, shape: MixerShape) -> Self {
        PassiveComponent::Mixer {
            name: name.into(),
            shape,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PassiveComponent::Vessel { name, .. } | PassiveComponent::Mixer { name, .. } => name,
        }
    }

    pub fn set_name(&mut self, new_name: String) {
        match self {
            PassiveComponent::Vessel { name, .. } | PassiveComponent::Mixer { name, .. } => {
                *name = new_name
            }
        }
    }

    /// Prefix used for generated names.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PassiveComponent::Vessel { .. } => "Vessel",
            PassiveComponent::Mixer { .. } => "Mixer",
        }
    }

    /// Short phrase used in apparatus descriptions, e.g. "a vessel containing toluene".
    pub fn describe(&self) -> String {
        match self {
            PassiveComponent::Vessel { description, .. } if description.is_empty() => {
                "a vessel".to_string()
            }
            PassiveComponent::Vessel { description, .. } => {
                format!("a vessel containing {description}")
            }
            PassiveComponent::Mixer { shape, .. } => format!("a {}", shape.label()),
        }
    }
}

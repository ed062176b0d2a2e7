//! Apparatus construction errors.

use rf_components::ComponentError;
use rf_core::{ComponentId, ConnectionId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApparatusError {
    #[error("Duplicate component name '{name}'")]
    DuplicateName { name: String },

    #[error("Unknown component '{name}'")]
    UnknownComponent { name: String },

    #[error("Connection {connection} refers to non-existent component {component}")]
    InvalidRef {
        connection: ConnectionId,
        component: ComponentId,
    },

    #[error("Valve '{valve}' maps component {component}, which is not in the apparatus")]
    InvalidMapping {
        valve: String,
        component: ComponentId,
    },

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ApparatusResult<T> = Result<T, ApparatusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_reference_names_both_ids() {
        let err = ApparatusError::InvalidRef {
            connection: ConnectionId::from_index(0),
            component: ComponentId::from_index(9),
        };
        assert!(err.to_string().contains("non-existent component 9"));
    }
}

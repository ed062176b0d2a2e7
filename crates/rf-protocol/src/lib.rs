//! rf-protocol: procedures, protocols and the protocol compiler.

pub mod compile;
pub mod error;
pub mod procedure;
pub mod protocol;
pub mod schema;

pub use compile::{CompileWarning, Compiled, Span, StopSource, TimedInstruction};
pub use error::{ProtocolError, ProtocolResult};
pub use procedure::{Procedure, Step, Target, Targets, TimeArg};
pub use protocol::{Protocol, ProtocolDuration, RunState};
pub use schema::{ProcedureDef, ProcedureRecord, ProtocolFile, TimeDef};

use std::path::Path;

use rf_apparatus::Apparatus;

pub fn load_yaml<'a>(path: &Path, apparatus: &'a Apparatus) -> ProtocolResult<Protocol<'a>> {
    let content = std::fs::read_to_string(path)?;
    ProtocolFile::from_yaml_str(&content)?.build(apparatus)
}

pub fn save_yaml(path: &Path, protocol: &Protocol<'_>) -> ProtocolResult<()> {
    let content = serde_yaml::to_string(&ProtocolFile::from_protocol(protocol))?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json<'a>(path: &Path, apparatus: &'a Apparatus) -> ProtocolResult<Protocol<'a>> {
    let content = std::fs::read_to_string(path)?;
    ProtocolFile::from_json_str(&content)?.build(apparatus)
}

pub fn save_json(path: &Path, protocol: &Protocol<'_>) -> ProtocolResult<()> {
    let content = serde_json::to_string_pretty(&ProtocolFile::from_protocol(protocol))?;
    std::fs::write(path, content)?;
    Ok(())
}

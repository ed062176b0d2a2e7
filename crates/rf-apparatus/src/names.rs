//! Default names (`Pump_0`, `Pump_1`, `Protocol_0`, ...).

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Per-apparatus counters, one per prefix.
#[derive(Debug, Default)]
pub struct NameGenerator {
    counters: Mutex<BTreeMap<String, u32>>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused name for `prefix`.
    pub fn next(&self, prefix: &str) -> String {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let counter = counters.entry(prefix.to_string()).or_insert(0);
        let name = format!("{prefix}_{counter}");
        *counter += 1;
        name
    }
}

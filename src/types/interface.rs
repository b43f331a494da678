use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// One object reported by `pw-cli ls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub id: u32,
    /// Short type tag, e.g. `Node` for `PipeWire:Interface:Node/3`.
    pub interface_type: String,
    pub name: String,
    pub properties: HashMap<String, String>,
}

/// Result of parsing one listing. `skipped` keeps the lines that were
/// dropped so callers can report them.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceListing {
    pub interfaces: BTreeMap<u32, Interface>,
    pub skipped: Vec<String>,
}

impl InterfaceListing {
    pub fn retain_type(&mut self, interface_type: &str) {
        self.interfaces
            .retain(|_, interface| interface.interface_type.eq_ignore_ascii_case(interface_type));
    }
}

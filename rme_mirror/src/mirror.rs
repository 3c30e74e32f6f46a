//! [`DeviceMirror`]: a flat `path -> value` table kept in sync with the
//! device's register space, with diff-based notification coalescing and a
//! refresh protocol for newly-connected clients.

use std::collections::HashMap;

use rme_params::ParameterTree;
use rosc::OscType;

use crate::durec::{DurecTable, FILE_SLOT_BASE};
use crate::mix::MixTable;

/// Writing [`REFRESH_TRIGGER_VALUE`] to this register asks the device to
/// re-emit every register it holds.
pub const REFRESH_TRIGGER_REGISTER: u16 = 0x3e04;
pub const REFRESH_TRIGGER_VALUE: i16 = 0x67cd_u16 as i16;
/// Marks the end of a refresh burst.
pub const REFRESH_TERMINATOR_REGISTER: u16 = 0x2fc0;
/// The device's DURec file count.
pub const FILE_COUNT_REGISTER: u16 = 0x3586;

/// The set of registers [`DeviceMirror`] handles itself, outside
/// [`ParameterTree`] and [`DurecTable`] dispatch.
fn is_protocol_register(register: u16) -> bool {
    matches!(register, REFRESH_TRIGGER_REGISTER | REFRESH_TERMINATOR_REGISTER | FILE_COUNT_REGISTER)
}

/// The flat device-state mirror described in the component design: inbound
/// register updates are resolved through a [`ParameterTree`], diffed
/// against the last known value, and coalesced unless a refresh is active.
pub struct DeviceMirror {
    tree: ParameterTree,
    values: HashMap<String, Vec<OscType>>,
    refreshing: bool,
    durec: DurecTable,
    mix: MixTable,
}

impl DeviceMirror {
    pub fn new(tree: ParameterTree) -> Self {
        Self { tree, values: HashMap::new(), refreshing: false, durec: DurecTable::new(), mix: MixTable::new() }
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn durec(&self) -> &DurecTable {
        &self.durec
    }

    pub fn snapshot(&self) -> &HashMap<String, Vec<OscType>> {
        &self.values
    }

    /// Applies one decoded register word. Returns the outbound OSC
    /// notifications it produces; empty if the value was coalesced (no
    /// change, refresh inactive) or the register is unmapped.
    pub fn apply_register(&mut self, register: u16, raw: i16) -> Vec<(String, Vec<OscType>)> {
        if register == REFRESH_TRIGGER_REGISTER && raw == REFRESH_TRIGGER_VALUE {
            self.refreshing = true;
            log::debug!("device refresh started");
            return Vec::new();
        }
        if register == REFRESH_TERMINATOR_REGISTER {
            self.refreshing = false;
            log::debug!("device refresh complete");
            return Vec::new();
        }
        if register == FILE_COUNT_REGISTER {
            self.durec.set_file_count(raw.max(0) as usize);
            return Vec::new();
        }

        if self.durec.owns(register) {
            let notifications = self.durec.apply_register(register, raw);
            return self.record_all(notifications);
        }
        if self.mix.owns(register) {
            let notifications = self.mix.apply_register(register, raw);
            return self.record_all(notifications);
        }

        let decoded = self.tree.decode(register, raw);
        if decoded.is_empty() {
            log::debug!("unmatched register {register:#06x} = {raw}");
            return Vec::new();
        }
        let mut notifications = Vec::new();
        for (path, args) in decoded {
            let changed = self.refreshing || self.values.get(&path) != Some(&args);
            if changed {
                self.values.insert(path.clone(), args.clone());
                notifications.push((path, args));
            }
        }
        notifications
    }

    /// Records every notification into the snapshot table so `/dump`,
    /// `/dump/save`, and discovery see durec/mix fields the same way they
    /// see plain leaf values.
    fn record_all(&mut self, notifications: Vec<(String, Vec<OscType>)>) -> Vec<(String, Vec<OscType>)> {
        for (path, args) in &notifications {
            self.values.insert(path.clone(), args.clone());
        }
        notifications
    }

    /// A textual snapshot suitable for `/dump`.
    pub fn dump_text(&self) -> String {
        let mut lines: Vec<String> = self
            .values
            .iter()
            .map(|(path, args)| format!("{path} {}", render_args(args)))
            .collect();
        lines.sort();
        lines.join("\n")
    }
}

fn render_args(args: &[OscType]) -> String {
    args.iter()
        .map(|arg| match arg {
            OscType::Int(i) => i.to_string(),
            OscType::Float(f) => f.to_string(),
            OscType::String(s) => s.clone(),
            OscType::Bool(b) => b.to_string(),
            other => format!("{other:?}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rme_params::{Leaf, SemanticType};

    fn sample_mirror() -> DeviceMirror {
        DeviceMirror::new(ParameterTree::new(vec![
            Leaf::new("/input/1/mute", 0x200, SemanticType::Bool),
            Leaf::indexed("/input/*/gain", 0x100, 4, SemanticType::Fixed { scale: 0.1, min: -650, max: 60 }),
        ]))
    }

    #[test]
    fn repeated_identical_values_are_coalesced() {
        let mut mirror = sample_mirror();
        let first = mirror.apply_register(0x200, 1);
        assert_eq!(first.len(), 1);
        let second = mirror.apply_register(0x200, 1);
        assert!(second.is_empty());
    }

    #[test]
    fn changed_values_always_notify() {
        let mut mirror = sample_mirror();
        mirror.apply_register(0x200, 1);
        let changed = mirror.apply_register(0x200, 0);
        assert_eq!(changed.len(), 1);
    }

    #[test]
    fn during_refresh_every_value_notifies_even_if_unchanged() {
        let mut mirror = sample_mirror();
        mirror.apply_register(0x200, 1);
        mirror.apply_register(REFRESH_TRIGGER_REGISTER, REFRESH_TRIGGER_VALUE);
        assert!(mirror.is_refreshing());
        let during = mirror.apply_register(0x200, 1);
        assert_eq!(during.len(), 1, "unchanged value still notifies while refreshing");
        mirror.apply_register(REFRESH_TERMINATOR_REGISTER, 0);
        assert!(!mirror.is_refreshing());
        let after = mirror.apply_register(0x200, 1);
        assert!(after.is_empty(), "coalescing resumes once refresh ends");
    }

    #[test]
    fn unmatched_registers_produce_no_notification() {
        let mut mirror = sample_mirror();
        assert!(mirror.apply_register(0x9999, 5).is_empty());
    }

    #[test]
    fn durec_slot_registers_route_to_the_file_table() {
        let mut mirror = sample_mirror();
        mirror.apply_register(FILE_COUNT_REGISTER, 1);
        let notifications = mirror.apply_register(FILE_SLOT_BASE + 5, 1234);
        assert_eq!(notifications, vec![("/durec/length".to_string(), vec![OscType::Int(0), OscType::Int(1234)])]);
    }
}

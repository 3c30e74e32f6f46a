//! [`MixTable`]: reassembles the four per-pair leg registers a mix write
//! touches into one `/mix/<output>/input/<input>` notification, mirroring
//! [`crate::durec::DurecTable`]'s buffer-until-complete approach for a
//! different multi-register field.

use std::collections::HashMap;

use rme_params::{
    decode_stereo_to_stereo, MixRegisters, MIX_BASE, MIX_INPUT_STRIDE, MIX_OUTPUT_STRIDE, MIX_RIGHT_LEG_OFFSET,
    MIX_SUMMARY_PAN_OFFSET, MIX_SUMMARY_VOL_OFFSET,
};
use rosc::OscType;

/// Which field within a pair's block `register` addresses, if any.
enum Field {
    LeftToLeft,
    LeftToRight,
    RightToLeft,
    RightToRight,
    /// Write-only; the device never needs these read back since the four
    /// leg registers already determine vol/pan/width.
    Summary,
}

fn locate(register: u16) -> Option<(u16, u16, Field)> {
    let rel = register.checked_sub(MIX_BASE)?;
    let output = rel / MIX_OUTPUT_STRIDE;
    let rel_in_output = rel % MIX_OUTPUT_STRIDE;
    let input = rel_in_output / MIX_INPUT_STRIDE;
    let offset = rel_in_output % MIX_INPUT_STRIDE;
    let field = if offset == 0 {
        Field::LeftToLeft
    } else if offset == 1 {
        Field::LeftToRight
    } else if offset == MIX_RIGHT_LEG_OFFSET {
        Field::RightToLeft
    } else if offset == MIX_RIGHT_LEG_OFFSET + 1 {
        Field::RightToRight
    } else if offset == MIX_SUMMARY_VOL_OFFSET || offset == MIX_SUMMARY_PAN_OFFSET {
        Field::Summary
    } else {
        return None;
    };
    Some((output + 1, input + 1, field))
}

#[derive(Default, Clone, Copy)]
struct PendingPair {
    left_to_left: Option<i16>,
    left_to_right: Option<i16>,
    right_to_left: Option<i16>,
    right_to_right: Option<i16>,
}

impl PendingPair {
    fn complete(&self) -> Option<MixRegisters> {
        Some(MixRegisters {
            left_to_left: self.left_to_left?,
            left_to_right: self.left_to_right?,
            right_to_left: self.right_to_left?,
            right_to_right: self.right_to_right?,
            summary_vol_tenths_db: 0,
            summary_pan_percent: 0,
        })
    }
}

/// Buffers the four leg registers of every `(output, input)` mix pair seen
/// so far, emitting a combined `/mix/<output>/input/<input>` notification
/// once all four of a pair's legs are known.
#[derive(Default)]
pub struct MixTable {
    pending: HashMap<(u16, u16), PendingPair>,
}

impl MixTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owns(&self, register: u16) -> bool {
        locate(register).is_some()
    }

    pub fn apply_register(&mut self, register: u16, raw: i16) -> Vec<(String, Vec<OscType>)> {
        let Some((output, input, field)) = locate(register) else {
            return Vec::new();
        };
        let pair = self.pending.entry((output, input)).or_default();
        match field {
            Field::LeftToLeft => pair.left_to_left = Some(raw),
            Field::LeftToRight => pair.left_to_right = Some(raw),
            Field::RightToLeft => pair.right_to_left = Some(raw),
            Field::RightToRight => pair.right_to_right = Some(raw),
            Field::Summary => return Vec::new(),
        }
        let Some(registers) = pair.complete() else {
            return Vec::new();
        };
        let (vol_db, pan, width) = decode_stereo_to_stereo(&registers);
        vec![(
            format!("/mix/{output}/input/{input}"),
            vec![OscType::Float(vol_db as f32), OscType::Float(pan as f32), OscType::Float(width as f32)],
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rme_params::pair_base_register;

    #[test]
    fn notifies_only_once_all_four_legs_are_known() {
        let mut table = MixTable::new();
        let base = pair_base_register(1, 1);
        assert!(table.apply_register(base, -60).is_empty());
        assert!(table.apply_register(base + 1, -650).is_empty());
        assert!(table.apply_register(base + MIX_RIGHT_LEG_OFFSET, -650).is_empty());
        let notifications = table.apply_register(base + MIX_RIGHT_LEG_OFFSET + 1, -60);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].0, "/mix/1/input/1");
    }

    #[test]
    fn summary_registers_produce_no_notification() {
        let mut table = MixTable::new();
        let base = pair_base_register(2, 3);
        assert!(table.apply_register(base + MIX_SUMMARY_VOL_OFFSET, -60).is_empty());
        assert!(table.apply_register(base + MIX_SUMMARY_PAN_OFFSET, 0).is_empty());
    }

    #[test]
    fn unrelated_registers_are_not_owned() {
        let table = MixTable::new();
        assert!(!table.owns(0x0100));
        assert!(table.owns(pair_base_register(1, 1)));
    }
}

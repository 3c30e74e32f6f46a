//! The device-state mirror: a flat, diffed `path -> value` table fed by
//! decoded register updates, plus DURec file-slot reassembly and the
//! refresh protocol that resynchronizes newly-connected clients.

mod durec;
mod mirror;
mod mix;

pub use durec::{DurecTable, FILE_SLOT_BASE, FILE_SLOT_STRIDE};
pub use mirror::{DeviceMirror, FILE_COUNT_REGISTER, REFRESH_TERMINATOR_REGISTER, REFRESH_TRIGGER_REGISTER, REFRESH_TRIGGER_VALUE};
pub use mix::MixTable;

//! Mux select field access.
//!
//! A mux forwards one of up to four parents unchanged; the select field
//! value is the parent slot index. Rate and parent bookkeeping stay in
//! the tree; this module only moves the field.

use crate::io::RegisterIo;
use crate::registry::MuxDesc;

/// Currently selected parent slot.
pub(crate) fn read_index<R: RegisterIo>(io: &R, desc: &MuxDesc) -> usize {
    io.read_field(desc.reg, desc.shift, desc.width) as usize
}

/// Select a parent slot.
pub(crate) fn write_index<R: RegisterIo>(io: &mut R, desc: &MuxDesc, index: usize) {
    io.write_field(desc.reg, desc.shift, desc.width, index as u32);
}

// ============================================================================
// Tests
// ============================================================================

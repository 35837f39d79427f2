//! Clock gate bit protocol.
//!
//! A gate is one bit with one of two polarities: the common CLKGR style
//! where writing 1 stops the clock, and the CE style where 1 lets it run.
//! Gating never changes frequency; only the tree's refcounting decides
//! when these functions are called.

use crate::io::RegisterIo;
use crate::registry::{GateDesc, GateFlags};

/// Drive the gate bit to the requested state.
pub(crate) fn set_enabled<R: RegisterIo>(io: &mut R, desc: &GateDesc, enable: bool) {
    let set_to_disable = desc.flags.contains(GateFlags::SET_TO_DISABLE);
    if enable == set_to_disable {
        io.clear_bit(desc.reg, desc.bit);
    } else {
        io.set_bit(desc.reg, desc.bit);
    }
}

/// Gate state as currently programmed.
pub(crate) fn hw_enabled<R: RegisterIo>(io: &R, desc: &GateDesc) -> bool {
    let bit = io.test_bit(desc.reg, desc.bit);
    bit != desc.flags.contains(GateFlags::SET_TO_DISABLE)
}

// ============================================================================
// Tests
// ============================================================================

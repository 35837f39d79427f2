//! Bus divider rate protocol.
//!
//! A bus divider programs one or two divider fields in its config
//! register, then performs the change-enable handshake against a busy bit
//! that lives in a separate status register. In [`BusDivMode::DualHalf`]
//! the second field gets half the divisor, for the bus pairs that run at a
//! fixed 2:1 ratio off one physical line.

use super::{div_round_closest, wait_for_clear};
use crate::error::RateError;
use crate::io::{field_mask, RegisterIo};
use crate::registry::{BusDivDesc, BusDivMode};

/// Rate as currently programmed (first field is authoritative).
pub(crate) fn recalc<R: RegisterIo>(io: &R, desc: &BusDivDesc, parent_rate: u64) -> u64 {
    let div = io.read_field(desc.reg, desc.shift1, desc.width1) as u64 + 1;
    parent_rate / div
}

/// Divisor that best matches `requested`, clamped to the first field.
fn best_divisor(desc: &BusDivDesc, parent_rate: u64, requested: u64) -> Result<u64, RateError> {
    if requested == 0 {
        return Err(RateError::UnsupportedRate);
    }
    let max = field_mask(desc.width1) as u64 + 1;
    Ok(div_round_closest(parent_rate, requested).clamp(1, max))
}

/// Achievable rate for `requested`, without touching hardware.
pub(crate) fn round_rate(
    desc: &BusDivDesc,
    parent_rate: u64,
    requested: u64,
) -> Result<u64, RateError> {
    Ok(parent_rate / best_divisor(desc, parent_rate, requested)?)
}

/// Program the divider field(s) and run the handshake.
///
/// All field writes and the busy wait happen in one critical section; the
/// caller holds the tree lock across this call.
pub(crate) fn apply_rate<R: RegisterIo>(
    io: &mut R,
    desc: &BusDivDesc,
    name: &str,
    parent_rate: u64,
    requested: u64,
) -> Result<u64, RateError> {
    let div = best_divisor(desc, parent_rate, requested)?;

    io.write_field(desc.reg, desc.shift1, desc.width1, (div - 1) as u32);
    match desc.mode {
        BusDivMode::Single => {}
        BusDivMode::Dual => {
            let max2 = field_mask(desc.width2) as u64 + 1;
            let div2 = div.min(max2);
            io.write_field(desc.reg, desc.shift2, desc.width2, (div2 - 1) as u32);
        }
        BusDivMode::DualHalf => {
            let max2 = field_mask(desc.width2) as u64 + 1;
            let div2 = (div / 2).clamp(1, max2);
            io.write_field(desc.reg, desc.shift2, desc.width2, (div2 - 1) as u32);
        }
    }

    io.set_bit(desc.reg, desc.ce_bit);
    let waited = wait_for_clear(io, desc.busy_reg, desc.busy_bit, name);
    io.clear_bit(desc.reg, desc.ce_bit);
    waited?;

    Ok(parent_rate / div)
}

// ============================================================================
// Tests
// ============================================================================

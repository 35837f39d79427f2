//! Integer divider rate and enable protocol.
//!
//! The divider field encodes `divisor - 1` unless the descriptor carries
//! an explicit value->divisor table. Dividers configured with a
//! change-enable bit run the ce/busy handshake on every rate change;
//! dividers that also have a stop bit gain an enable/disable protocol.

use super::{div_round_closest, wait_for_clear};
use crate::error::RateError;
use crate::io::{field_mask, RegisterIo};
use crate::registry::DivDesc;

/// Divisor as currently programmed.
pub(crate) fn read_divisor<R: RegisterIo>(io: &R, desc: &DivDesc) -> Result<u64, RateError> {
    let value = io.read_field(desc.reg, desc.shift, desc.width);
    match desc.table {
        Some(table) => table
            .iter()
            .find(|entry| entry.value == value)
            .map(|entry| entry.div as u64)
            .ok_or(RateError::InvalidEncoding),
        None => Ok(value as u64 + 1),
    }
}

/// Rate as currently programmed.
pub(crate) fn recalc<R: RegisterIo>(
    io: &R,
    desc: &DivDesc,
    parent_rate: u64,
) -> Result<u64, RateError> {
    Ok(parent_rate / read_divisor(io, desc)?)
}

/// Field value and divisor that best match `requested`.
pub(crate) fn best_divisor(
    desc: &DivDesc,
    parent_rate: u64,
    requested: u64,
) -> Result<(u32, u64), RateError> {
    if requested == 0 {
        return Err(RateError::UnsupportedRate);
    }
    let target = div_round_closest(parent_rate, requested).max(1);
    match desc.table {
        Some(table) => table
            .iter()
            .min_by_key(|entry| (entry.div as u64).abs_diff(target))
            .map(|entry| (entry.value, entry.div as u64))
            .ok_or(RateError::UnsupportedRate),
        None => {
            let max = field_mask(desc.width) as u64 + 1;
            let div = target.clamp(1, max);
            Ok(((div - 1) as u32, div))
        }
    }
}

/// Achievable rate for `requested`, without touching hardware.
pub(crate) fn round_rate(
    desc: &DivDesc,
    parent_rate: u64,
    requested: u64,
) -> Result<u64, RateError> {
    let (_, div) = best_divisor(desc, parent_rate, requested)?;
    Ok(parent_rate / div)
}

/// Program the divider field, running the ce/busy handshake when the
/// descriptor has one.
pub(crate) fn apply_rate<R: RegisterIo>(
    io: &mut R,
    desc: &DivDesc,
    name: &str,
    parent_rate: u64,
    requested: u64,
) -> Result<u64, RateError> {
    let (value, div) = best_divisor(desc, parent_rate, requested)?;
    io.write_field(desc.reg, desc.shift, desc.width, value);

    if let (Some(ce), Some(busy)) = (desc.ce_bit, desc.busy_bit) {
        io.set_bit(desc.reg, ce);
        let waited = wait_for_clear(io, desc.reg, busy, name);
        io.clear_bit(desc.reg, ce);
        waited?;
    }
    Ok(parent_rate / div)
}

/// Enable/disable protocol for dividers with ce and stop bits.
///
/// Enable: assert ce and release stop in one write, wait for busy to
/// clear, release ce. Disable: assert ce and stop, release ce, no wait.
/// Dividers without the bits have no enable hardware; this is a no-op.
pub(crate) fn set_enabled<R: RegisterIo>(
    io: &mut R,
    desc: &DivDesc,
    name: &str,
    enable: bool,
) -> Result<(), RateError> {
    let (Some(ce), Some(stop)) = (desc.ce_bit, desc.stop_bit) else {
        return Ok(());
    };
    if enable {
        io.modify(desc.reg, |v| (v | (1 << ce)) & !(1 << stop));
        let waited = match desc.busy_bit {
            Some(busy) => wait_for_clear(io, desc.reg, busy, name),
            None => Ok(()),
        };
        io.clear_bit(desc.reg, ce);
        waited
    } else {
        io.modify(desc.reg, |v| v | (1 << ce) | (1 << stop));
        io.clear_bit(desc.reg, ce);
        Ok(())
    }
}

/// True when the divider has enable hardware.
pub(crate) fn has_enable_protocol(desc: &DivDesc) -> bool {
    desc.ce_bit.is_some() && desc.stop_bit.is_some()
}

// ============================================================================
// Tests
// ============================================================================

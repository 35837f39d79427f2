//! PLL rate and enable protocol.
//!
//! Rate is `parent * m / (n * od1 * od0)`. The od fields carry small
//! encodings that decode through the descriptor's lookup table; rates are
//! only programmable from the discrete rate table. After programming or
//! enabling, the lock/stable bit is polled with a bounded wait.

use super::wait_for_set;
use crate::error::RateError;
use crate::io::RegisterIo;
use crate::registry::PllDesc;

/// Decode an output-divider field value through the encoding table.
fn decode_od(desc: &PllDesc, value: u32) -> Result<u64, RateError> {
    match desc.od_encoding.get(value as usize) {
        Some(&div) if div != 0 => Ok(div as u64),
        _ => Err(RateError::InvalidEncoding),
    }
}

/// Rate as currently programmed.
pub(crate) fn recalc<R: RegisterIo>(
    io: &R,
    desc: &PllDesc,
    parent_rate: u64,
) -> Result<u64, RateError> {
    let m = io.read_field(desc.reg, desc.m_shift, desc.m_width) as u64;
    let n = io.read_field(desc.reg, desc.n_shift, desc.n_width) as u64;
    let od1 = decode_od(desc, io.read_field(desc.reg, desc.od1_shift, desc.od1_width))?;
    let od0 = decode_od(desc, io.read_field(desc.reg, desc.od0_shift, desc.od0_width))?;
    if n == 0 {
        return Err(RateError::InvalidEncoding);
    }
    Ok(parent_rate * m / (n * od1 * od0))
}

/// Rate table entry for an exact requested rate.
pub(crate) fn round_rate(desc: &PllDesc, requested: u64) -> Result<u64, RateError> {
    desc.rate_table
        .iter()
        .find(|entry| entry.rate == requested)
        .map(|entry| entry.rate)
        .ok_or(RateError::UnsupportedRate)
}

/// Program the rate-table entry matching `requested`.
///
/// Validation (table lookup, od encodings) happens before any register
/// write. The stability poll only runs when the PLL is enabled; a powered
/// down PLL never asserts lock.
pub(crate) fn apply_rate<R: RegisterIo>(
    io: &mut R,
    desc: &PllDesc,
    name: &str,
    requested: u64,
) -> Result<u64, RateError> {
    let entry = desc
        .rate_table
        .iter()
        .find(|entry| entry.rate == requested)
        .ok_or(RateError::UnsupportedRate)?;
    decode_od(desc, entry.od1)?;
    decode_od(desc, entry.od0)?;

    io.write_field(desc.reg, desc.m_shift, desc.m_width, entry.m);
    io.write_field(desc.reg, desc.n_shift, desc.n_width, entry.n);
    io.write_field(desc.reg, desc.od1_shift, desc.od1_width, entry.od1);
    io.write_field(desc.reg, desc.od0_shift, desc.od0_width, entry.od0);

    if io.test_bit(desc.reg, desc.enable_bit) {
        wait_for_set(io, desc.reg, desc.stable_bit, name)?;
    }
    Ok(entry.rate)
}

/// Drive the enable bit; on enable, wait for lock.
pub(crate) fn set_enabled<R: RegisterIo>(
    io: &mut R,
    desc: &PllDesc,
    name: &str,
    enable: bool,
) -> Result<(), RateError> {
    if enable {
        io.set_bit(desc.reg, desc.enable_bit);
        wait_for_set(io, desc.reg, desc.stable_bit, name)
    } else {
        io.clear_bit(desc.reg, desc.enable_bit);
        Ok(())
    }
}

/// True when the enable bit is set.
pub(crate) fn hw_enabled<R: RegisterIo>(io: &R, desc: &PllDesc) -> bool {
    io.test_bit(desc.reg, desc.enable_bit)
}

// ============================================================================
// Tests
// ============================================================================

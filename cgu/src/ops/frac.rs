//! Fractional divider rate protocol.
//!
//! Rate is `parent * m / n` with both fields free-running; no handshake.
//! `set_rate` finds the best rational approximation of `requested /
//! parent` that fits the field widths (continued-fraction walk with a
//! semi-convergent check, the same scheme the kernel's rational-fraction
//! helper uses for these dividers).

use crate::error::RateError;
use crate::io::{field_mask, RegisterIo};
use crate::registry::FracDesc;

/// Best rational approximation of `num / den` with both terms bounded.
pub(crate) fn best_approximation(num: u64, den: u64, max_num: u64, max_den: u64) -> (u64, u64) {
    let (mut n, mut d) = (num, den);
    let (mut n0, mut d0) = (0u64, 1u64);
    let (mut n1, mut d1) = (1u64, 0u64);

    while d != 0 {
        let a = n / d;
        let rem = n % d;
        let dp = d;
        n = d;
        d = rem;

        let n2 = n0 + a * n1;
        let d2 = d0 + a * d1;
        if n2 > max_num || d2 > max_den {
            let t_num = if n1 != 0 { (max_num - n0) / n1 } else { u64::MAX };
            let t_den = if d1 != 0 { (max_den - d0) / d1 } else { u64::MAX };
            let t = t_num.min(t_den);
            // Take the semi-convergent only when it beats the last
            // convergent.
            if 2 * t > a || (2 * t == a && d0 * dp > d1 * d) {
                n1 = n0 + t * n1;
                d1 = d0 + t * d1;
            }
            break;
        }
        n0 = n1;
        d0 = d1;
        n1 = n2;
        d1 = d2;
    }
    (n1, d1)
}

/// Rate as currently programmed. Unprogrammed fields (m or n of 0) read
/// as a stopped output.
pub(crate) fn recalc<R: RegisterIo>(io: &R, desc: &FracDesc, parent_rate: u64) -> u64 {
    let m = io.read_field(desc.reg, desc.m_shift, desc.m_width) as u64;
    let n = io.read_field(desc.reg, desc.n_shift, desc.n_width) as u64;
    if m == 0 || n == 0 {
        return 0;
    }
    parent_rate * m / n
}

/// m/n pair that best matches `requested`.
fn best_ratio(desc: &FracDesc, parent_rate: u64, requested: u64) -> Result<(u64, u64), RateError> {
    if requested == 0 || parent_rate == 0 {
        return Err(RateError::UnsupportedRate);
    }
    let max_m = field_mask(desc.m_width) as u64;
    let max_n = field_mask(desc.n_width) as u64;
    let (m, n) = best_approximation(requested, parent_rate, max_m, max_n);
    if m == 0 || n == 0 {
        return Err(RateError::UnsupportedRate);
    }
    Ok((m, n))
}

/// Achievable rate for `requested`, without touching hardware.
pub(crate) fn round_rate(
    desc: &FracDesc,
    parent_rate: u64,
    requested: u64,
) -> Result<u64, RateError> {
    let (m, n) = best_ratio(desc, parent_rate, requested)?;
    Ok(parent_rate * m / n)
}

/// Program both fields.
pub(crate) fn apply_rate<R: RegisterIo>(
    io: &mut R,
    desc: &FracDesc,
    parent_rate: u64,
    requested: u64,
) -> Result<u64, RateError> {
    let (m, n) = best_ratio(desc, parent_rate, requested)?;
    io.write_field(desc.reg, desc.m_shift, desc.m_width, m as u32);
    io.write_field(desc.reg, desc.n_shift, desc.n_width, n as u32);
    Ok(parent_rate * m / n)
}

// ============================================================================
// Tests
// ============================================================================

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers: GCD and checked LCM over integer and
//! two-decimal periods.

use super::HyperperiodError;
use crate::model::Time;

/// Scale used to turn two-decimal server periods into integers.
pub const CENTI: f64 = 100.0;

/// Iterative Euclidean GCD.  `gcd(0, x) == x`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Checked LCM: `Err(HyperperiodError::Overflow { a, b })` if the result does
/// not fit in `u64`.  Returns `Ok(0)` when either input is `0`.
pub fn lcm(a: u64, b: u64) -> Result<u64, HyperperiodError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }
    (a / gcd(a, b))
        .checked_mul(b)
        .ok_or(HyperperiodError::Overflow { a, b })
}

/// LCM of all periods.  `Ok(0)` for an empty slice.
pub fn lcm_of_slice(periods: &[Time]) -> Result<Time, HyperperiodError> {
    periods
        .iter()
        .try_fold(periods.first().copied().unwrap_or(0), |acc, &p| lcm(acc, p))
}

/// LCM of fractional periods that carry at most two decimals (server
/// periods after Half-Half rounding).
///
/// Periods are scaled to hundredths, combined exactly, and scaled back.
pub fn lcm_of_fractional(periods: &[f64]) -> Result<f64, HyperperiodError> {
    let scaled: Vec<u64> = periods
        .iter()
        .map(|p| (p * CENTI).round().max(0.0) as u64)
        .collect();
    Ok(lcm_of_slice(&scaled)? as f64 / CENTI)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

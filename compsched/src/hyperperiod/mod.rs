//! Hyperperiod calculation with an absolute cap.
//!
//! The hyperperiod (LCM of all periods) bounds three things in this crate:
//! the demand/supply scan of the search engine, the periodic peak check at
//! the parent level, and the default simulation horizon.  All three need a
//! *finite, small* window, so the raw LCM is clamped to a limit.
//!
//! | Situation | [`HyperperiodCalculator::calculate`] | [`HyperperiodCalculator::bounded`] |
//! |-----------|-----------|-----------|
//! | no periods | `Err(NoValidPeriods)` | `0` |
//! | LCM overflows `u64` | `Err(Overflow)` | limit |
//! | LCM above limit | `Err(TooLarge)` | limit |
//! | otherwise | `Ok(lcm)` | LCM |

pub mod math;

use tracing::{debug, warn};

use crate::model::Time;
use math::{lcm_of_fractional, lcm_of_slice};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default absolute cap on any analysis or simulation window.
pub const DEFAULT_HORIZON_CAP: Time = 10_000;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur during hyperperiod calculation.
#[derive(Debug, PartialEq, Eq)]
pub enum HyperperiodError {
    /// The period list was empty (or all periods were zero).
    NoValidPeriods,

    /// LCM calculation overflowed `u64`.
    Overflow { a: u64, b: u64 },

    /// The calculated hyperperiod exceeded the configured limit.
    TooLarge { value: u64, limit: u64 },
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::NoValidPeriods => write!(f, "no valid (non-zero) period"),
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
            HyperperiodError::TooLarge { value, limit } => {
                write!(f, "hyperperiod {value} exceeds limit {limit}")
            }
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── HyperperiodCalculator ─────────────────────────────────────────────────────

/// Computes hyperperiods clamped to a fixed limit.
#[derive(Debug, Clone, Copy)]
pub struct HyperperiodCalculator {
    limit: Time,
}

impl HyperperiodCalculator {
    pub fn with_limit(limit: Time) -> Self {
        Self { limit }
    }

    /// Exact hyperperiod of `periods`.
    ///
    /// # Errors
    /// * [`HyperperiodError::NoValidPeriods`] – no non-zero period.
    /// * [`HyperperiodError::Overflow`] – LCM exceeded `u64`.
    /// * [`HyperperiodError::TooLarge`] – LCM exceeds the limit.
    pub fn calculate(&self, periods: &[Time]) -> Result<Time, HyperperiodError> {
        let unique_periods: Vec<Time> = {
            let mut v: Vec<Time> = periods.iter().copied().filter(|&p| p > 0).collect();
            v.sort_unstable();
            v.dedup();
            v
        };
        if unique_periods.is_empty() {
            return Err(HyperperiodError::NoValidPeriods);
        }

        let hyperperiod = lcm_of_slice(&unique_periods)?;
        if hyperperiod > self.limit {
            return Err(HyperperiodError::TooLarge {
                value: hyperperiod,
                limit: self.limit,
            });
        }

        debug!(hyperperiod, unique = unique_periods.len(), "hyperperiod");
        Ok(hyperperiod)
    }

    /// Hyperperiod clamped to the limit; `0` when there are no periods.
    ///
    /// `label` only identifies the period set in log output.
    pub fn bounded(&self, label: &str, periods: &[Time]) -> Time {
        match self.calculate(periods) {
            Ok(hyperperiod) => hyperperiod,
            Err(HyperperiodError::NoValidPeriods) => 0,
            Err(e) => {
                warn!(label, limit = self.limit, "{e}; clamping to limit");
                self.limit
            }
        }
    }

    /// LCM of two-decimal server periods, clamped to the limit.
    pub fn bounded_fractional(&self, label: &str, periods: &[f64]) -> f64 {
        if periods.iter().all(|&p| p <= 0.0) {
            return 0.0;
        }
        match lcm_of_fractional(periods) {
            Ok(l) if l <= self.limit as f64 => l,
            Ok(l) => {
                debug!(label, lcm = l, limit = self.limit, "server LCM clamped to limit");
                self.limit as f64
            }
            Err(e) => {
                warn!(label, limit = self.limit, "{e}; clamping to limit");
                self.limit as f64
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Interface schedulability of the servers sharing one unit-rate core.
//!
//! Three interchangeable tests, selected by [`PeakCheck`]:
//!
//! | Strategy        | Condition                                                |
//! |-----------------|----------------------------------------------------------|
//! | `utilization`   | `Σ Q/P ≤ 1`                                              |
//! | `periodic_peak` | `Σ ⌊t/P⌋·Q ≤ t` at every server release up to the LCM    |
//! | `delay_curve`   | `Σ αᵢ·max(0, t − Δᵢ) ≤ t` for `t ∈ {0} ∪ {Δᵢ}`           |
//!
//! with `αᵢ = Q/P` and `Δᵢ = P − Q` in the delay-curve test.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::hyperperiod::HyperperiodCalculator;
use crate::model::PeriodicServer;

/// Absolute slack on every `≤ t` comparison; servers are rounded to 0.01.
const PEAK_SLACK: f64 = 1e-6;

/// Strategy of the core-level interface test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakCheck {
    Utilization,
    #[default]
    PeriodicPeak,
    DelayCurve,
}

impl fmt::Display for PeakCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeakCheck::Utilization => "utilization",
            PeakCheck::PeriodicPeak => "periodic_peak",
            PeakCheck::DelayCurve => "delay_curve",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PeakCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "utilization" => Ok(PeakCheck::Utilization),
            "periodic_peak" => Ok(PeakCheck::PeriodicPeak),
            "delay_curve" => Ok(PeakCheck::DelayCurve),
            other => Err(format!(
                "unknown peak check '{other}' (expected utilization, periodic_peak or delay_curve)"
            )),
        }
    }
}

impl PeakCheck {
    /// `true` when `servers` fit together on one unit-rate core.
    ///
    /// `lcm_limit` caps the periodic-peak scan window.
    pub fn admits(self, servers: &[&PeriodicServer], lcm_limit: u64) -> bool {
        if servers.is_empty() {
            return true;
        }
        match self {
            PeakCheck::Utilization => utilization_fits(servers),
            PeakCheck::PeriodicPeak => periodic_peak_fits(servers, lcm_limit),
            PeakCheck::DelayCurve => delay_curve_fits(servers),
        }
    }
}

// ── Strategies ────────────────────────────────────────────────────────────────

pub fn utilization_fits(servers: &[&PeriodicServer]) -> bool {
    servers.iter().map(|s| s.bandwidth()).sum::<f64>() <= 1.0 + PEAK_SLACK
}

/// Completed server periods inside a window of length `t`.
fn server_jobs(t: f64, period: f64) -> f64 {
    if period <= 0.0 {
        return 0.0;
    }
    (t / period + PEAK_SLACK).floor()
}

pub fn periodic_peak_fits(servers: &[&PeriodicServer], lcm_limit: u64) -> bool {
    let periods: Vec<f64> = servers.iter().map(|s| s.period).collect();
    let window = HyperperiodCalculator::with_limit(lcm_limit).bounded_fractional("servers", &periods);

    periods
        .iter()
        .filter(|&&p| p > 0.0)
        .flat_map(|&p| {
            (1..)
                .map(move |k| k as f64 * p)
                .take_while(move |&t| t <= window + PEAK_SLACK)
        })
        .sorted_by(f64::total_cmp)
        .dedup_by(|a, b| (a - b).abs() <= PEAK_SLACK)
        .all(|t| {
            let demand: f64 = servers.iter().map(|s| server_jobs(t, s.period) * s.budget).sum();
            demand <= t + PEAK_SLACK
        })
}

pub fn delay_curve_fits(servers: &[&PeriodicServer]) -> bool {
    let curves: Vec<(f64, f64)> = servers.iter().map(|s| (s.bandwidth(), s.blackout())).collect();

    std::iter::once(0.0)
        .chain(curves.iter().map(|&(_, delta)| delta))
        .all(|t| {
            let demand: f64 = curves.iter().map(|&(alpha, delta)| alpha * (t - delta).max(0.0)).sum();
            demand <= t + PEAK_SLACK
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

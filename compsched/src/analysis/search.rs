/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Minimal BDR interface search.
//!
//! Finds the lexicographically smallest `(Δ, α)` such that the linear supply
//! `α·max(0, t − Δ)` dominates the demand-bound function at every integer
//! `t` in `1..=horizon`.
//!
//! For each `Δ = 0, 1, …, max_delay`:
//! 1. every `t ≤ Δ` must carry zero demand, otherwise `Δ` is rejected;
//! 2. every `t > Δ` gives `ratio = demand(t) / (t − Δ)`; a ratio above 1
//!    rejects `Δ`;
//! 3. the worst ratio, rounded **up** to the α granularity, is the smallest
//!    α that works at this `Δ`.
//!
//! The first `Δ` that survives wins: a smaller delay composes better than a
//! smaller rate.

use tracing::debug;

use super::demand::demand;
use super::error::SearchFailure;
use crate::config::Settings;
use crate::hyperperiod::HyperperiodCalculator;
use crate::model::{BdrInterface, Policy, Task, Time};

/// Relative slack (in granularity steps) under which a ratio is treated as
/// already sitting on a grid point.  Keeps `0.2 / 0.01 = 20.000000000000004`
/// from rounding up to `0.21`.
const GRID_SLACK: f64 = 1e-9;

// ── Parameters ────────────────────────────────────────────────────────────────

/// Bounds of one search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// α rounding step.
    pub granularity: f64,
    /// Largest Δ tried.
    pub max_delay: Time,
    /// Absolute cap on the scanned horizon.
    pub horizon_cap: Time,
    /// Slack on the `ratio ≤ 1` test.
    pub tolerance: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SearchParams {
    fn from(s: &Settings) -> Self {
        Self {
            granularity: s.alpha_granularity,
            max_delay: s.max_delay,
            horizon_cap: s.horizon_cap,
            tolerance: s.tolerance,
        }
    }
}

/// A feasible interface together with the horizon it was verified over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    pub interface: BdrInterface,
    pub horizon: Time,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Round `value` up to the next multiple of `granularity`.
///
/// Values within [`GRID_SLACK`] steps of a grid point snap to it; anything
/// else goes to the next grid point, so the result never undershoots.
pub fn ceil_to_granularity(value: f64, granularity: f64) -> f64 {
    let steps = value / granularity;
    let nearest = steps.round();
    let steps = if (steps - nearest).abs() <= GRID_SLACK {
        nearest
    } else {
        steps.ceil()
    };
    steps * granularity
}

/// Window scanned by the search:
/// `min(2·max_delay, hyperperiod, cap)`, stretched to the longest period
/// (still capped) so that every task contributes at least one job.
pub fn search_horizon(tasks: &[Task], params: &SearchParams) -> Time {
    let periods: Vec<Time> = tasks.iter().map(|t| t.period).collect();
    let hyperperiod = HyperperiodCalculator::with_limit(params.horizon_cap).bounded("search", &periods);
    let longest = periods.iter().copied().max().unwrap_or(0);

    params
        .max_delay
        .saturating_mul(2)
        .min(hyperperiod)
        .min(params.horizon_cap)
        .max(longest.min(params.horizon_cap))
}

/// Result of scanning one candidate `Δ`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DelayScan {
    Feasible { worst_ratio: f64 },
    /// Demand appears at `t ≤ Δ`, before any supply.
    EarlyDemand { t: Time },
    /// `demand(t) / (t − Δ)` exceeds 1.
    Overload { t: Time, ratio: f64 },
}

fn scan_delay(policy: Policy, tasks: &[Task], delta: Time, horizon: Time, tolerance: f64) -> DelayScan {
    let mut worst_ratio = 0.0_f64;
    for t in 1..=horizon {
        let d = demand(policy, tasks, t);
        if t <= delta {
            if d > 0.0 {
                return DelayScan::EarlyDemand { t };
            }
            continue;
        }
        let ratio = d / (t - delta) as f64;
        if ratio > 1.0 + tolerance {
            return DelayScan::Overload { t, ratio };
        }
        worst_ratio = worst_ratio.max(ratio);
    }
    DelayScan::Feasible { worst_ratio }
}

// ── Search ────────────────────────────────────────────────────────────────────

/// Smallest `(Δ, α)` interface for `tasks` under `policy`.
///
/// `tasks` must already be in priority order when `policy` is RM.
///
/// # Errors
/// [`SearchFailure::Exhausted`] when no `Δ ≤ max_delay` admits an `α ≤ 1`.
pub fn find_interface(policy: Policy, tasks: &[Task], params: &SearchParams) -> Result<SearchOutcome, SearchFailure> {
    let horizon = search_horizon(tasks, params);
    let g = params.granularity;

    for delta in 0..=params.max_delay {
        match scan_delay(policy, tasks, delta, horizon, params.tolerance) {
            DelayScan::Feasible { worst_ratio } => {
                let alpha = if worst_ratio >= 1.0 {
                    1.0
                } else {
                    ceil_to_granularity(worst_ratio, g).max(g)
                };
                if alpha > 1.0 {
                    debug!(%policy, delta, alpha, "α above 1 after rounding, rejected");
                    continue;
                }
                debug!(%policy, delta, alpha, horizon, "feasible interface");
                return Ok(SearchOutcome {
                    interface: BdrInterface {
                        alpha,
                        delta: delta as f64,
                    },
                    horizon,
                });
            }
            DelayScan::EarlyDemand { t } => {
                debug!(%policy, delta, t, "demand before supply starts, Δ rejected");
            }
            DelayScan::Overload { t, ratio } => {
                debug!(%policy, delta, t, ratio, "demand exceeds unit rate, Δ rejected");
            }
        }
    }

    Err(SearchFailure::Exhausted {
        max_delay: params.max_delay,
        horizon,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn task(name: &str, wcet: f64, period: Time, priority: Option<u32>) -> Task {
        Task {
            name: name.into(),
            wcet,
            wcet_effective: wcet,
            period,
            component_id: "c".into(),
            priority,
        }
    }

    fn rm_pair() -> Vec<Task> {
        vec![task("hi", 1.0, 4, Some(0)), task("lo", 2.0, 10, Some(1))]
    }

    /// Supply dominates demand over the whole verified horizon.
    fn assert_dominates(policy: Policy, tasks: &[Task], outcome: &SearchOutcome) {
        for t in 1..=outcome.horizon {
            let d = demand(policy, tasks, t);
            let s = outcome.interface.supply(t as f64);
            assert!(d <= s + 1e-9, "demand {d} > supply {s} at t={t}");
        }
    }

    // ── ceil_to_granularity ───────────────────────────────────────────────────

    #[test]
    fn ceil_keeps_exact_grid_points() {
        assert_approx_eq!(ceil_to_granularity(0.2, 0.01), 0.20);
        assert_approx_eq!(ceil_to_granularity(0.45, 0.01), 0.45);
        assert_approx_eq!(ceil_to_granularity(1.0, 0.01), 1.0);
    }

    #[test]
    fn ceil_never_undershoots() {
        assert_approx_eq!(ceil_to_granularity(0.201, 0.01), 0.21);
        assert_approx_eq!(ceil_to_granularity(1.0 / 3.0, 0.01), 0.34);
        for i in 1..1000 {
            let v = i as f64 / 997.0;
            assert!(ceil_to_granularity(v, 0.01) >= v - 1e-12);
        }
    }

    // ── search_horizon ────────────────────────────────────────────────────────

    #[test]
    fn horizon_is_hyperperiod_when_short() {
        assert_eq!(search_horizon(&rm_pair(), &SearchParams::default()), 20);
    }

    #[test]
    fn horizon_is_bounded_by_twice_max_delay() {
        let tasks = [task("a", 1.0, 70, None), task("b", 1.0, 90, None)];
        // lcm = 630, 2·Δmax = 200
        assert_eq!(search_horizon(&tasks, &SearchParams::default()), 200);
    }

    #[test]
    fn horizon_covers_longest_period() {
        let tasks = [task("a", 1.0, 300, None)];
        assert_eq!(search_horizon(&tasks, &SearchParams::default()), 300);
    }

    #[test]
    fn horizon_respects_cap() {
        let params = SearchParams {
            horizon_cap: 50,
            ..SearchParams::default()
        };
        let tasks = [task("a", 1.0, 300, None)];
        assert_eq!(search_horizon(&tasks, &params), 50);
    }

    // ── find_interface ────────────────────────────────────────────────────────

    #[test]
    fn single_edf_task_needs_twenty_percent() {
        let tasks = [task("a", 2.0, 10, None)];
        let out = find_interface(Policy::Edf, &tasks, &SearchParams::default()).unwrap();
        assert_eq!(out.interface.delta, 0.0);
        assert_approx_eq!(out.interface.alpha, 0.20);
    }

    #[test]
    fn rm_interface_satisfies_rm_demand_everywhere() {
        let tasks = rm_pair();
        let out = find_interface(Policy::Rm, &tasks, &SearchParams::default()).unwrap();
        assert_eq!(out.interface.delta, 0.0);
        assert_approx_eq!(out.interface.alpha, 0.45); // worst at t = 20: 9 / 20
        assert_dominates(Policy::Rm, &tasks, &out);
    }

    #[test]
    fn alpha_is_minimal_at_chosen_delay() {
        let params = SearchParams::default();
        for tasks in [rm_pair(), vec![task("a", 3.0, 7, None), task("b", 1.5, 5, None)]] {
            let out = find_interface(Policy::Edf, &tasks, &params).unwrap();
            let smaller = BdrInterface {
                alpha: out.interface.alpha - params.granularity,
                delta: out.interface.delta,
            };
            let violated = (1..=out.horizon).any(|t| demand(Policy::Edf, &tasks, t) > smaller.supply(t as f64) + 1e-9);
            assert!(violated, "α − granularity should not dominate demand");
        }
    }

    #[test]
    fn overloaded_task_set_is_infeasible() {
        let tasks = [task("a", 3.0, 4, None), task("b", 2.0, 4, None)];
        let err = find_interface(Policy::Edf, &tasks, &SearchParams::default()).unwrap_err();
        assert!(matches!(err, SearchFailure::Exhausted { max_delay: 100, .. }));
    }

    #[test]
    fn full_utilization_needs_the_whole_core() {
        let tasks = [task("a", 2.0, 4, None), task("b", 2.0, 4, None)];
        let out = find_interface(Policy::Edf, &tasks, &SearchParams::default()).unwrap();
        assert_approx_eq!(out.interface.alpha, 1.0);
        assert_eq!(out.interface.delta, 0.0);
    }

    #[test]
    fn larger_wcet_never_shrinks_the_interface() {
        let params = SearchParams::default();
        let mut previous = 0.0;
        for step in 1..=20 {
            let wcet = step as f64 * 0.5;
            let tasks = [task("a", 1.0, 5, None), task("b", wcet, 10, None)];
            match find_interface(Policy::Edf, &tasks, &params) {
                Ok(out) => {
                    assert!(out.interface.alpha >= previous - 1e-12);
                    previous = out.interface.alpha;
                }
                Err(_) => previous = f64::INFINITY,
            }
        }
        assert!(previous.is_infinite(), "wcet 10 on period 10 plus 20% must be infeasible");
    }

    #[test]
    fn repeated_searches_are_identical() {
        let tasks = rm_pair();
        let params = SearchParams::default();
        let first = find_interface(Policy::Rm, &tasks, &params).unwrap();
        for _ in 0..5 {
            assert_eq!(find_interface(Policy::Rm, &tasks, &params).unwrap(), first);
        }
    }

    #[test]
    fn empty_task_set_gets_one_granule() {
        let out = find_interface(Policy::Edf, &[], &SearchParams::default()).unwrap();
        assert_approx_eq!(out.interface.alpha, 0.01);
        assert_eq!(out.interface.delta, 0.0);
    }

    #[test]
    fn early_demand_rejects_delay() {
        let tasks = [task("a", 1.0, 2, None)];
        assert_eq!(scan_delay(Policy::Edf, &tasks, 3, 10, 1e-6), DelayScan::EarlyDemand { t: 2 });
    }
}

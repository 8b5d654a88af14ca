/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Empirical budget tuning.
//!
//! For a fixed server period, binary-search the smallest budget `Q` with
//! which the component, simulated alone on a dedicated core, misses no
//! deadline.  The analytic interface is a sufficient bound; the tuned budget
//! shows how much slack it carries.

use tracing::{debug, info};

use super::{run_core, CarryOver, ComponentState, TaskOutcome};
use crate::hyperperiod::HyperperiodCalculator;
use crate::model::{Component, Policy, Time};
use crate::analysis::search::ceil_to_granularity;
use crate::server::{round2, SERVER_STEP};

/// Search stops once the bracket is narrower than this.
pub const TUNING_PRECISION: f64 = 0.1;

/// Result of one tuning run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunedBudget {
    pub budget: f64,
    pub period: f64,
    pub horizon: Time,
}

/// `true` when `component` meets every deadline on a `(budget, period)`
/// server over `horizon`.
pub fn meets_deadlines(
    component: &Component,
    policy: Policy,
    budget: f64,
    period: f64,
    horizon: Time,
    carry_over: CarryOver,
) -> bool {
    let mut states = [ComponentState::new(component, policy, Some((budget, period)))];
    run_core(policy, &mut states, horizon, carry_over);
    states[0].task_outcomes().iter().all(TaskOutcome::schedulable)
}

/// Smallest budget (to [`TUNING_PRECISION`]) in `[U·P, P]` that keeps
/// `component` miss-free with server period `period`.
///
/// The horizon spans the task hyperperiod and the (rounded-up) server period,
/// capped at `horizon_cap`.
///
/// Returns `None` when even a full-period budget misses deadlines.
pub fn tune_budget(
    component: &Component,
    policy: Policy,
    period: f64,
    horizon_cap: Time,
    carry_over: CarryOver,
) -> Option<TunedBudget> {
    let mut periods = component.periods();
    periods.push(period.ceil() as Time);
    let horizon = HyperperiodCalculator::with_limit(horizon_cap).bounded(&component.id, &periods);
    let ok = |q: f64| meets_deadlines(component, policy, q, period, horizon, carry_over);

    if !ok(period) {
        info!(component = %component.id, period, "✗ not schedulable even with a full budget");
        return None;
    }

    let mut low = (component.utilization() * period).min(period);
    let mut high = period;
    if ok(low) {
        high = low;
    }
    while high - low > TUNING_PRECISION {
        let mid = round2((low + high) / 2.0);
        if mid <= low || mid >= high {
            break;
        }
        if ok(mid) {
            high = mid;
        } else {
            low = mid;
        }
        debug!(component = %component.id, low, high, "budget bracket");
    }

    // `high` passed the simulation; rounding must not go below it.
    let tuned = TunedBudget {
        budget: ceil_to_granularity(high, SERVER_STEP).min(period),
        period,
        horizon,
    };
    info!(
        component = %component.id,
        budget = tuned.budget,
        period,
        horizon,
        "tuned budget"
    );
    Some(tuned)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

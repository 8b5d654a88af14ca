/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Demand-bound functions of implicit-deadline periodic task sets.
//!
//! Both functions are pure: they read the task slice and the window length
//! and return the worst-case execution demand in that window.

use crate::model::{Policy, Task, Time};

/// Generic interface for processor demand over an interval.
pub trait DemandBound {
    /// Worst-case execution demand within a window of length `t`.
    fn demand(&self, t: Time) -> f64;
}

/// Number of implicit-deadline jobs of a task with period `period` that are
/// both released and due within a window of length `t`.
///
/// `0` if `t < period`, else `⌊(t − period) / period⌋ + 1`.
pub fn jobs(t: Time, period: Time) -> u64 {
    if period == 0 || t < period {
        0
    } else {
        (t - period) / period + 1
    }
}

/// EDF demand: every task contributes all its complete jobs.
#[derive(Debug, Clone, Copy)]
pub struct EdfDemand<'a> {
    pub tasks: &'a [Task],
}

impl DemandBound for EdfDemand<'_> {
    fn demand(&self, t: Time) -> f64 {
        self.tasks
            .iter()
            .map(|task| jobs(t, task.period) as f64 * task.wcet_effective)
            .sum()
    }
}

/// RM demand over a task slice sorted ascending by priority value.
///
/// Task `i` sees its own jobs plus those of every equal or higher priority
/// task before it; the bound is the largest such prefix sum.
#[derive(Debug, Clone, Copy)]
pub struct RmDemand<'a> {
    pub tasks: &'a [Task],
}

impl DemandBound for RmDemand<'_> {
    fn demand(&self, t: Time) -> f64 {
        self.tasks
            .iter()
            .scan(0.0, |prefix, task| {
                *prefix += jobs(t, task.period) as f64 * task.wcet_effective;
                Some(*prefix)
            })
            .fold(0.0, f64::max)
    }
}

/// Demand of `tasks` at `t` under `policy`.
pub fn demand(policy: Policy, tasks: &[Task], t: Time) -> f64 {
    match policy {
        Policy::Rm => RmDemand { tasks }.demand(t),
        Policy::Edf => EdfDemand { tasks }.demand(t),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core records of the compositional model.
//!
//! ```text
//! case file ──(config)──►  Workload { Core, Component { Task } }
//!                               │
//!                               ├──(analysis)──►  BdrInterface (α, Δ)
//!                               └──(server)────►  PeriodicServer (Q, P)
//! ```
//!
//! # Ownership model
//! A [`Workload`] is built once by the boundary loader and never mutated
//! afterwards.  Every later stage borrows it; derived records
//! ([`BdrInterface`], [`PeriodicServer`]) are small `Clone` values keyed by
//! component id.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Time ──────────────────────────────────────────────────────────────────────

/// Discrete time: periods, release instants and horizons.
///
/// Execution amounts (WCET, budgets, rates) stay `f64` because speed scaling
/// makes them fractional.
pub type Time = u64;

// ── Scheduling policy ─────────────────────────────────────────────────────────

/// Local scheduling policy of a component or a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Policy {
    /// Rate-monotonic / fixed priority.  Lower priority value runs first.
    #[serde(rename = "RM", alias = "rm", alias = "Rm")]
    Rm,
    /// Earliest deadline first.
    #[serde(rename = "EDF", alias = "edf", alias = "Edf")]
    Edf,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Rm => write!(f, "RM"),
            Policy::Edf => write!(f, "EDF"),
        }
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// An implicit-deadline periodic task.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,

    /// Worst-case execution time as declared (before speed scaling).
    pub wcet: f64,

    /// `wcet / speed_factor` of the hosting core, computed once at load time.
    pub wcet_effective: f64,

    /// Period, which is also the relative deadline.
    pub period: Time,

    pub component_id: String,

    /// Fixed priority; present for every task of an RM component.
    pub priority: Option<u32>,
}

impl Task {
    /// Effective utilisation `wcet_effective / period`.
    pub fn utilization(&self) -> f64 {
        if self.period == 0 {
            0.0
        } else {
            self.wcet_effective / self.period as f64
        }
    }
}

// ── Core ──────────────────────────────────────────────────────────────────────

/// A processing core hosting one or more components.
#[derive(Debug, Clone, PartialEq)]
pub struct Core {
    pub id: String,
    pub speed_factor: f64,
    /// Policy the core uses to pick among its component servers.
    pub scheduler: Policy,
}

// ── Declared parent budget ────────────────────────────────────────────────────

/// An externally declared BDR budget a parent grants to a component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeclaredBudget {
    pub alpha: f64,
    pub delta: f64,
}

impl DeclaredBudget {
    /// Convert a raw `(budget, period)` reservation: `α = budget / period`,
    /// `Δ = period − budget`.
    pub fn from_raw(budget: f64, period: f64) -> Self {
        Self {
            alpha: budget / period,
            delta: period - budget,
        }
    }
}

// ── Component ─────────────────────────────────────────────────────────────────

/// A schedulable unit: a task set under one local policy, hosted by one core.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: String,
    pub scheduler: Policy,
    pub core_id: String,

    /// Priority among the components of an RM core.
    pub priority: Option<u32>,

    /// Budget the parent declared for this component, if any.
    pub budget: Option<DeclaredBudget>,

    /// Tasks of this component.  Sorted ascending by priority for RM
    /// components; input order for EDF components.
    pub tasks: Vec<Task>,
}

impl Component {
    /// Total effective utilisation of the task set.
    pub fn utilization(&self) -> f64 {
        self.tasks.iter().map(Task::utilization).sum()
    }

    /// Task periods in task order.
    pub fn periods(&self) -> Vec<Time> {
        self.tasks.iter().map(|t| t.period).collect()
    }
}

// ── Derived interfaces ────────────────────────────────────────────────────────

/// Bounded-delay resource interface: supply `α·max(0, t − Δ)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BdrInterface {
    pub alpha: f64,
    pub delta: f64,
}

impl BdrInterface {
    /// Guaranteed supply over an interval of length `t`.
    pub fn supply(&self, t: f64) -> f64 {
        self.alpha * (t - self.delta).max(0.0)
    }
}

/// Periodic server `(Q, P)` derived from a [`BdrInterface`].
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicServer {
    pub component_id: String,
    /// Budget `Q`, replenished every `period`.
    pub budget: f64,
    /// Period `P`.
    pub period: f64,
    /// Policy the component uses internally while running on this server.
    pub scheduler: Policy,
}

impl PeriodicServer {
    /// Bandwidth `Q / P`.
    pub fn bandwidth(&self) -> f64 {
        self.budget / self.period
    }

    /// Worst-case starvation of the server, `P − Q`.
    pub fn blackout(&self) -> f64 {
        self.period - self.budget
    }
}

// ── Workload ──────────────────────────────────────────────────────────────────

/// A validated, immutable analysis input: cores and their components.
///
/// Only the boundary loader in [`crate::config`] constructs a `Workload`; by
/// then every reference resolves and every required field is present.
#[derive(Debug, Clone, Default)]
pub struct Workload {
    /// Cores keyed by id.  `BTreeMap` keeps iteration deterministic.
    pub cores: BTreeMap<String, Core>,

    /// Components in declaration order.
    pub components: Vec<Component>,
}

impl Workload {
    pub fn core(&self, id: &str) -> Option<&Core> {
        self.cores.get(id)
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    /// Components hosted by `core_id`, in declaration order.
    pub fn components_on<'a>(&'a self, core_id: &'a str) -> impl Iterator<Item = &'a Component> {
        self.components.iter().filter(move |c| c.core_id == core_id)
    }

    pub fn task_count(&self) -> usize {
        self.components.iter().map(|c| c.tasks.len()).sum()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

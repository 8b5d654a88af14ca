/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-component interface analysis.
//!
//! [`Analyzer`] runs the (α, Δ) search for every component of a
//! [`Workload`] and returns one immutable [`ComponentAnalysis`] record per
//! component.  Components are independent: a component whose search fails
//! gets a record carrying the [`AnalysisError`], and the others are analysed
//! as usual.
//!
//! # RM → EDF fallback
//! An RM component that admits no interface under its own policy is searched
//! again, unchanged, under EDF.  Success is recorded as
//! [`FinalScheduler::EdfFallback`] so the row shows `"EDF (fallback)"` and the
//! simulator runs the component under EDF.

pub mod demand;
pub mod error;
pub mod search;

pub use error::{AnalysisError, SearchFailure};

use std::fmt;

use itertools::Itertools;
use tracing::{info, warn};

use crate::config::Settings;
use crate::model::{BdrInterface, Component, Policy, Time, Workload};

use search::{find_interface, SearchOutcome, SearchParams};

// ── FinalScheduler ────────────────────────────────────────────────────────────

/// Policy a component ends up analysed (and simulated) under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalScheduler {
    /// The component's declared policy.
    Native(Policy),
    /// Declared RM, schedulable only under EDF.
    EdfFallback,
}

impl FinalScheduler {
    /// Policy the component's task set runs under.
    pub fn policy(self) -> Policy {
        match self {
            FinalScheduler::Native(p) => p,
            FinalScheduler::EdfFallback => Policy::Edf,
        }
    }
}

impl fmt::Display for FinalScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalScheduler::Native(p) => write!(f, "{p}"),
            FinalScheduler::EdfFallback => write!(f, "EDF (fallback)"),
        }
    }
}

// ── ComponentAnalysis ─────────────────────────────────────────────────────────

/// Local analysis result of one component.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentAnalysis {
    pub component_id: String,
    pub core_id: String,

    /// Policy the interface was found under.  Equals the declared policy when
    /// the search failed.
    pub final_scheduler: FinalScheduler,

    /// Minimal interface; `None` when the component is infeasible.
    pub interface: Option<BdrInterface>,

    /// Horizon the interface was verified over (`0` when infeasible).
    pub horizon: Time,

    /// Why no interface exists, when it does not.
    pub failure: Option<AnalysisError>,
}

impl ComponentAnalysis {
    /// Locally schedulable: a feasible interface exists.
    pub fn schedulable(&self) -> bool {
        self.interface.is_some()
    }

    /// α of the interface; `+∞` for an infeasible component so that any core
    /// hosting it reads as overloaded.
    pub fn alpha_or_infinite(&self) -> f64 {
        self.interface.map_or(f64::INFINITY, |i| i.alpha)
    }
}

// ── Analyzer ──────────────────────────────────────────────────────────────────

/// Derives the minimal BDR interface of each component.
///
/// Holds only the search bounds, so one analyzer can be reused for any number
/// of workloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Analyzer {
    params: SearchParams,
}

impl Analyzer {
    pub fn new(params: SearchParams) -> Self {
        Self { params }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(SearchParams::from(settings))
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Analyse every component of `workload`, in declaration order.
    pub fn analyze(&self, workload: &Workload) -> Vec<ComponentAnalysis> {
        info!(
            components = workload.components.len(),
            max_delay = self.params.max_delay,
            granularity = self.params.granularity,
            "=== Interface analysis ==="
        );

        let results: Vec<ComponentAnalysis> = workload
            .components
            .iter()
            .map(|c| self.analyze_component(c))
            .collect();

        info!(
            feasible = results.iter().filter(|r| r.schedulable()).count(),
            total = results.len(),
            "=== Interface analysis complete ==="
        );
        results
    }

    /// Analyse one component, falling back from RM to EDF when needed.
    pub fn analyze_component(&self, component: &Component) -> ComponentAnalysis {
        let mut tried = vec![component.scheduler];
        let mut outcome = find_interface(component.scheduler, &component.tasks, &self.params)
            .map(|o| (o, FinalScheduler::Native(component.scheduler)));

        if outcome.is_err() && component.scheduler == Policy::Rm {
            warn!(component = %component.id, "not schedulable under RM, retrying under EDF");
            tried.push(Policy::Edf);
            outcome = find_interface(Policy::Edf, &component.tasks, &self.params)
                .map(|o| (o, FinalScheduler::EdfFallback));
        }

        match outcome {
            Ok((SearchOutcome { interface, horizon }, final_scheduler)) => {
                info!(
                    component = %component.id,
                    scheduler = %final_scheduler,
                    alpha = interface.alpha,
                    delta = interface.delta,
                    horizon,
                    "✓ interface found"
                );
                ComponentAnalysis {
                    component_id: component.id.clone(),
                    core_id: component.core_id.clone(),
                    final_scheduler,
                    interface: Some(interface),
                    horizon,
                    failure: None,
                }
            }
            Err(cause) => {
                let failure = AnalysisError::InfeasibleInterface {
                    component: component.id.clone(),
                    tried: tried.iter().join(", "),
                    cause,
                };
                warn!("✗ {failure}");
                ComponentAnalysis {
                    component_id: component.id.clone(),
                    core_id: component.core_id.clone(),
                    final_scheduler: FinalScheduler::Native(component.scheduler),
                    interface: None,
                    horizon: 0,
                    failure: Some(failure),
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! System-level composition of component interfaces.
//!
//! # Pipeline
//! ```text
//! ComponentAnalysis ─┬─► group by core ─► Σα overload ─┐
//! PeriodicServer ────┘                  ─► peak check ─┼─► AnalysisRow
//! DeclaredBudget ────────────────────────► coverage ───┤        │
//! rejected servers ──────────────────────► no server ──┘   AND ─► case verdict
//! ```
//!
//! Every step is a pure function over immutable per-component records.

pub mod peak;

pub use peak::PeakCheck;

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use tracing::{info, warn};

use crate::analysis::{AnalysisError, ComponentAnalysis, FinalScheduler};
use crate::config::Settings;
use crate::model::{BdrInterface, DeclaredBudget, PeriodicServer, Workload};

// ── Records ───────────────────────────────────────────────────────────────────

/// Aggregate state of one core.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreLoad {
    pub core_id: String,
    /// `Σα` of the hosted components; `+∞` if any is infeasible.
    pub total_alpha: f64,
    pub overloaded: bool,
    /// The hosted servers pass the configured [`PeakCheck`].
    pub interfaces_fit: bool,
}

/// Final per-component verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRow {
    pub component_id: String,
    pub core_id: String,
    pub final_scheduler: FinalScheduler,
    pub interface: Option<BdrInterface>,
    /// Locally schedulable: a feasible interface exists.
    pub schedulable: bool,
    pub core_overloaded: bool,
    pub interface_unsched: bool,
    pub budget_violate: bool,
    /// The interface exists but Half-Half produced no server for it.
    pub invalid_interface: bool,
    pub system_schedulable: bool,
}

/// Outcome of composing one case.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub cores: Vec<CoreLoad>,
    pub rows: Vec<AnalysisRow>,
    pub case_schedulable: bool,
}

// ── Checks ────────────────────────────────────────────────────────────────────

/// `Σα` per core, with an infeasible component counting as `+∞`.
pub fn alpha_per_core(analyses: &[ComponentAnalysis]) -> BTreeMap<String, f64> {
    analyses
        .iter()
        .map(|a| (a.core_id.clone(), a.alpha_or_infinite()))
        .into_grouping_map()
        .sum()
        .into_iter()
        .collect()
}

/// `true` when the required interface fits the declared parent budget.
pub fn budget_covers(required: &BdrInterface, declared: &DeclaredBudget, tolerance: f64) -> bool {
    required.alpha <= declared.alpha + tolerance && required.delta <= declared.delta + tolerance
}

/// Compose component results into per-core loads, rows and a case verdict.
///
/// `analyses` must carry one record per component of `workload`; rows come
/// out in the same order.  `rejected` holds the server derivation failures;
/// their components are never system schedulable.
pub fn compose(
    workload: &Workload,
    analyses: &[ComponentAnalysis],
    servers: &[PeriodicServer],
    rejected: &[AnalysisError],
    settings: &Settings,
) -> Composition {
    info!(peak_check = %settings.peak_check, "=== Composition ===");

    let without_server: BTreeSet<&str> = rejected.iter().map(AnalysisError::component).collect();

    let alpha = alpha_per_core(analyses);
    let servers_by_core = servers
        .iter()
        .filter_map(|s| workload.component(&s.component_id).map(|c| (c.core_id.as_str(), s)))
        .into_group_map();

    let cores: Vec<CoreLoad> = workload
        .cores
        .keys()
        .chain(alpha.keys())
        .unique()
        .map(|core_id| {
            let total_alpha = alpha.get(core_id).copied().unwrap_or(0.0);
            let overloaded = total_alpha > settings.overload_threshold;
            let hosted = servers_by_core.get(core_id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let interfaces_fit = settings.peak_check.admits(hosted, settings.horizon_cap);

            if overloaded {
                warn!(core = %core_id, total_alpha, "✗ core overloaded");
            }
            if !interfaces_fit {
                warn!(core = %core_id, servers = hosted.len(), "✗ server interfaces do not fit");
            }
            info!(core = %core_id, total_alpha, overloaded, interfaces_fit, "core checked");

            CoreLoad {
                core_id: core_id.clone(),
                total_alpha,
                overloaded,
                interfaces_fit,
            }
        })
        .collect();

    let core_state: BTreeMap<&str, &CoreLoad> = cores.iter().map(|c| (c.core_id.as_str(), c)).collect();

    let rows: Vec<AnalysisRow> = analyses
        .iter()
        .map(|a| {
            let core = core_state.get(a.core_id.as_str());
            let core_overloaded = core.map_or(false, |c| c.overloaded);
            let interface_unsched = core.map_or(false, |c| !c.interfaces_fit);

            let declared = workload.component(&a.component_id).and_then(|c| c.budget);
            let budget_violate = match (a.interface, declared) {
                (Some(required), Some(budget)) => !budget_covers(&required, &budget, settings.tolerance),
                _ => false,
            };
            if budget_violate {
                warn!(
                    component = %a.component_id,
                    required = ?a.interface,
                    declared = ?declared,
                    "✗ interface exceeds declared parent budget"
                );
            }

            let invalid_interface = without_server.contains(a.component_id.as_str());
            if invalid_interface {
                warn!(component = %a.component_id, interface = ?a.interface, "✗ interface has no server");
            }

            let schedulable = a.schedulable();
            AnalysisRow {
                component_id: a.component_id.clone(),
                core_id: a.core_id.clone(),
                final_scheduler: a.final_scheduler,
                interface: a.interface,
                schedulable,
                core_overloaded,
                interface_unsched,
                budget_violate,
                invalid_interface,
                system_schedulable: schedulable
                    && !core_overloaded
                    && !interface_unsched
                    && !budget_violate
                    && !invalid_interface,
            }
        })
        .collect();

    let case_schedulable = rows.iter().all(|r| r.system_schedulable);
    info!(
        case_schedulable,
        failing = rows.iter().filter(|r| !r.system_schedulable).count(),
        "=== Composition complete ==="
    );

    Composition {
        cores,
        rows,
        case_schedulable,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SearchFailure;
    use crate::model::{Component, Core, Policy};
    use assert_approx_eq::assert_approx_eq;

    fn analysis(id: &str, core: &str, interface: Option<(f64, f64)>) -> ComponentAnalysis {
        ComponentAnalysis {
            component_id: id.into(),
            core_id: core.into(),
            final_scheduler: FinalScheduler::Native(Policy::Edf),
            interface: interface.map(|(alpha, delta)| BdrInterface { alpha, delta }),
            horizon: 100,
            failure: interface.is_none().then(|| AnalysisError::InfeasibleInterface {
                component: id.into(),
                tried: "EDF".into(),
                cause: SearchFailure::Exhausted {
                    max_delay: 100,
                    horizon: 100,
                },
            }),
        }
    }

    fn component(id: &str, core: &str, budget: Option<DeclaredBudget>) -> Component {
        Component {
            id: id.into(),
            scheduler: Policy::Edf,
            core_id: core.into(),
            priority: None,
            budget,
            tasks: Vec::new(),
        }
    }

    fn workload(components: Vec<Component>) -> Workload {
        let mut w = Workload {
            components,
            ..Workload::default()
        };
        for c in &w.components {
            w.cores.insert(
                c.core_id.clone(),
                Core {
                    id: c.core_id.clone(),
                    speed_factor: 1.0,
                    scheduler: Policy::Edf,
                },
            );
        }
        w
    }

    fn server(id: &str, budget: f64, period: f64) -> PeriodicServer {
        PeriodicServer {
            component_id: id.into(),
            budget,
            period,
            scheduler: Policy::Edf,
        }
    }

    // ── overload ──

    #[test]
    fn overload_threshold_is_one_percent_above_one() {
        let w = workload(vec![component("a", "hot", None), component("b", "hot", None), component("c", "cool", None)]);
        let analyses = vec![
            analysis("a", "hot", Some((0.8, 0.0))),
            analysis("b", "hot", Some((0.7, 0.0))),
            analysis("c", "cool", Some((0.9, 0.0))),
        ];
        let c = compose(&w, &analyses, &[], &[], &Settings::default());
        let hot = c.cores.iter().find(|l| l.core_id == "hot").unwrap();
        let cool = c.cores.iter().find(|l| l.core_id == "cool").unwrap();
        assert_approx_eq!(hot.total_alpha, 1.5);
        assert!(hot.overloaded);
        assert!(!cool.overloaded);
        assert!(c.rows[0].core_overloaded && c.rows[1].core_overloaded);
        assert!(!c.rows[2].core_overloaded);
        assert!(!c.case_schedulable);
    }

    #[test]
    fn infeasible_component_overloads_its_core() {
        let w = workload(vec![component("a", "k", None), component("b", "k", None)]);
        let analyses = vec![analysis("a", "k", None), analysis("b", "k", Some((0.1, 0.0)))];
        let c = compose(&w, &analyses, &[], &[], &Settings::default());
        assert_eq!(c.cores[0].total_alpha, f64::INFINITY);
        assert!(c.rows[1].core_overloaded);
        assert!(!c.rows[1].system_schedulable);
        assert!(!c.rows[0].schedulable);
    }

    #[test]
    fn alpha_within_slack_is_not_overloaded() {
        let w = workload(vec![component("a", "k", None), component("b", "k", None)]);
        let analyses = vec![analysis("a", "k", Some((0.5, 0.0))), analysis("b", "k", Some((0.505, 0.0)))];
        let c = compose(&w, &analyses, &[], &[], &Settings::default());
        assert!(!c.cores[0].overloaded);
    }

    // ── interface check ──

    #[test]
    fn peak_violation_marks_every_hosted_component() {
        let w = workload(vec![component("a", "k", None), component("b", "k", None)]);
        let analyses = vec![analysis("a", "k", Some((0.5, 0.0))), analysis("b", "k", Some((0.5, 0.0)))];
        let servers = vec![server("a", 3.0, 5.0), server("b", 6.0, 10.0)];
        let c = compose(&w, &analyses, &servers, &[], &Settings::default());
        assert!(!c.cores[0].interfaces_fit);
        assert!(c.rows.iter().all(|r| r.interface_unsched && !r.system_schedulable));
    }

    #[test]
    fn peak_strategy_comes_from_settings() {
        let w = workload(vec![component("a", "k", None), component("b", "k", None)]);
        let analyses = vec![analysis("a", "k", Some((0.4, 0.0))), analysis("b", "k", Some((0.6, 0.0)))];
        let servers = vec![server("a", 4.0, 10.0), server("b", 6.0, 10.0)];
        for peak_check in [PeakCheck::Utilization, PeakCheck::PeriodicPeak, PeakCheck::DelayCurve] {
            let settings = Settings {
                peak_check,
                ..Settings::default()
            };
            let c = compose(&w, &analyses, &servers, &[], &settings);
            assert!(c.case_schedulable, "{peak_check} rejected a fitting core");
        }
    }

    // ── budget coverage ──

    #[test]
    fn declared_budget_below_requirement_is_violated() {
        let budget = DeclaredBudget { alpha: 0.3, delta: 10.0 };
        let w = workload(vec![component("cam", "k", Some(budget))]);
        let analyses = vec![analysis("cam", "k", Some((0.5, 0.0)))];
        let c = compose(&w, &analyses, &[], &[], &Settings::default());
        let row = &c.rows[0];
        assert!(row.schedulable);
        assert!(row.budget_violate);
        assert!(!row.system_schedulable);
        assert!(!c.case_schedulable);
    }

    #[test]
    fn budget_coverage_compares_both_coordinates() {
        let declared = DeclaredBudget { alpha: 0.5, delta: 3.0 };
        assert!(budget_covers(&BdrInterface { alpha: 0.5, delta: 3.0 }, &declared, 1e-6));
        assert!(budget_covers(&BdrInterface { alpha: 0.4, delta: 0.0 }, &declared, 1e-6));
        assert!(!budget_covers(&BdrInterface { alpha: 0.4, delta: 4.0 }, &declared, 1e-6));
        assert!(!budget_covers(&BdrInterface { alpha: 0.51, delta: 0.0 }, &declared, 1e-6));
    }

    // ── server derivation ──

    #[test]
    fn rejected_server_fails_its_row_only() {
        let w = workload(vec![component("full", "k", None), component("ok", "j", None)]);
        let analyses = vec![analysis("full", "k", Some((1.0, 0.0))), analysis("ok", "j", Some((0.2, 0.0)))];
        let servers = vec![server("ok", 20.0, 100.0)];
        let rejected = vec![AnalysisError::InvalidInterface {
            component: "full".into(),
            alpha: 1.0,
        }];
        let c = compose(&w, &analyses, &servers, &rejected, &Settings::default());

        let full = &c.rows[0];
        assert!(full.schedulable);
        assert!(full.invalid_interface);
        assert!(!full.system_schedulable);

        let ok = &c.rows[1];
        assert!(!ok.invalid_interface);
        assert!(ok.system_schedulable);
        assert!(!c.case_schedulable);
    }

    // ── verdict ──

    #[test]
    fn clean_case_is_schedulable() {
        let budget = DeclaredBudget { alpha: 0.5, delta: 5.0 };
        let w = workload(vec![component("a", "k", Some(budget)), component("b", "j", None)]);
        let analyses = vec![analysis("a", "k", Some((0.2, 0.0))), analysis("b", "j", Some((0.25, 2.0)))];
        let servers = vec![server("a", 20.0, 100.0), server("b", 0.67, 2.67)];
        let c = compose(&w, &analyses, &servers, &[], &Settings::default());
        assert!(c.rows.iter().all(|r| r.system_schedulable));
        assert!(c.case_schedulable);
    }

    #[test]
    fn empty_workload_is_vacuously_schedulable() {
        let c = compose(&Workload::default(), &[], &[], &[], &Settings::default());
        assert!(c.rows.is_empty());
        assert!(c.case_schedulable);
    }
}

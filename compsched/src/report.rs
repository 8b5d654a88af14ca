/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Output records, cross-validation and the case summary.
//!
//! Records are flat and serde-serializable; boolean flags are written as
//! `0`/`1` and real values are rounded to two decimals.

use std::fmt;

use serde::Serialize;

use crate::composition::{AnalysisRow, Composition};
use crate::model::{PeriodicServer, Workload};
use crate::server::round2;
use crate::sim::SimulationReport;

fn flag(value: bool) -> u8 {
    u8::from(value)
}

// ── Records ───────────────────────────────────────────────────────────────────

/// One line of `analysis_result.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub component_id: String,
    pub core_id: String,
    pub final_scheduler: String,
    pub alpha: Option<f64>,
    pub delta: Option<f64>,
    pub schedulable: u8,
    pub core_overloaded: u8,
    pub interface_unsched: u8,
    pub budget_violate: u8,
    pub invalid_interface: u8,
    pub system_schedulable: u8,
    pub case_schedulable: u8,
}

impl AnalysisRecord {
    pub fn new(row: &AnalysisRow, case_schedulable: bool) -> Self {
        Self {
            component_id: row.component_id.clone(),
            core_id: row.core_id.clone(),
            final_scheduler: row.final_scheduler.to_string(),
            alpha: row.interface.map(|i| round2(i.alpha)),
            delta: row.interface.map(|i| round2(i.delta)),
            schedulable: flag(row.schedulable),
            core_overloaded: flag(row.core_overloaded),
            interface_unsched: flag(row.interface_unsched),
            budget_violate: flag(row.budget_violate),
            invalid_interface: flag(row.invalid_interface),
            system_schedulable: flag(row.system_schedulable),
            case_schedulable: flag(case_schedulable),
        }
    }
}

/// One line of `resource_supply.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerRecord {
    pub component_id: String,
    pub core_id: String,
    pub scheduler: String,
    #[serde(rename = "Q")]
    pub budget: f64,
    #[serde(rename = "P")]
    pub period: f64,
}

/// One line of `solution.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRecord {
    pub task_name: String,
    pub component_id: String,
    pub task_schedulable: u8,
    pub avg_response_time: f64,
    pub max_response_time: u64,
    pub component_schedulable: u8,
}

pub fn analysis_records(composition: &Composition) -> Vec<AnalysisRecord> {
    composition
        .rows
        .iter()
        .map(|r| AnalysisRecord::new(r, composition.case_schedulable))
        .collect()
}

pub fn server_records(workload: &Workload, servers: &[PeriodicServer]) -> Vec<ServerRecord> {
    servers
        .iter()
        .map(|s| ServerRecord {
            component_id: s.component_id.clone(),
            core_id: workload
                .component(&s.component_id)
                .map(|c| c.core_id.clone())
                .unwrap_or_default(),
            scheduler: s.scheduler.to_string(),
            budget: round2(s.budget),
            period: round2(s.period),
        })
        .collect()
}

pub fn simulation_records(report: &SimulationReport) -> Vec<SimulationRecord> {
    report
        .tasks
        .iter()
        .map(|t| SimulationRecord {
            task_name: t.task_name.clone(),
            component_id: t.component_id.clone(),
            task_schedulable: flag(t.schedulable()),
            avg_response_time: round2(t.avg_response_time),
            max_response_time: t.max_response_time,
            component_schedulable: flag(report.component(&t.component_id).map_or(false, |c| c.schedulable)),
        })
        .collect()
}

// ── Cross-validation ──────────────────────────────────────────────────────────

/// A component the analysis accepted but the simulation saw miss.
#[derive(Debug, Clone, PartialEq)]
pub struct Discrepancy {
    pub component_id: String,
    pub missed_jobs: usize,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "component '{}' is analytically schedulable but missed {} job(s) in simulation",
            self.component_id, self.missed_jobs
        )
    }
}

/// Compare analytic verdicts against simulated misses.
///
/// Only locally schedulable components that received a server are checked;
/// an infeasible or server-less component is expected to miss.
pub fn cross_validate(composition: &Composition, report: &SimulationReport) -> Vec<Discrepancy> {
    composition
        .rows
        .iter()
        .filter(|r| r.schedulable && !r.invalid_interface)
        .filter_map(|r| {
            let sim = report.component(&r.component_id)?;
            if sim.schedulable {
                return None;
            }
            let missed_jobs = report
                .tasks
                .iter()
                .filter(|t| t.component_id == r.component_id)
                .map(|t| t.missed)
                .sum();
            Some(Discrepancy {
                component_id: r.component_id.clone(),
                missed_jobs,
            })
        })
        .collect()
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Counts printed at the end of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseSummary {
    pub components: usize,
    pub locally_schedulable: usize,
    pub system_schedulable: usize,
    pub tasks: usize,
    pub tasks_missing: usize,
    pub components_missing: usize,
    pub discrepancies: usize,
    pub case_schedulable: bool,
}

impl CaseSummary {
    pub fn new(composition: &Composition, report: &SimulationReport, discrepancies: &[Discrepancy]) -> Self {
        Self {
            components: composition.rows.len(),
            locally_schedulable: composition.rows.iter().filter(|r| r.schedulable).count(),
            system_schedulable: composition.rows.iter().filter(|r| r.system_schedulable).count(),
            tasks: report.tasks.len(),
            tasks_missing: report.tasks.iter().filter(|t| !t.schedulable()).count(),
            components_missing: report.components.iter().filter(|c| !c.schedulable).count(),
            discrepancies: discrepancies.len(),
            case_schedulable: composition.case_schedulable,
        }
    }
}

impl fmt::Display for CaseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "components            : {}", self.components)?;
        writeln!(f, "  locally schedulable : {}", self.locally_schedulable)?;
        writeln!(f, "  system schedulable  : {}", self.system_schedulable)?;
        writeln!(f, "tasks                 : {}", self.tasks)?;
        writeln!(f, "  with deadline misses: {}", self.tasks_missing)?;
        writeln!(f, "components with misses: {}", self.components_missing)?;
        writeln!(f, "discrepancies         : {}", self.discrepancies)?;
        write!(
            f,
            "case verdict          : {}",
            if self.case_schedulable { "schedulable" } else { "NOT schedulable" }
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

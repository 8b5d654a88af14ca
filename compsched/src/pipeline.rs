/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! End-to-end run of one case: analysis → servers → composition →
//! simulation → cross-validation.

use tracing::{info, warn};

use crate::analysis::{AnalysisError, Analyzer, ComponentAnalysis};
use crate::composition::{compose, Composition};
use crate::config::Case;
use crate::model::PeriodicServer;
use crate::report::{cross_validate, CaseSummary, Discrepancy};
use crate::server::derive_servers;
use crate::sim::tuning::{tune_budget, TunedBudget};
use crate::sim::{SimConfig, SimulationReport, Simulator};

/// Everything a case run produces.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub analyses: Vec<ComponentAnalysis>,
    pub servers: Vec<PeriodicServer>,
    /// Interfaces Half-Half could not turn into a server.
    pub rejected_servers: Vec<AnalysisError>,
    pub composition: Composition,
    pub simulation: SimulationReport,
    pub discrepancies: Vec<Discrepancy>,
}

impl CaseOutcome {
    pub fn case_schedulable(&self) -> bool {
        self.composition.case_schedulable
    }

    pub fn summary(&self) -> CaseSummary {
        CaseSummary::new(&self.composition, &self.simulation, &self.discrepancies)
    }
}

/// Run every stage on `case`.  Local failures are recorded, never raised.
pub fn run_case(case: &Case) -> CaseOutcome {
    let settings = &case.settings;
    let workload = &case.workload;
    info!(
        cores = workload.cores.len(),
        components = workload.components.len(),
        tasks = workload.task_count(),
        "Running case"
    );

    let analyses = Analyzer::from_settings(settings).analyze(workload);
    let (servers, rejected_servers) = derive_servers(&analyses, settings.reference_period);
    let composition = compose(workload, &analyses, &servers, &rejected_servers, settings);
    let simulation = Simulator::new(workload, SimConfig::from(settings)).run(&servers);

    let discrepancies = cross_validate(&composition, &simulation);
    for d in &discrepancies {
        warn!("{d}");
    }

    CaseOutcome {
        analyses,
        servers,
        rejected_servers,
        composition,
        simulation,
        discrepancies,
    }
}

/// Tune the budget of every derived server, keeping its period.
pub fn tune_servers(case: &Case, servers: &[PeriodicServer]) -> Vec<(String, Option<TunedBudget>)> {
    servers
        .iter()
        .filter_map(|s| {
            let component = case.workload.component(&s.component_id)?;
            let tuned = tune_budget(
                component,
                s.scheduler,
                s.period,
                case.settings.horizon_cap,
                case.settings.simulation.carry_over,
            );
            Some((s.component_id.clone(), tuned))
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

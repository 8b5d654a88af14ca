//! Case file loading and analysis settings.
//!
//! A *case* is one dataset: cores, components (with optional declared
//! budgets) and tasks, plus optional analysis settings.  The expected YAML
//! structure is:
//! ```yaml
//! settings:
//!   peak_check: periodic_peak
//! cores:
//!   - { id: Core_1, speed_factor: 1.0, scheduler: EDF }
//! components:
//!   - { id: Camera, scheduler: RM, core_id: Core_1, budget: 5, period: 10 }
//! tasks:
//!   - { name: t1, wcet: 2, period: 10, component_id: Camera, priority: 0 }
//! ```
//!
//! The raw file is deserialised into private `*Entry` types whose fields are
//! all optional, then validated once by [`CaseFile::into_case`] into a
//! [`Workload`].  Unknown keys are rejected by serde; absent or out-of-domain
//! values are rejected with a named [`ModelError`].

pub mod error;

pub use error::{ModelError, RecordKind};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::composition::PeakCheck;
use crate::hyperperiod::DEFAULT_HORIZON_CAP;
use crate::model::{Component, Core, DeclaredBudget, Policy, Task, Time, Workload};
use crate::sim::CarryOver;

// ── Settings ──────────────────────────────────────────────────────────────────

/// Tunable constants of the analysis and simulation.
///
/// Every field has a serde default, so a case file may omit the whole
/// `settings` block or any subset of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Rounding step of α during the search (ceiling rounding).
    pub alpha_granularity: f64,

    /// Largest initial delay Δ the search tries.
    pub max_delay: Time,

    /// Absolute cap on every analysis / simulation window.
    pub horizon_cap: Time,

    /// Core overload threshold on the Σα of hosted components.
    pub overload_threshold: f64,

    /// Equality tolerance for supply/demand and budget comparisons.
    pub tolerance: f64,

    /// Server period used by Half-Half when Δ = 0.
    pub reference_period: f64,

    /// Parent-level interface schedulability test.
    pub peak_check: PeakCheck,

    /// Fill missing RM priorities by dense period rank instead of failing.
    pub assign_missing_priorities: bool,

    pub simulation: SimulationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alpha_granularity: 0.01,
            max_delay: 100,
            horizon_cap: DEFAULT_HORIZON_CAP,
            overload_threshold: 1.01,
            tolerance: 1e-6,
            reference_period: 100.0,
            peak_check: PeakCheck::default(),
            assign_missing_priorities: false,
            simulation: SimulationSettings::default(),
        }
    }
}

/// Simulation knobs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    /// Fixed horizon for every core.  `None` = capped hyperperiod of the
    /// core's task periods.
    pub horizon: Option<Time>,

    /// What happens to unused server budget at replenishment.
    pub carry_over: CarryOver,
}

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaseFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    cores: Vec<CoreEntry>,
    #[serde(default)]
    components: Vec<ComponentEntry>,
    #[serde(default)]
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CoreEntry {
    id: Option<String>,
    speed_factor: Option<f64>,
    scheduler: Option<Policy>,
}

/// Component row.  A declared budget is given either as
/// `alpha_budget` + `delta_budget` or as raw `budget` + `period`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ComponentEntry {
    id: Option<String>,
    scheduler: Option<Policy>,
    core_id: Option<String>,
    priority: Option<u32>,
    alpha_budget: Option<f64>,
    delta_budget: Option<f64>,
    budget: Option<f64>,
    period: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskEntry {
    name: Option<String>,
    wcet: Option<f64>,
    period: Option<Time>,
    component_id: Option<String>,
    priority: Option<u32>,
}

/// Placeholder id for a record that lacks its own id.
fn anonymous(kind: RecordKind, index: usize) -> String {
    format!("{kind}#{index}")
}

fn required<T>(value: Option<T>, record: RecordKind, id: &str, field: &'static str) -> Result<T, ModelError> {
    value.ok_or_else(|| ModelError::MissingField {
        record,
        id: id.to_string(),
        field,
    })
}

fn invalid(record: RecordKind, id: &str, field: &'static str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidField {
        record,
        id: id.to_string(),
        field,
        reason: reason.into(),
    }
}

// ── Case ──────────────────────────────────────────────────────────────────────

/// A validated case: settings plus the immutable workload.
#[derive(Debug, Clone)]
pub struct Case {
    pub settings: Settings,
    pub workload: Workload,
}

impl Case {
    /// Read and validate the case file at `path`.
    ///
    /// # Errors
    /// I/O and YAML errors carry the path as context.  Structural errors are
    /// a [`ModelError`] inside the `anyhow::Error`
    /// (`err.downcast_ref::<ModelError>()`).
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading case from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open case file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid case file: {}", path.display()))
    }

    /// Parse and validate a case from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: CaseFile = serde_yaml::from_str(content).context("Failed to parse case YAML")?;
        let case = file.into_case()?;

        info!(
            cores = case.workload.cores.len(),
            components = case.workload.components.len(),
            tasks = case.workload.task_count(),
            "Case loaded"
        );
        Ok(case)
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

impl CaseFile {
    /// Validate every record and build the [`Workload`].
    fn into_case(self) -> Result<Case, ModelError> {
        let settings = self.settings;
        let cores = Self::build_cores(self.cores)?;

        // Raw budget periods are kept aside: they rank components on RM cores
        // when priorities are auto-assigned.
        let mut budget_periods: BTreeMap<String, f64> = BTreeMap::new();
        let mut components: Vec<Component> = Vec::with_capacity(self.components.len());

        for (index, entry) in self.components.into_iter().enumerate() {
            let id = entry
                .id
                .clone()
                .ok_or_else(|| ModelError::MissingField {
                    record: RecordKind::Component,
                    id: anonymous(RecordKind::Component, index),
                    field: "id",
                })?;
            if components.iter().any(|c| c.id == id) {
                return Err(invalid(RecordKind::Component, &id, "id", "duplicate component id"));
            }
            if let Some(p) = entry.period {
                budget_periods.insert(id.clone(), p);
            }
            components.push(Self::build_component(&id, entry, &cores)?);
        }

        for (index, entry) in self.tasks.into_iter().enumerate() {
            let name = entry.name.clone().ok_or_else(|| ModelError::MissingField {
                record: RecordKind::Task,
                id: anonymous(RecordKind::Task, index),
                field: "name",
            })?;
            let component_id = required(entry.component_id.clone(), RecordKind::Task, &name, "component_id")?;
            let component = components
                .iter_mut()
                .find(|c| c.id == component_id)
                .ok_or_else(|| ModelError::UnresolvedReference {
                    record: RecordKind::Task,
                    id: name.clone(),
                    target: RecordKind::Component,
                    reference: component_id.clone(),
                })?;
            let speed_factor = cores[&component.core_id].speed_factor;
            let task = Self::build_task(name, component_id, entry, speed_factor)?;
            component.tasks.push(task);
        }

        if settings.assign_missing_priorities {
            for component in components.iter_mut() {
                assign_task_priorities(component);
            }
            assign_component_priorities(&mut components, &cores, &budget_periods);
        }

        for component in components.iter_mut() {
            Self::check_priorities(component, &cores)?;
            if component.scheduler == Policy::Rm {
                // stable: equal priorities keep declaration order
                component.tasks.sort_by_key(|t| t.priority);
            }
        }

        Ok(Case {
            settings,
            workload: Workload { cores, components },
        })
    }

    fn build_cores(entries: Vec<CoreEntry>) -> Result<BTreeMap<String, Core>, ModelError> {
        let mut cores = BTreeMap::new();
        for (index, entry) in entries.into_iter().enumerate() {
            let id = entry.id.ok_or_else(|| ModelError::MissingField {
                record: RecordKind::Core,
                id: anonymous(RecordKind::Core, index),
                field: "id",
            })?;
            let speed_factor = required(entry.speed_factor, RecordKind::Core, &id, "speed_factor")?;
            if !(speed_factor > 0.0) || !speed_factor.is_finite() {
                return Err(invalid(RecordKind::Core, &id, "speed_factor", "must be a positive number"));
            }
            let scheduler = required(entry.scheduler, RecordKind::Core, &id, "scheduler")?;
            if cores.contains_key(&id) {
                return Err(invalid(RecordKind::Core, &id, "id", "duplicate core id"));
            }
            debug!(core = %id, speed_factor, scheduler = %scheduler, "core");
            cores.insert(
                id.clone(),
                Core {
                    id,
                    speed_factor,
                    scheduler,
                },
            );
        }
        Ok(cores)
    }

    fn build_component(
        id: &str,
        entry: ComponentEntry,
        cores: &BTreeMap<String, Core>,
    ) -> Result<Component, ModelError> {
        let scheduler = required(entry.scheduler, RecordKind::Component, id, "scheduler")?;
        let core_id = required(entry.core_id, RecordKind::Component, id, "core_id")?;
        if !cores.contains_key(&core_id) {
            return Err(ModelError::UnresolvedReference {
                record: RecordKind::Component,
                id: id.to_string(),
                target: RecordKind::Core,
                reference: core_id,
            });
        }

        let budget = match (entry.alpha_budget, entry.delta_budget, entry.budget, entry.period) {
            (Some(alpha), Some(delta), _, _) => {
                if !(alpha > 0.0 && alpha <= 1.0) {
                    return Err(invalid(RecordKind::Component, id, "alpha_budget", "must be in (0, 1]"));
                }
                if delta < 0.0 {
                    return Err(invalid(RecordKind::Component, id, "delta_budget", "must be >= 0"));
                }
                Some(DeclaredBudget { alpha, delta })
            }
            (Some(_), None, _, _) => {
                return Err(ModelError::MissingField {
                    record: RecordKind::Component,
                    id: id.to_string(),
                    field: "delta_budget",
                })
            }
            (None, Some(_), _, _) => {
                return Err(ModelError::MissingField {
                    record: RecordKind::Component,
                    id: id.to_string(),
                    field: "alpha_budget",
                })
            }
            (None, None, Some(budget), Some(period)) => {
                if !(period > 0.0) {
                    return Err(invalid(RecordKind::Component, id, "period", "must be positive"));
                }
                if !(budget > 0.0 && budget <= period) {
                    return Err(invalid(RecordKind::Component, id, "budget", "must be in (0, period]"));
                }
                Some(DeclaredBudget::from_raw(budget, period))
            }
            // A lone `period` is only a ranking hint; a lone `budget` is meaningless.
            (None, None, Some(_), None) => {
                return Err(ModelError::MissingField {
                    record: RecordKind::Component,
                    id: id.to_string(),
                    field: "period",
                })
            }
            (None, None, None, _) => None,
        };

        Ok(Component {
            id: id.to_string(),
            scheduler,
            core_id,
            priority: entry.priority,
            budget,
            tasks: Vec::new(),
        })
    }

    fn build_task(
        name: String,
        component_id: String,
        entry: TaskEntry,
        speed_factor: f64,
    ) -> Result<Task, ModelError> {
        let wcet = required(entry.wcet, RecordKind::Task, &name, "wcet")?;
        if !(wcet > 0.0) || !wcet.is_finite() {
            return Err(invalid(RecordKind::Task, &name, "wcet", "must be a positive number"));
        }
        let period = required(entry.period, RecordKind::Task, &name, "period")?;
        if period == 0 {
            return Err(invalid(RecordKind::Task, &name, "period", "must be positive"));
        }
        Ok(Task {
            wcet_effective: wcet / speed_factor,
            name,
            wcet,
            period,
            component_id,
            priority: entry.priority,
        })
    }

    /// RM components need a priority on every task; components on an RM
    /// core need their own priority.
    fn check_priorities(component: &Component, cores: &BTreeMap<String, Core>) -> Result<(), ModelError> {
        if component.scheduler == Policy::Rm {
            if let Some(task) = component.tasks.iter().find(|t| t.priority.is_none()) {
                return Err(ModelError::MissingField {
                    record: RecordKind::Task,
                    id: task.name.clone(),
                    field: "priority",
                });
            }
        }
        if cores[&component.core_id].scheduler == Policy::Rm && component.priority.is_none() {
            return Err(ModelError::MissingField {
                record: RecordKind::Component,
                id: component.id.clone(),
                field: "priority",
            });
        }
        Ok(())
    }
}

// ── Priority completion ───────────────────────────────────────────────────────

/// Dense rank of `key` among `keys` (smallest = 0).
fn dense_rank(keys: &[f64], key: f64) -> u32 {
    keys.iter()
        .copied()
        .sorted_by(|a, b| a.total_cmp(b))
        .dedup()
        .position(|k| k == key)
        .unwrap_or(0) as u32
}

/// Give every RM task lacking a priority the dense rank of its period among
/// the other unprioritised tasks of the component.
fn assign_task_priorities(component: &mut Component) {
    if component.scheduler != Policy::Rm {
        return;
    }
    let keys: Vec<f64> = component
        .tasks
        .iter()
        .filter(|t| t.priority.is_none())
        .map(|t| t.period as f64)
        .collect();
    if keys.is_empty() {
        return;
    }
    for task in component.tasks.iter_mut().filter(|t| t.priority.is_none()) {
        let rank = dense_rank(&keys, task.period as f64);
        warn!(task = %task.name, component = %component.id, priority = rank, "assigned missing RM priority");
        task.priority = Some(rank);
    }
}

/// Give every component lacking a priority on an RM core the dense rank of
/// its declared budget period (or shortest task period) on that core.
fn assign_component_priorities(
    components: &mut [Component],
    cores: &BTreeMap<String, Core>,
    budget_periods: &BTreeMap<String, f64>,
) {
    let rank_key = |c: &Component| -> f64 {
        budget_periods
            .get(&c.id)
            .copied()
            .or_else(|| c.tasks.iter().map(|t| t.period).min().map(|p| p as f64))
            .unwrap_or(f64::MAX)
    };

    let rm_cores: BTreeSet<&str> = cores
        .values()
        .filter(|c| c.scheduler == Policy::Rm)
        .map(|c| c.id.as_str())
        .collect();

    for core_id in rm_cores {
        let keys: Vec<f64> = components
            .iter()
            .filter(|c| c.core_id == core_id && c.priority.is_none())
            .map(rank_key)
            .collect();
        let ranks: Vec<(usize, u32)> = components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.core_id == core_id && c.priority.is_none())
            .map(|(i, c)| (i, dense_rank(&keys, rank_key(c))))
            .collect();
        for (i, rank) in ranks {
            warn!(component = %components[i].id, core = core_id, priority = rank, "assigned missing component priority");
            components[i].priority = Some(rank);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

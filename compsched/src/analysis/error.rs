/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Local (per-component) analysis failures.
//!
//! Unlike [`ModelError`](crate::config::ModelError) these never abort a run:
//! they are stored in the failing component's record and only turn its row,
//! and therefore the case verdict, unschedulable.

use thiserror::Error;

use crate::model::Time;

/// Why the search engine found no feasible `(Δ, α)` pair.
#[derive(Debug, Error, Copy, Clone, PartialEq)]
pub enum SearchFailure {
    /// Every Δ up to `max_delay` was rejected over the scanned horizon.
    #[error("no feasible (Δ, α) with Δ ≤ {max_delay} over horizon {horizon}")]
    Exhausted { max_delay: Time, horizon: Time },
}

/// Per-component analytic failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// The search exhausted its bounds under every policy it tried.
    #[error("component '{component}' has no feasible interface under {tried}: {cause}")]
    InfeasibleInterface {
        component: String,
        /// Policies tried, in order (e.g. `"RM, EDF"`).
        tried: String,
        cause: SearchFailure,
    },

    /// Half-Half needs `α < 1`; at `α = 1` no finite server period exists.
    #[error("component '{component}' interface α = {alpha:.2} admits no finite server period")]
    InvalidInterface { component: String, alpha: f64 },
}

impl AnalysisError {
    /// Id of the component the failure belongs to.
    pub fn component(&self) -> &str {
        match self {
            Self::InfeasibleInterface { component, .. } | Self::InvalidInterface { component, .. } => component,
        }
    }
}

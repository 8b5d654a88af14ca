/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Half-Half transform: BDR interface `(α, Δ)` → periodic server `(Q, P)`.
//!
//! A periodic server with bandwidth `α = Q/P` has worst-case blackout
//! `P − Q`.  Matching that blackout to `Δ` gives
//!
//! ```text
//! Δ = 0 :  P = P₀              Q = α·P₀
//! Δ > 0 :  P = Δ / (1 − α)     Q = α·P
//! ```
//!
//! `P` is rounded to two decimals, then `Q` is rounded **up** to two decimals
//! so the server never supplies less than `α`.

use tracing::{info, warn};

use crate::analysis::search::ceil_to_granularity;
use crate::analysis::{AnalysisError, ComponentAnalysis};
use crate::hyperperiod::math::CENTI;
use crate::model::{BdrInterface, PeriodicServer, Policy};

/// Decimal step of `Q` and `P`.
pub const SERVER_STEP: f64 = 0.01;

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * CENTI).round() / CENTI
}

/// Derive the periodic server realising `interface`.
///
/// Fails with [`AnalysisError::InvalidInterface`] when `α ≥ 1`: a full-rate
/// interface has no finite Half-Half period.
pub fn half_half(
    component_id: &str,
    interface: &BdrInterface,
    scheduler: Policy,
    reference_period: f64,
) -> Result<PeriodicServer, AnalysisError> {
    let BdrInterface { alpha, delta } = *interface;
    if alpha >= 1.0 || alpha.is_nan() {
        return Err(AnalysisError::InvalidInterface {
            component: component_id.to_string(),
            alpha,
        });
    }

    let period = if delta == 0.0 {
        reference_period
    } else {
        round2(delta / (1.0 - alpha))
    };
    let budget = ceil_to_granularity(alpha * period, SERVER_STEP).min(period);

    Ok(PeriodicServer {
        component_id: component_id.to_string(),
        budget,
        period,
        scheduler,
    })
}

/// Servers for every locally schedulable component.
///
/// Infeasible components are skipped silently (their analysis row already
/// says so); `α = 1` interfaces are skipped with a warning and returned as
/// errors alongside the servers.
pub fn derive_servers(
    analyses: &[ComponentAnalysis],
    reference_period: f64,
) -> (Vec<PeriodicServer>, Vec<AnalysisError>) {
    let mut servers = Vec::with_capacity(analyses.len());
    let mut rejected = Vec::new();

    for a in analyses {
        let Some(interface) = a.interface else { continue };
        match half_half(&a.component_id, &interface, a.final_scheduler.policy(), reference_period) {
            Ok(server) => {
                info!(
                    component = %server.component_id,
                    budget = server.budget,
                    period = server.period,
                    "server derived"
                );
                servers.push(server);
            }
            Err(e) => {
                warn!("{e}; component excluded from the server set");
                rejected.push(e);
            }
        }
    }

    (servers, rejected)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

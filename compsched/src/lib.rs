/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! compsched – compositional schedulability analysis of hierarchical
//! real-time systems.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/         – YAML case loader, settings, model errors
//! ├── model           – cores, components, tasks, interfaces, servers
//! ├── hyperperiod/    – LCM / GCD helpers with a horizon cap
//! ├── analysis/       – demand-bound functions and (α, Δ) interface search
//! ├── server          – Half-Half transform to periodic servers (Q, P)
//! ├── composition/    – core overload, peak checks, budget coverage, verdict
//! ├── sim/            – two-level discrete-time simulator and budget tuning
//! ├── report          – output records, cross-validation, case summary
//! └── pipeline        – end-to-end case run
//! ```

pub mod analysis;
pub mod composition;
pub mod config;
pub mod hyperperiod;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod sim;

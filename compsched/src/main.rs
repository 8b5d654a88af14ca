/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};

use compsched::composition::PeakCheck;
use compsched::config::Case;
use compsched::pipeline::{run_case, tune_servers};
use compsched::report::{analysis_records, server_records, simulation_records};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Compositional schedulability analysis of a hierarchical real-time case.
///
/// Example:
///   compsched --case cases/camera.yaml --output out/ --peak-check delay_curve
#[derive(Debug, Parser)]
#[command(
    name = "compsched",
    about = "BDR interface analysis, Half-Half servers and hierarchical simulation",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML case file.
    #[arg(short = 'c', long = "case")]
    case: PathBuf,

    /// Directory receiving analysis_result.yaml, resource_supply.yaml and solution.yaml.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Override the core-level interface check (utilization, periodic_peak, delay_curve).
    #[arg(short = 'k', long = "peak-check")]
    peak_check: Option<PeakCheck>,

    /// Also binary-search the smallest miss-free budget of every server.
    #[arg(short = 't', long = "tune", default_value_t = false)]
    tune: bool,
}

// ── Output ────────────────────────────────────────────────────────────────────

fn write_yaml<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let path = dir.join(name);
    let content = serde_yaml::to_string(value).with_context(|| format!("Failed to serialise {name}"))?;
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> Result<()> {
    let mut case = Case::from_file(&cli.case)?;
    if let Some(peak_check) = cli.peak_check {
        case.settings.peak_check = peak_check;
    }

    let outcome = run_case(&case);

    if let Some(dir) = &cli.output {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        write_yaml(dir, "analysis_result.yaml", &analysis_records(&outcome.composition))?;
        write_yaml(dir, "resource_supply.yaml", &server_records(&case.workload, &outcome.servers))?;
        write_yaml(dir, "solution.yaml", &simulation_records(&outcome.simulation))?;
    }

    if cli.tune {
        for (component, tuned) in tune_servers(&case, &outcome.servers) {
            match tuned {
                Some(t) => info!(
                    "  [{component}]  tuned Q={q:.2}  P={p:.2}  (horizon {h})",
                    q = t.budget,
                    p = t.period,
                    h = t.horizon
                ),
                None => warn!("  [{component}]  no miss-free budget up to the full period"),
            }
        }
    }

    for line in outcome.summary().to_string().lines() {
        info!("{line}");
    }
    Ok(())
}

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(case = %cli.case.display(), output = ?cli.output, peak_check = ?cli.peak_check, tune = cli.tune, "Configuration");

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

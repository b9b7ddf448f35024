//! Sensitivity analysis: the same instance solved once per factor applied to
//! one penalty family.

use std::path::PathBuf;

use clap::Args;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ensure_non_negative, HangarError, Result};
use crate::instance::{Hangar, Instance, PenaltyFamily};
use crate::tables;

use super::backend::{default_backend, MilpBackend, SolveOptions};
use super::builder::Weights;
use super::report::AircraftRecord;
use super::solve::{parse_start_date, solve_instance, HangarArgs, InstanceArgs, SolverArgs};

const DEFAULT_FACTORS: [f64; 14] = [
    0.0, 0.01, 0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0, 2.25, 2.5, 2.75, 3.0,
];

#[derive(Debug, Args)]
pub struct Sweep {
    #[command(flatten)]
    pub instance: InstanceArgs,
    #[command(flatten)]
    pub hangar: HangarArgs,
    #[command(flatten)]
    pub solver: SolverArgs,
    /// The family scaled by each factor
    #[clap(short, long, value_enum, default_value = "rejection")]
    pub family: PenaltyFamily,
    /// Comma separated scaling factors
    #[clap(long, value_delimiter = ',', default_values_t = DEFAULT_FACTORS)]
    pub factors: Vec<f64>,
    /// Solve the factors in parallel
    #[clap(long)]
    pub parallel: bool,
    /// Skip failing factors instead of aborting the sweep
    #[clap(long)]
    pub continue_on_error: bool,
    /// Factor the roll-time shifts are measured against
    #[clap(long, default_value = "1.0")]
    pub baseline: f64,
    /// If present, the path where to write the summary table (stdout otherwise)
    #[clap(short, long)]
    pub output: Option<PathBuf>,
    /// If present, the path where to write the roll-time shifts
    #[clap(long)]
    pub roll_times: Option<PathBuf>,
    #[clap(long, default_value = "2026-01-01 00:00")]
    pub start_date: String,
}

impl Sweep {
    pub fn sweep(&self) -> Result<()> {
        let start_date = parse_start_date(&self.start_date)?;
        let instance = self.instance.load()?;
        let hangar = self.hangar.hangar()?;
        let weights = self.hangar.weights()?;
        let backend = default_backend();
        let config = SweepConfig {
            parallel: self.parallel,
            continue_on_error: self.continue_on_error,
            start_date,
        };

        let options = self.solver.options()?;
        let ctx = SolveContext {
            hangar: &hangar,
            weights: &weights,
            backend: backend.as_ref(),
            options: &options,
        };
        let runs = sweep(&instance, &ctx, self.family, &self.factors, &config)?;

        tables::write_rows(runs.iter().map(|r| &r.summary), tables::output(self.output.as_deref())?, "summary")?;
        if let Some(path) = self.roll_times.as_deref() {
            tables::write_rows(roll_shifts(&runs, self.baseline)?, tables::output(Some(path))?, "roll times")?;
        }
        Ok(())
    }
}

/// Everything a solve needs besides the instance.
#[derive(Clone, Copy)]
pub struct SolveContext<'a> {
    pub hangar: &'a Hangar,
    pub weights: &'a Weights,
    pub backend: &'a dyn MilpBackend,
    pub options: &'a SolveOptions,
}

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub parallel: bool,
    pub continue_on_error: bool,
    pub start_date: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            continue_on_error: false,
            start_date: "2026-01-01 00:00".to_string(),
        }
    }
}

/// One row of the sensitivity table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub factor: f64,
    pub family: PenaltyFamily,
    pub n_total: usize,
    pub n_current: usize,
    pub n_requests: usize,
    pub n_accepted: usize,
    pub n_rejected: usize,
    pub acceptance_rate: f64,
    pub total_arrival_delay: f64,
    pub total_departure_delay: f64,
    pub p95_departure_delay: Option<f64>,
    pub obj_rejection: f64,
    pub obj_arrival_delay: f64,
    pub obj_departure_delay: f64,
    pub obj_positioning: f64,
    pub objective: f64,
    pub proven_optimal: bool,
}

/// The outcome of the sweep at one factor.
#[derive(Debug, Clone)]
pub struct FactorRun {
    pub factor: f64,
    pub summary: SummaryRecord,
    pub records: Vec<AircraftRecord>,
}

/// Solves `instance` once per factor, each time with `family` scaled by the
/// factor, and returns the runs sorted by factor.
pub fn sweep(
    instance: &Instance,
    ctx: &SolveContext,
    family: PenaltyFamily,
    factors: &[f64],
    config: &SweepConfig,
) -> Result<Vec<FactorRun>> {
    for &factor in factors {
        ensure_non_negative("sweep factor", factor)?;
    }
    let run = |factor: f64| {
        run_factor(instance, ctx, family, factor, &config.start_date)
            .map_err(|source| HangarError::Sweep {
                factor,
                source: Box::new(source),
            })
    };

    let mut runs = if config.continue_on_error {
        let results: Vec<Result<FactorRun>> = if config.parallel {
            factors.par_iter().map(|&f| run(f)).collect()
        } else {
            factors.iter().map(|&f| run(f)).collect()
        };
        results
            .into_iter()
            .filter_map(|r| r.map_err(|e| warn!(error = %e, "skipping factor")).ok())
            .collect()
    } else if config.parallel {
        factors.par_iter().map(|&f| run(f)).collect::<Result<Vec<_>>>()?
    } else {
        factors.iter().map(|&f| run(f)).collect::<Result<Vec<_>>>()?
    };
    runs.sort_by(|a, b| a.factor.total_cmp(&b.factor));
    Ok(runs)
}

fn run_factor(
    instance: &Instance,
    ctx: &SolveContext,
    family: PenaltyFamily,
    factor: f64,
    start_date: &str,
) -> Result<FactorRun> {
    let base = ctx.weights;
    let (scaled, weights) = match family {
        PenaltyFamily::MinTimeGap => (instance.clone(), base.with_min_time_gap(base.min_time_gap * factor)?),
        _ => (instance.scaled(family, factor)?, *base),
    };
    let solved = solve_instance(&scaled, ctx.hangar, &weights, ctx.backend, ctx.options, start_date)?;
    let s = solved.summary;
    info!(
        ?family,
        factor,
        acceptance_rate = s.acceptance_rate,
        objective = s.objective,
        "factor solved"
    );
    Ok(FactorRun {
        factor,
        summary: SummaryRecord {
            factor,
            family,
            n_total: s.n_total,
            n_current: s.n_current,
            n_requests: s.n_requests,
            n_accepted: s.n_accepted,
            n_rejected: s.n_rejected,
            acceptance_rate: s.acceptance_rate,
            total_arrival_delay: s.total_arrival_delay,
            total_departure_delay: s.total_departure_delay,
            p95_departure_delay: s.p95_departure_delay,
            obj_rejection: s.breakdown.rejection,
            obj_arrival_delay: s.breakdown.arrival_delay,
            obj_departure_delay: s.breakdown.departure_delay,
            obj_positioning: s.breakdown.positioning,
            objective: s.objective,
            proven_optimal: solved.proven_optimal,
        },
        records: solved.records,
    })
}

/// Roll times of one aircraft at one factor, against the baseline factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollShift {
    pub factor: f64,
    pub aircraft: String,
    pub roll_in: f64,
    pub roll_out: f64,
    pub delta_roll_in: f64,
    pub delta_roll_out: f64,
}

pub fn roll_shifts(runs: &[FactorRun], baseline: f64) -> Result<Vec<RollShift>> {
    let base = runs
        .iter()
        .find(|r| (r.factor - baseline).abs() < 1e-12)
        .ok_or(HangarError::InvalidParameter {
            name: "baseline factor".into(),
            value: baseline,
            reason: "not among the swept factors",
        })?;
    let mut shifts = vec![];
    for run in runs {
        for (r, b) in run.records.iter().zip(&base.records) {
            debug_assert_eq!(r.id, b.id);
            shifts.push(RollShift {
                factor: run.factor,
                aircraft: r.id.clone(),
                roll_in: r.roll_in,
                roll_out: r.roll_out,
                delta_roll_in: r.roll_in - b.roll_in,
                delta_roll_out: r.roll_out - b.roll_out,
            });
        }
    }
    Ok(shifts)
}

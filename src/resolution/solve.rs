use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::Args;
use tracing::{info, warn};

use crate::error::{HangarError, Result};
use crate::instance::{Hangar, Instance};
use crate::tables::{self, InstanceTables};

use super::backend::{default_backend, MilpBackend, SolveOptions, SolveOutcome};
use super::builder::{build, HangarModel, Weights};
use super::model::Assignment;
use super::report::{extract, relative_gap, summarize, verify, AircraftRecord, SolutionSummary};

const START_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Where the instance comes from: one JSON file or the three CSV tables.
#[derive(Debug, Args)]
pub struct InstanceArgs {
    /// The path to a JSON instance file
    #[clap(short, long, conflicts_with_all = ["models", "current", "requests"],
           required_unless_present_all = ["models", "current", "requests"])]
    pub instance: Option<PathBuf>,
    /// The model catalog table (m, W, L)
    #[clap(long)]
    pub models: Option<PathBuf>,
    /// The parked aircraft table (c, M_ID, ETD, ServT, P_Dep, Init_X, Init_Y)
    #[clap(long)]
    pub current: Option<PathBuf>,
    /// The request table (f, M_ID, ETA, ETD, ServT, P_Rej, P_Arr, P_Dep[, Is_VIP])
    #[clap(long)]
    pub requests: Option<PathBuf>,
}

impl InstanceArgs {
    pub fn load(&self) -> Result<Instance> {
        let tables = match (&self.instance, &self.models, &self.current, &self.requests) {
            (Some(json), _, _, _) => InstanceTables::read_json(json)?,
            (None, Some(models), Some(current), Some(requests)) => InstanceTables::read_csv(models, current, requests)?,
            _ => return Err(HangarError::EmptyInstance),
        };
        let instance = tables.resolve()?;
        info!(
            current = instance.nb_current(),
            requests = instance.nb_future(),
            "instance loaded"
        );
        Ok(instance)
    }
}

/// Hangar geometry and formulation constants.
#[derive(Debug, Args)]
pub struct HangarArgs {
    /// Hangar width (x axis)
    #[clap(long)]
    pub hangar_width: f64,
    /// Hangar length (y axis, the door is at y = length)
    #[clap(long)]
    pub hangar_length: f64,
    /// Clearance around every footprint
    #[clap(long)]
    pub buffer: f64,
    /// Minimum time between two ordered movements
    #[clap(long, default_value = "0.1")]
    pub min_time_gap: f64,
    /// Weight of the x + y placement tie-breaker
    #[clap(long, default_value = "0.001")]
    pub positioning: f64,
}

impl HangarArgs {
    pub fn hangar(&self) -> Result<Hangar> {
        Hangar::new(self.hangar_width, self.hangar_length)
    }

    pub fn weights(&self) -> Result<Weights> {
        Weights::new(self.buffer, self.min_time_gap, self.positioning)
    }
}

/// Budget handed to the MILP engine.
#[derive(Debug, Args)]
pub struct SolverArgs {
    /// Time limit in seconds (honoured by the `highs` build only, microlp ignores it)
    #[clap(short, long)]
    pub time_limit: Option<f64>,
    /// Relative MIP gap at which to stop (highs only)
    #[clap(long)]
    pub mip_gap: Option<f64>,
    /// Number of solver threads (highs only)
    #[clap(long)]
    pub threads: Option<usize>,
    /// Isolate a conflicting constraint subset when the model is infeasible
    #[clap(long)]
    pub diagnose_infeasibility: bool,
}

impl SolverArgs {
    pub fn options(&self) -> Result<SolveOptions> {
        if let Some(limit) = self.time_limit {
            crate::error::ensure_non_negative("time limit", limit)?;
        }
        if let Some(gap) = self.mip_gap {
            crate::error::ensure_non_negative("MIP gap", gap)?;
        }
        Ok(SolveOptions {
            time_limit: self.time_limit,
            mip_gap: self.mip_gap,
            threads: self.threads,
            diagnose_infeasibility: self.diagnose_infeasibility,
        })
    }
}

#[derive(Debug, Args)]
pub struct Solve {
    #[command(flatten)]
    pub instance: InstanceArgs,
    #[command(flatten)]
    pub hangar: HangarArgs,
    #[command(flatten)]
    pub solver: SolverArgs,
    /// If present, the path where to write the per-aircraft report (stdout otherwise)
    #[clap(short, long)]
    pub output: Option<PathBuf>,
    /// If present, the path where to dump every model variable
    #[clap(long)]
    pub vars: Option<PathBuf>,
    /// Label of the schedule origin, YYYY-MM-DD HH:MM
    #[clap(long, default_value = "2026-01-01 00:00")]
    pub start_date: String,
}

impl Solve {
    pub fn solve(&self) -> Result<()> {
        let start_date = parse_start_date(&self.start_date)?;
        let instance = self.instance.load()?;
        let hangar = self.hangar.hangar()?;
        let weights = self.hangar.weights()?;
        let backend = default_backend();

        let solved = solve_instance(&instance, &hangar, &weights, backend.as_ref(), &self.solver.options()?, &start_date)?;

        tables::write_rows(&solved.records, tables::output(self.output.as_deref())?, "report")?;
        if let Some(path) = self.vars.as_deref() {
            tables::write_variables(&solved.model.milp, &solved.assignment, tables::output(Some(path))?)?;
        }
        let s = &solved.summary;
        info!(
            accepted = s.n_accepted,
            rejected = s.n_rejected,
            acceptance_rate = s.acceptance_rate,
            rejection = s.breakdown.rejection,
            arrival_delay = s.breakdown.arrival_delay,
            departure_delay = s.breakdown.departure_delay,
            positioning = s.breakdown.positioning,
            objective = s.objective,
            solver_objective = solved.solver_objective,
            "solution"
        );
        Ok(())
    }
}

/// Validates the schedule origin label and returns it normalized.
pub fn parse_start_date(text: &str) -> Result<String> {
    NaiveDateTime::parse_from_str(text.trim(), START_DATE_FORMAT)
        .map(|d| d.format(START_DATE_FORMAT).to_string())
        .map_err(|_| HangarError::StartDate(text.to_string()))
}

/// Everything a single solve produces.
#[derive(Debug, Clone)]
pub struct Solved {
    pub model: HangarModel,
    pub assignment: Assignment,
    pub records: Vec<AircraftRecord>,
    pub summary: SolutionSummary,
    /// Objective as evaluated on the solver's assignment.
    pub solver_objective: f64,
    pub proven_optimal: bool,
}

/// Build, solve, extract and summarize one instance.
pub fn solve_instance(
    instance: &Instance,
    hangar: &Hangar,
    weights: &Weights,
    backend: &dyn MilpBackend,
    options: &SolveOptions,
    start_date: &str,
) -> Result<Solved> {
    let violations = instance.initial_violations(hangar, weights.buffer);
    if !violations.is_empty() {
        return Err(HangarError::InitialConfiguration { violations });
    }

    let model = build(instance, hangar, weights)?;
    let outcome = backend.solve(&model.milp, options)?;
    let proven_optimal = matches!(outcome, SolveOutcome::Optimal(_));
    let assignment = outcome.into_assignment()?;

    let solver_objective = model.milp.objective().eval(&assignment);
    let records = extract(&model, &assignment, instance, hangar, start_date);
    let summary = summarize(&records, weights.positioning);

    if relative_gap(summary.objective, solver_objective) > 1e-6 {
        warn!(
            reconstructed = summary.objective,
            solver = solver_objective,
            "objective breakdown does not add up to the solver objective"
        );
    }
    for row in model.milp.violations(&assignment, 1e-6) {
        warn!(%row, "assignment violates the formulation");
    }
    for violation in verify(&records, instance, hangar, weights) {
        warn!(%violation, "solution check failed");
    }
    info!(
        objective = solver_objective,
        proven_optimal,
        big_m_time = model.big_m.time,
        "instance solved"
    );

    Ok(Solved {
        model,
        assignment,
        records,
        summary,
        solver_objective,
        proven_optimal,
    })
}

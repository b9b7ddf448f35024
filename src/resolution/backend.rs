//! Bridge between a [`MilpModel`] and the engines reachable through `good_lp`.

use std::time::Instant;

use good_lp::*;
use tracing::{debug, info, warn};

use crate::error::{HangarError, Result};

use super::model::{Assignment, Domain, MilpModel, Sense, VarId};

#[cfg(not(any(feature = "microlp", feature = "highs")))]
compile_error!("enable the `microlp` or the `highs` feature");

/// Budget handed to the engine. Engines that cannot honour a field say so in
/// the log and ignore it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveOptions {
    /// Wall-clock limit in seconds.
    pub time_limit: Option<f64>,
    /// Relative optimality gap at which the search may stop.
    pub mip_gap: Option<f64>,
    pub threads: Option<usize>,
    /// Search an irreducible conflicting subset when the model is infeasible.
    pub diagnose_infeasibility: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Optimal(Assignment),
    /// Feasible, but the search stopped on the time limit or the gap.
    BestFound(Assignment),
    Infeasible { conflict: Vec<String> },
    Unbounded,
}

impl SolveOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            SolveOutcome::Optimal(_) => "optimal",
            SolveOutcome::BestFound(_) => "best_found",
            SolveOutcome::Infeasible { .. } => "infeasible",
            SolveOutcome::Unbounded => "unbounded",
        }
    }

    /// The assignment of a feasible outcome, the outcome as an error otherwise.
    pub fn into_assignment(self) -> Result<Assignment> {
        match self {
            SolveOutcome::Optimal(a) | SolveOutcome::BestFound(a) => Ok(a),
            SolveOutcome::Infeasible { conflict } => Err(HangarError::Infeasible { conflict }),
            SolveOutcome::Unbounded => Err(HangarError::Unbounded),
        }
    }
}

/// A MILP engine.
pub trait MilpBackend: Sync {
    fn name(&self) -> &'static str;

    /// A single engine call on `model`.
    fn run(&self, model: &MilpModel, options: &SolveOptions) -> Result<SolveOutcome>;

    /// [`Self::run`], followed by a conflict search when the model turns out
    /// infeasible and the options ask for it.
    fn solve(&self, model: &MilpModel, options: &SolveOptions) -> Result<SolveOutcome> {
        let start = Instant::now();
        let outcome = self.run(model, options)?;
        info!(
            backend = self.name(),
            status = outcome.status(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "solve finished"
        );
        match outcome {
            SolveOutcome::Infeasible { .. } if options.diagnose_infeasibility => {
                let conflict = conflict_set(self, model, options)?;
                Ok(SolveOutcome::Infeasible { conflict })
            }
            outcome => Ok(outcome),
        }
    }
}

/// Deletion filter: drops each constraint in turn and keeps it out whenever
/// the rest stays infeasible. What survives is an irreducible infeasible
/// subset, variable bounds aside.
fn conflict_set<B: MilpBackend + ?Sized>(backend: &B, model: &MilpModel, options: &SolveOptions) -> Result<Vec<String>> {
    let filter_options = SolveOptions {
        diagnose_infeasibility: false,
        ..options.clone()
    };
    let mut keep = vec![true; model.constraints().len()];
    for i in 0..keep.len() {
        keep[i] = false;
        let sub = model.feasibility_subproblem(&keep);
        match backend.run(&sub, &filter_options)? {
            SolveOutcome::Infeasible { .. } => {}
            _ => keep[i] = true,
        }
    }
    let conflict: Vec<String> = model
        .constraints()
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(c, _)| c.name.clone())
        .collect();
    debug!(size = conflict.len(), "conflict set isolated");
    Ok(conflict)
}

/// The `good_lp` rendition of a model.
struct Translated {
    vars: ProblemVariables,
    handles: Vec<Variable>,
    objective: Expression,
    constraints: Vec<Constraint>,
}

fn translate(model: &MilpModel) -> Translated {
    let mut vars = ProblemVariables::new();
    let handles: Vec<Variable> = model
        .vars()
        .iter()
        .map(|def| {
            let mut v = variable().name(def.name.clone());
            if def.domain == Domain::Binary {
                v = v.integer();
            }
            v = v.min(def.lower);
            if def.upper.is_finite() {
                v = v.max(def.upper);
            }
            vars.add(v)
        })
        .collect();

    let expression = |terms: &[(VarId, f64)]| {
        let mut e = Expression::with_capacity(terms.len());
        for (var, coef) in terms {
            e.add_mul(*coef, handles[var.index()]);
        }
        e
    };

    let objective = expression(&model.objective().terms);
    let constraints = model
        .constraints()
        .iter()
        .map(|c| {
            let lhs = expression(&c.lhs.terms);
            let rhs = c.rhs - c.lhs.constant;
            match c.sense {
                Sense::Le => lhs.leq(rhs),
                Sense::Ge => lhs.geq(rhs),
            }
        })
        .collect();

    Translated {
        vars,
        handles,
        objective,
        constraints,
    }
}

/// Solves a prepared `good_lp` problem and reads the values back.
fn finish<M>(mut problem: M, constraints: Vec<Constraint>, handles: &[Variable], options: &SolveOptions) -> Result<SolveOutcome>
where
    M: SolverModel<Error = ResolutionError>,
{
    for c in constraints {
        problem.add_constraint(c);
    }
    let start = Instant::now();
    let solution = match problem.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => return Ok(SolveOutcome::Infeasible { conflict: vec![] }),
        Err(ResolutionError::Unbounded) => return Ok(SolveOutcome::Unbounded),
        Err(e) => return Err(HangarError::Backend(e.to_string())),
    };
    let assignment = Assignment::new(handles.iter().map(|v| solution.value(*v)).collect());

    // good_lp does not report why the search stopped: a gap, or a run that
    // used up its time budget, means optimality is not proven.
    let out_of_time = options
        .time_limit
        .is_some_and(|limit| start.elapsed().as_secs_f64() >= 0.99 * limit);
    if options.mip_gap.is_some_and(|gap| gap > 0.0) || out_of_time {
        Ok(SolveOutcome::BestFound(assignment))
    } else {
        Ok(SolveOutcome::Optimal(assignment))
    }
}

/// Pure Rust branch and bound, always available.
#[cfg(feature = "microlp")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLp;

#[cfg(feature = "microlp")]
impl MilpBackend for MicroLp {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn run(&self, model: &MilpModel, options: &SolveOptions) -> Result<SolveOutcome> {
        if options.time_limit.is_some() || options.mip_gap.is_some() || options.threads.is_some() {
            warn!("microlp ignores time limit, gap and thread settings");
        }
        let Translated {
            vars,
            handles,
            objective,
            constraints,
        } = translate(model);
        let problem = vars.minimise(objective).using(good_lp::solvers::microlp::microlp);
        finish(problem, constraints, &handles, options)
    }
}

/// HiGHS through its C API.
#[cfg(feature = "highs")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Highs;

#[cfg(feature = "highs")]
impl MilpBackend for Highs {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn run(&self, model: &MilpModel, options: &SolveOptions) -> Result<SolveOutcome> {
        let Translated {
            vars,
            handles,
            objective,
            constraints,
        } = translate(model);
        let mut problem = vars
            .minimise(objective)
            .using(good_lp::solvers::highs::highs)
            .set_verbose(false);
        if let Some(limit) = options.time_limit {
            problem = problem.with_time_limit(limit);
        }
        if let Some(gap) = options.mip_gap {
            problem = problem.set_option("mip_rel_gap", gap);
        }
        if let Some(threads) = options.threads {
            problem = problem.set_option("threads", threads as i32);
        }
        finish(problem, constraints, &handles, options)
    }
}

/// HiGHS when compiled in, microlp otherwise.
pub fn default_backend() -> Box<dyn MilpBackend> {
    #[cfg(feature = "highs")]
    return Box::new(Highs);
    #[cfg(not(feature = "highs"))]
    Box::new(MicroLp)
}

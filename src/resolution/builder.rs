//! Mixed-integer formulation of the hangar acceptance, placement and
//! scheduling problem.
//!
//! Every aircraft gets an acceptance bit, a position, roll-in/roll-out times
//! and delay variables. Every ordered pair gets two spatial indicators
//! (`right`, `above`) and four temporal ones (`out_in`, `in_in`, `out_out`,
//! `in_out`). The disjunctions "apart in the plane or apart in time" and
//! "a blocked aircraft leaves after its blocker" are linearized with big-M
//! terms gated by the acceptance bits, so that a rejected request never
//! constrains anybody.
//!
//! The door is on the `y = length` side: an aircraft with a larger `y` and an
//! overlapping `x` range stands between the other one and the door.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ensure_non_negative, HangarError, Result};
use crate::instance::{Hangar, Instance};

use super::model::{Family, LinExpr, MilpModel, Sense, VarId};

/// Constants of the formulation that are not part of the instance data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// Clearance between two footprints and between a footprint and a wall.
    pub buffer: f64,
    /// Minimum time between two movements that must be ordered (epsilon_t).
    pub min_time_gap: f64,
    /// Coefficient of the `x + y` tie-breaker (epsilon_p).
    pub positioning: f64,
}

impl Weights {
    pub fn new(buffer: f64, min_time_gap: f64, positioning: f64) -> Result<Self> {
        ensure_non_negative("buffer", buffer)?;
        ensure_non_negative("minimum time gap", min_time_gap)?;
        ensure_non_negative("positioning coefficient", positioning)?;
        Ok(Self {
            buffer,
            min_time_gap,
            positioning,
        })
    }

    pub fn with_min_time_gap(&self, min_time_gap: f64) -> Result<Self> {
        Self::new(self.buffer, min_time_gap, self.positioning)
    }
}

/// Big-M coefficients, computed once per instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BigM {
    pub time: f64,
    pub x: f64,
    pub y: f64,
}

impl BigM {
    /// `time` covers the latest arrival, every service back to back and one
    /// `min_time_gap` per movement, so no gated time inequality can bind
    /// when its indicator is off.
    pub fn compute(instance: &Instance, hangar: &Hangar, weights: &Weights) -> Self {
        let max_arrival = instance
            .aircraft()
            .iter()
            .map(|a| a.arrival())
            .fold(0.0, f64::max);
        let total_service: f64 = instance.aircraft().iter().map(|a| a.service).sum();
        let movements = (2 * instance.len() + 1) as f64;
        BigM {
            time: max_arrival + total_service + movements * weights.min_time_gap,
            x: hangar.width,
            y: hangar.length,
        }
    }
}

/// Dense storage for one relation over all ordered pairs `(i, j)`, `i != j`.
#[derive(Debug, Clone)]
pub struct PairVars {
    n: usize,
    vars: Vec<VarId>,
}

impl PairVars {
    fn declare(model: &mut MilpModel, instance: &Instance, name: &str) -> Self {
        let n = instance.len();
        let mut vars = Vec::with_capacity(n * n.saturating_sub(1));
        for i in 0..n {
            for j in (0..n).filter(|&j| j != i) {
                vars.push(model.binary(format!(
                    "{name}[{},{}]",
                    instance.get(i).id,
                    instance.get(j).id
                )));
            }
        }
        Self { n, vars }
    }

    pub fn at(&self, i: usize, j: usize) -> VarId {
        debug_assert!(i != j && i < self.n && j < self.n);
        let col = if j < i { j } else { j - 1 };
        self.vars[i * (self.n - 1) + col]
    }
}

/// Handles on every variable family, indexed by aircraft position.
#[derive(Debug, Clone)]
pub struct ModelVars {
    pub accept: Vec<VarId>,
    pub x: Vec<VarId>,
    pub y: Vec<VarId>,
    pub roll_in: Vec<VarId>,
    pub roll_out: Vec<VarId>,
    /// `None` for current aircraft.
    pub arrival_delay: Vec<Option<VarId>>,
    pub departure_delay: Vec<VarId>,
    pub right: PairVars,
    pub above: PairVars,
    pub out_in: PairVars,
    pub in_in: PairVars,
    pub out_out: PairVars,
    pub in_out: PairVars,
}

/// The built formulation together with its variable handles.
#[derive(Debug, Clone)]
pub struct HangarModel {
    pub milp: MilpModel,
    pub vars: ModelVars,
    pub big_m: BigM,
}

/// Builds the formulation for `instance` inside `hangar`.
///
/// Fails before emitting anything when an aircraft cannot fit the hangar
/// once the buffer is removed on both sides.
pub fn build(instance: &Instance, hangar: &Hangar, weights: &Weights) -> Result<HangarModel> {
    if instance.is_empty() {
        return Err(HangarError::EmptyInstance);
    }
    for a in instance.aircraft() {
        if a.width + 2.0 * weights.buffer > hangar.width || a.length + 2.0 * weights.buffer > hangar.length {
            return Err(HangarError::FootprintTooLarge {
                id: a.id.clone(),
                width: a.width,
                length: a.length,
                hangar_width: hangar.width,
                hangar_length: hangar.length,
                buffer: weights.buffer,
            });
        }
    }

    let mut builder = Builder::new(instance, hangar, weights);
    builder.objective();
    builder.acceptance_and_schedule();
    builder.hangar_bounds();
    builder.separation();
    builder.sequencing();
    builder.blocking();
    builder.initial_state();

    let Builder { milp, vars, big_m, .. } = builder;
    debug!(
        variables = milp.vars().len(),
        binaries = milp.nb_binaries(),
        fixed = milp.vars().iter().filter(|v| v.is_fixed()).count(),
        constraints = milp.constraints().len(),
        big_m_time = big_m.time,
        "hangar model built"
    );
    Ok(HangarModel { milp, vars, big_m })
}

struct Builder<'a> {
    inst: &'a Instance,
    hangar: &'a Hangar,
    weights: &'a Weights,
    big_m: BigM,
    milp: MilpModel,
    vars: ModelVars,
}

impl<'a> Builder<'a> {
    fn new(inst: &'a Instance, hangar: &'a Hangar, weights: &'a Weights) -> Self {
        let mut milp = MilpModel::new("hangar_scheduling");
        let ids = || inst.aircraft().iter().map(|a| a.id.as_str());

        let x = ids().map(|id| milp.continuous(format!("X[{id}]"), 0.0)).collect();
        let y = ids().map(|id| milp.continuous(format!("Y[{id}]"), 0.0)).collect();
        let roll_in = ids().map(|id| milp.continuous(format!("Roll_in[{id}]"), 0.0)).collect();
        let roll_out = ids().map(|id| milp.continuous(format!("Roll_out[{id}]"), 0.0)).collect();
        let arrival_delay = inst
            .aircraft()
            .iter()
            .map(|a| (!a.is_current()).then(|| milp.continuous(format!("D_Arr[{}]", a.id), 0.0)))
            .collect();
        let departure_delay = ids().map(|id| milp.continuous(format!("D_Dep[{id}]"), 0.0)).collect();
        let accept = ids().map(|id| milp.binary(format!("Accept[{id}]"))).collect();

        let right = PairVars::declare(&mut milp, inst, "Right");
        let above = PairVars::declare(&mut milp, inst, "Above");
        let out_in = PairVars::declare(&mut milp, inst, "OutIn");
        let in_in = PairVars::declare(&mut milp, inst, "InIn");
        let out_out = PairVars::declare(&mut milp, inst, "OutOut");
        let in_out = PairVars::declare(&mut milp, inst, "InOut");

        Self {
            inst,
            hangar,
            weights,
            big_m: BigM::compute(inst, hangar, weights),
            milp,
            vars: ModelVars {
                accept,
                x,
                y,
                roll_in,
                roll_out,
                arrival_delay,
                departure_delay,
                right,
                above,
                out_in,
                in_in,
                out_out,
                in_out,
            },
        }
    }

    fn id(&self, i: usize) -> &str {
        &self.inst.get(i).id
    }

    fn single(&self, family: Family, i: usize) -> String {
        format!("{}[{}]", family.tag(), self.id(i))
    }

    fn pair(&self, family: Family, i: usize, j: usize) -> String {
        format!("{}[{},{}]", family.tag(), self.id(i), self.id(j))
    }

    fn distinct_pairs(&self) -> impl Iterator<Item = (usize, usize)> {
        let n = self.inst.len();
        (0..n).flat_map(move |i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
    }

    fn involves_future(&self, i: usize, j: usize) -> bool {
        !self.inst.is_current(i) || !self.inst.is_current(j)
    }

    fn objective(&mut self) {
        let v = &self.vars;
        let mut obj = LinExpr::new();
        for f in self.inst.future() {
            let a = self.inst.get(f);
            obj = obj.constant(a.rejection_penalty()).term(v.accept[f], -a.rejection_penalty());
            if let Some(d) = v.arrival_delay[f] {
                obj.add_term(d, a.arrival_penalty());
            }
            obj.add_term(v.x[f], self.weights.positioning);
            obj.add_term(v.y[f], self.weights.positioning);
        }
        for (i, a) in self.inst.aircraft().iter().enumerate() {
            obj.add_term(v.departure_delay[i], a.departure_penalty);
        }
        self.milp.set_objective(obj);
    }

    /// Gating, time-window floors and delay definitions.
    fn acceptance_and_schedule(&mut self) {
        let m = self.big_m;
        let gate = m.x + m.y + 4.0 * m.time;
        for f in self.inst.future() {
            let a = self.inst.get(f);
            let v = &self.vars;
            let mut sum = LinExpr::new()
                .term(v.x[f], 1.0)
                .term(v.y[f], 1.0)
                .term(v.roll_in[f], 1.0)
                .term(v.roll_out[f], 1.0)
                .term(v.departure_delay[f], 1.0)
                .term(v.accept[f], -gate);
            if let Some(d) = v.arrival_delay[f] {
                sum.add_term(d, 1.0);
            }
            let floor = LinExpr::new().term(v.roll_in[f], 1.0).term(v.accept[f], -a.arrival());
            let delay = v.arrival_delay[f].map(|d| LinExpr::new().term(d, 1.0).term(v.roll_in[f], -1.0));

            let name = self.single(Family::AcceptanceGate, f);
            self.milp.add(name, Family::AcceptanceGate, sum, Sense::Le, 0.0);
            let name = self.single(Family::ArrivalFloor, f);
            self.milp.add(name, Family::ArrivalFloor, floor, Sense::Ge, 0.0);
            if let Some(delay) = delay {
                let name = self.single(Family::ArrivalDelay, f);
                self.milp.add(name, Family::ArrivalDelay, delay, Sense::Ge, -a.arrival());
            }
        }
        for i in 0..self.inst.len() {
            let a = self.inst.get(i);
            let v = &self.vars;
            let service = LinExpr::new()
                .term(v.roll_out[i], 1.0)
                .term(v.roll_in[i], -1.0)
                .term(v.accept[i], -a.service);
            let delay = LinExpr::new().term(v.departure_delay[i], 1.0).term(v.roll_out[i], -1.0);
            let departure = a.departure;

            let name = self.single(Family::ServiceDuration, i);
            self.milp.add(name, Family::ServiceDuration, service, Sense::Ge, 0.0);
            let name = self.single(Family::DepartureDelay, i);
            self.milp.add(name, Family::DepartureDelay, delay, Sense::Ge, -departure);
        }
    }

    /// Accepted requests stay inside the buffered hangar.
    fn hangar_bounds(&mut self) {
        let (m, b) = (self.big_m, self.weights.buffer);
        for f in self.inst.future() {
            let a = self.inst.get(f);
            let v = &self.vars;
            let rows = [
                (format!("boundary_x_min[{}]", a.id), LinExpr::new().term(v.x[f], 1.0).term(v.accept[f], -b), Sense::Ge, 0.0),
                (
                    format!("boundary_x_max[{}]", a.id),
                    LinExpr::new().term(v.x[f], 1.0).term(v.accept[f], m.x),
                    Sense::Le,
                    self.hangar.width - b - a.width + m.x,
                ),
                (format!("boundary_y_min[{}]", a.id), LinExpr::new().term(v.y[f], 1.0).term(v.accept[f], -b), Sense::Ge, 0.0),
                (
                    format!("boundary_y_max[{}]", a.id),
                    LinExpr::new().term(v.y[f], 1.0).term(v.accept[f], m.y),
                    Sense::Le,
                    self.hangar.length - b - a.length + m.y,
                ),
            ];
            for (name, lhs, sense, rhs) in rows {
                self.milp.add(name, Family::Boundary, lhs, sense, rhs);
            }
        }
    }

    /// `right(i,j)`: i starts at least `width_j + buffer` after j starts.
    /// `above(i,j)`: same along the length.
    fn separation(&mut self) {
        let (m, b) = (self.big_m, self.weights.buffer);
        for (i, j) in self.distinct_pairs().collect::<Vec<_>>() {
            let aj = self.inst.get(j);
            let v = &self.vars;
            let right = LinExpr::new()
                .term(v.x[j], 1.0)
                .term(v.x[i], -1.0)
                .term(v.right.at(i, j), m.x);
            let above = LinExpr::new()
                .term(v.y[j], 1.0)
                .term(v.y[i], -1.0)
                .term(v.above.at(i, j), m.y);
            let (rhs_right, rhs_above) = (m.x - aj.width - b, m.y - aj.length - b);

            let name = self.pair(Family::RightOf, i, j);
            self.milp.add(name, Family::RightOf, right, Sense::Le, rhs_right);
            let name = self.pair(Family::AboveOf, i, j);
            self.milp.add(name, Family::AboveOf, above, Sense::Le, rhs_above);
        }
    }

    /// Non-overlap disjunction and the links between temporal indicators and
    /// the roll times they describe.
    fn sequencing(&mut self) {
        let n = self.inst.len();
        let (mt, eps) = (self.big_m.time, self.weights.min_time_gap);

        // The disjunction is symmetric in (i, j): once per unordered pair.
        for i in 0..n {
            for j in (i + 1)..n {
                let v = &self.vars;
                let lhs = LinExpr::new()
                    .term(v.right.at(i, j), 1.0)
                    .term(v.right.at(j, i), 1.0)
                    .term(v.above.at(i, j), 1.0)
                    .term(v.above.at(j, i), 1.0)
                    .term(v.out_in.at(i, j), 1.0)
                    .term(v.out_in.at(j, i), 1.0)
                    .term(v.accept[i], -1.0)
                    .term(v.accept[j], -1.0);
                let name = self.pair(Family::NonOverlap, i, j);
                self.milp.add(name, Family::NonOverlap, lhs, Sense::Ge, -1.0);
            }
        }

        let (rin, rout) = (self.vars.roll_in.clone(), self.vars.roll_out.clone());
        for (i, j) in self.distinct_pairs().collect::<Vec<_>>() {
            let v = &self.vars;
            let lhs = LinExpr::new()
                .term(v.roll_out[i], 1.0)
                .term(v.roll_in[j], -1.0)
                .term(v.out_in.at(i, j), mt);
            let name = self.pair(Family::OutBeforeIn, i, j);
            self.milp.add(name, Family::OutBeforeIn, lhs, Sense::Le, mt - eps);

            if !self.inst.is_current(i) && !self.inst.is_current(j) {
                let ind = self.vars.in_in.at(i, j);
                self.ordered(Family::InInOrder, rin[i], rin[j], ind, i, j);
            }
            let ind = self.vars.out_out.at(i, j);
            self.ordered(Family::OutOutOrder, rout[i], rout[j], ind, i, j);
            if self.involves_future(i, j) {
                let ind = self.vars.in_out.at(i, j);
                self.ordered(Family::InOutOrder, rin[i], rout[j], ind, i, j);
            }
        }
    }

    /// `indicator = 1  =>  second >= first + eps`,
    /// `indicator = 0  =>  first >= second + eps`,
    /// both void unless `i` and `j` are accepted.
    fn ordered(&mut self, family: Family, first: VarId, second: VarId, indicator: VarId, i: usize, j: usize) {
        let (mt, eps) = (self.big_m.time, self.weights.min_time_gap);
        let (acc_i, acc_j) = (self.vars.accept[i], self.vars.accept[j]);
        let forward = LinExpr::new()
            .term(second, 1.0)
            .term(first, -1.0)
            .term(indicator, -mt)
            .term(acc_i, -mt)
            .term(acc_j, -mt);
        let backward = LinExpr::new()
            .term(first, 1.0)
            .term(second, -1.0)
            .term(indicator, mt)
            .term(acc_i, -mt)
            .term(acc_j, -mt);
        let name = self.pair(family, i, j);
        self.milp.add(name.clone(), family, forward, Sense::Ge, eps - 3.0 * mt);
        self.milp.add(format!("{name}~"), family, backward, Sense::Ge, eps - 2.0 * mt);
    }

    /// Single access side: when `j` stands in front of `i` (above it with no
    /// lateral separation), `i` cannot leave before `j` leaves, and cannot
    /// come in after `j` until `j` is gone.
    fn blocking(&mut self) {
        let (mt, eps) = (self.big_m.time, self.weights.min_time_gap);
        for (i, j) in self.distinct_pairs().collect::<Vec<_>>() {
            let v = &self.vars;
            let rel = LinExpr::new()
                .term(v.above.at(j, i), -mt)
                .term(v.right.at(i, j), mt)
                .term(v.right.at(j, i), mt);

            let mut out = rel.clone().term(v.roll_out[i], 1.0).term(v.roll_out[j], -1.0);
            out.add_term(v.in_in.at(i, j), -mt);
            let name = self.pair(Family::BlockedRollOut, i, j);
            self.milp.add(name, Family::BlockedRollOut, out, Sense::Ge, eps - 2.0 * mt);

            if self.involves_future(i, j) {
                let mut inn = rel.term(v.roll_in[i], 1.0).term(v.roll_out[j], -1.0);
                inn.add_term(self.vars.in_in.at(i, j), mt);
                let name = self.pair(Family::BlockedRollIn, i, j);
                self.milp.add(name, Family::BlockedRollIn, inn, Sense::Ge, eps - mt);
            }
        }
    }

    /// Parked aircraft: accepted, in place, rolled in at zero and before
    /// every request.
    fn initial_state(&mut self) {
        for c in self.inst.current() {
            let Some((x, y)) = self.inst.get(c).initial_position() else { continue };
            self.milp.fix(self.vars.accept[c], 1.0);
            self.milp.fix(self.vars.x[c], x);
            self.milp.fix(self.vars.y[c], y);
            self.milp.fix(self.vars.roll_in[c], 0.0);
            for f in self.inst.future() {
                self.milp.fix(self.vars.in_in.at(c, f), 1.0);
                self.milp.fix(self.vars.in_in.at(f, c), 0.0);
            }
            for d in self.inst.current().filter(|&d| d != c) {
                self.milp.fix(self.vars.in_in.at(c, d), 1.0);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::instance::tests::{current, request};
    use crate::resolution::model::Assignment;

    pub fn weights() -> Weights {
        Weights::new(5.0, 0.1, 0.001).unwrap()
    }

    /// Fixed variables at their value, everything else at zero.
    pub fn baseline(model: &HangarModel) -> Assignment {
        Assignment::new(
            model
                .milp
                .vars()
                .iter()
                .map(|v| if v.is_fixed() { v.lower } else { 0.0 })
                .collect(),
        )
    }

    fn two_aircraft() -> (Instance, Hangar) {
        let inst = Instance::new(vec![
            current("C", 10.0, 10.0, 5.0, 5.0),
            request("F", 10.0, 10.0, 0.0, 1.0, 10.0),
        ])
        .unwrap();
        (inst, Hangar::new(100.0, 100.0).unwrap())
    }

    #[test]
    fn test_variable_layout() {
        let inst = Instance::new(vec![
            current("C", 10.0, 10.0, 5.0, 5.0),
            request("F1", 10.0, 10.0, 0.0, 1.0, 10.0),
            request("F2", 10.0, 10.0, 2.0, 1.0, 10.0),
        ])
        .unwrap();
        let model = build(&inst, &Hangar::new(100.0, 100.0).unwrap(), &weights()).unwrap();
        // accept + x + y + in + out + d_dep per aircraft, d_arr per request,
        // six relations per ordered pair
        assert_eq!(model.milp.vars().len(), 3 * 6 + 2 + 6 * 6);
        assert_eq!(model.milp.nb_binaries(), 3 + 6 * 6);
        assert!(model.vars.arrival_delay[0].is_none());
        assert!(model.vars.arrival_delay[1].is_some());

        let name = |v: VarId| model.milp.var(v).name.clone();
        assert_eq!(name(model.vars.right.at(1, 2)), "Right[F1,F2]");
        assert_eq!(name(model.vars.right.at(2, 1)), "Right[F2,F1]");
        assert_eq!(name(model.vars.in_out.at(2, 0)), "InOut[F2,C]");
    }

    #[test]
    fn test_big_m_covers_arrivals_services_and_gaps() {
        let inst = Instance::new(vec![
            current("C", 10.0, 10.0, 5.0, 5.0),
            request("F1", 10.0, 10.0, 3.0, 2.0, 10.0),
            request("F2", 10.0, 10.0, 7.0, 4.0, 10.0),
        ])
        .unwrap();
        let hangar = Hangar::new(150.0, 100.0).unwrap();
        let m = BigM::compute(&inst, &hangar, &weights());
        assert!((m.time - (7.0 + 6.0 + 7.0 * 0.1)).abs() < 1e-12);
        assert_eq!(m.x, 150.0);
        assert_eq!(m.y, 100.0);
    }

    #[test]
    fn test_footprint_too_large() {
        let inst = Instance::new(vec![request("F", 95.0, 10.0, 0.0, 1.0, 10.0)]).unwrap();
        let err = build(&inst, &Hangar::new(100.0, 100.0).unwrap(), &weights()).unwrap_err();
        assert!(matches!(err, HangarError::FootprintTooLarge { .. }));
    }

    #[test]
    fn test_initial_state_is_fixed() {
        let (inst, hangar) = two_aircraft();
        let model = build(&inst, &hangar, &weights()).unwrap();
        let v = &model.vars;
        let fixed = |var: VarId| {
            let def = model.milp.var(var);
            def.is_fixed().then_some(def.lower)
        };
        assert_eq!(fixed(v.accept[0]), Some(1.0));
        assert_eq!(fixed(v.x[0]), Some(5.0));
        assert_eq!(fixed(v.y[0]), Some(5.0));
        assert_eq!(fixed(v.roll_in[0]), Some(0.0));
        assert_eq!(fixed(v.in_in.at(0, 1)), Some(1.0));
        assert_eq!(fixed(v.in_in.at(1, 0)), Some(0.0));
        assert_eq!(fixed(v.accept[1]), None);
        assert_eq!(fixed(v.x[1]), None);
    }

    /// Request parked to the right of the current aircraft, both present.
    fn side_by_side(model: &HangarModel) -> Assignment {
        let v = &model.vars;
        let mut a = baseline(model);
        a.set(v.accept[1], 1.0);
        a.set(v.x[1], 20.0);
        a.set(v.y[1], 5.0);
        a.set(v.roll_out[0], 0.1);
        a.set(v.roll_in[1], 0.0);
        a.set(v.roll_out[1], 1.0);
        a.set(v.right.at(1, 0), 1.0);
        a.set(v.out_out.at(0, 1), 1.0);
        a.set(v.in_out.at(0, 1), 1.0);
        a.set(v.in_out.at(1, 0), 1.0);
        a
    }

    #[test]
    fn test_side_by_side_is_feasible() {
        let (inst, hangar) = two_aircraft();
        let model = build(&inst, &hangar, &weights()).unwrap();
        let a = side_by_side(&model);
        assert_eq!(model.milp.violations(&a, 1e-9), Vec::<String>::new());
        assert!((model.milp.objective().eval(&a) - 0.001 * 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_overlap_is_infeasible() {
        let (inst, hangar) = two_aircraft();
        let model = build(&inst, &hangar, &weights()).unwrap();

        let mut a = side_by_side(&model);
        a.set(model.vars.x[1], 18.0);
        assert!(model.milp.violations(&a, 1e-9).contains(&"right[F,C]".to_string()));

        a.set(model.vars.right.at(1, 0), 0.0);
        assert!(model.milp.violations(&a, 1e-9).contains(&"nonoverlap[C,F]".to_string()));
    }

    #[test]
    fn test_time_separation_replaces_space_separation() {
        let (inst, hangar) = two_aircraft();
        let model = build(&inst, &hangar, &weights()).unwrap();
        let v = &model.vars;
        // same spot, but the current aircraft leaves before the request enters
        let mut a = baseline(&model);
        a.set(v.accept[1], 1.0);
        a.set(v.x[1], 5.0);
        a.set(v.y[1], 5.0);
        a.set(v.roll_out[0], 0.0);
        a.set(v.roll_in[1], 0.1);
        a.set(v.roll_out[1], 1.1);
        a.set(v.arrival_delay[1].unwrap(), 0.1);
        a.set(v.out_in.at(0, 1), 1.0);
        a.set(v.out_out.at(0, 1), 1.0);
        a.set(v.in_out.at(0, 1), 1.0);
        assert_eq!(model.milp.violations(&a, 1e-9), Vec::<String>::new());

        // entering together with the departure breaks the minimum gap
        a.set(v.roll_in[1], 0.05);
        a.set(v.arrival_delay[1].unwrap(), 0.05);
        let violations = model.milp.violations(&a, 1e-9);
        assert!(violations.contains(&"out_in[C,F]".to_string()));
        assert!(violations.contains(&"in_out[F,C]~".to_string()));
    }

    #[test]
    fn test_rejected_request_is_free_of_constraints() {
        let (inst, hangar) = two_aircraft();
        let model = build(&inst, &hangar, &weights()).unwrap();
        let mut a = baseline(&model);
        a.set(model.vars.roll_out[0], 0.0);
        assert_eq!(model.milp.violations(&a, 1e-9), Vec::<String>::new());
        assert!((model.milp.objective().eval(&a) - 1000.0).abs() < 1e-9);

        // a rejected request may not keep a footprint or a schedule
        a.set(model.vars.x[1], 20.0);
        assert!(model.milp.violations(&a, 1e-9).contains(&"gate[F]".to_string()));
    }

    #[test]
    fn test_request_cannot_enter_behind_a_parked_blocker() {
        // C stands between the door and F's spot.
        let inst = Instance::new(vec![
            current("C", 10.0, 10.0, 5.0, 25.0),
            request("F", 10.0, 10.0, 0.0, 1.0, 10.0),
        ])
        .unwrap();
        let model = build(&inst, &Hangar::new(100.0, 100.0).unwrap(), &weights()).unwrap();
        let v = &model.vars;
        let mut a = baseline(&model);
        a.set(v.accept[1], 1.0);
        a.set(v.x[1], 5.0);
        a.set(v.y[1], 5.0);
        a.set(v.roll_out[0], 0.0);
        a.set(v.roll_in[1], 0.1);
        a.set(v.roll_out[1], 1.1);
        a.set(v.arrival_delay[1].unwrap(), 0.1);
        a.set(v.above.at(0, 1), 1.0);
        a.set(v.out_out.at(0, 1), 1.0);
        a.set(v.in_out.at(0, 1), 1.0);
        assert_eq!(model.milp.violations(&a, 1e-9), Vec::<String>::new());

        a.set(v.roll_in[1], 0.05);
        a.set(v.arrival_delay[1].unwrap(), 0.05);
        assert!(model.milp.violations(&a, 1e-9).contains(&"blocked_in[F,C]".to_string()));
    }

    #[test]
    fn test_deep_aircraft_leaves_after_its_blocker() {
        // F parks in front of C, so C must wait for F to leave.
        let inst = Instance::new(vec![
            current("C", 10.0, 10.0, 5.0, 5.0),
            request("F", 10.0, 10.0, 0.0, 1.0, 10.0),
        ])
        .unwrap();
        let model = build(&inst, &Hangar::new(100.0, 100.0).unwrap(), &weights()).unwrap();
        let v = &model.vars;
        let mut a = baseline(&model);
        a.set(v.accept[1], 1.0);
        a.set(v.x[1], 5.0);
        a.set(v.y[1], 25.0);
        a.set(v.roll_in[1], 0.1);
        a.set(v.roll_out[1], 1.1);
        a.set(v.arrival_delay[1].unwrap(), 0.1);
        a.set(v.roll_out[0], 1.2);
        a.set(v.above.at(1, 0), 1.0);
        a.set(v.out_out.at(1, 0), 1.0);
        a.set(v.in_out.at(0, 1), 1.0);
        a.set(v.in_out.at(1, 0), 1.0);
        assert_eq!(model.milp.violations(&a, 1e-9), Vec::<String>::new());

        a.set(v.roll_out[0], 0.5);
        a.set(v.out_out.at(1, 0), 0.0);
        a.set(v.out_out.at(0, 1), 1.0);
        let violations = model.milp.violations(&a, 1e-9);
        assert!(violations.contains(&"blocked_out[C,F]".to_string()));
    }
}

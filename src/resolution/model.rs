//! Solver independent mixed-integer linear program.
//!
//! The builder emits variables, named constraints and a linear objective into
//! a [`MilpModel`]; backends translate it for their engine and hand back an
//! [`Assignment`] indexed by [`VarId`].

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Continuous,
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub domain: Domain,
    pub lower: f64,
    pub upper: f64,
}

impl VarDef {
    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }
}

/// `Σ coef·var + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn constant(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
    }

    pub fn eval(&self, assignment: &Assignment) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * assignment.value(*v))
            .sum::<f64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Le => write!(f, "<="),
            Sense::Ge => write!(f, ">="),
        }
    }
}

/// The constraint families of the hangar formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    AcceptanceGate,
    ArrivalFloor,
    ServiceDuration,
    ArrivalDelay,
    DepartureDelay,
    Boundary,
    RightOf,
    AboveOf,
    NonOverlap,
    OutBeforeIn,
    InInOrder,
    OutOutOrder,
    InOutOrder,
    BlockedRollOut,
    BlockedRollIn,
}

impl Family {
    pub fn tag(self) -> &'static str {
        match self {
            Family::AcceptanceGate => "gate",
            Family::ArrivalFloor => "arrival_floor",
            Family::ServiceDuration => "service",
            Family::ArrivalDelay => "arrival_delay",
            Family::DepartureDelay => "departure_delay",
            Family::Boundary => "boundary",
            Family::RightOf => "right",
            Family::AboveOf => "above",
            Family::NonOverlap => "nonoverlap",
            Family::OutBeforeIn => "out_in",
            Family::InInOrder => "in_in",
            Family::OutOutOrder => "out_out",
            Family::InOutOrder => "in_out",
            Family::BlockedRollOut => "blocked_out",
            Family::BlockedRollIn => "blocked_in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub family: Family,
    pub lhs: LinExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    /// Amount by which the constraint is violated, zero when satisfied.
    pub fn violation(&self, assignment: &Assignment) -> f64 {
        let lhs = self.lhs.eval(assignment);
        match self.sense {
            Sense::Le => (lhs - self.rhs).max(0.0),
            Sense::Ge => (self.rhs - lhs).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MilpModel {
    pub name: String,
    vars: Vec<VarDef>,
    constraints: Vec<Constraint>,
    objective: LinExpr,
}

impl MilpModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn continuous(&mut self, name: String, lower: f64) -> VarId {
        self.push_var(VarDef {
            name,
            domain: Domain::Continuous,
            lower,
            upper: f64::INFINITY,
        })
    }

    pub fn binary(&mut self, name: String) -> VarId {
        self.push_var(VarDef {
            name,
            domain: Domain::Binary,
            lower: 0.0,
            upper: 1.0,
        })
    }

    fn push_var(&mut self, def: VarDef) -> VarId {
        self.vars.push(def);
        VarId(self.vars.len() - 1)
    }

    /// Pins a variable by collapsing both bounds onto `value`.
    pub fn fix(&mut self, var: VarId, value: f64) {
        let def = &mut self.vars[var.0];
        def.lower = value;
        def.upper = value;
    }

    pub fn add(&mut self, name: String, family: Family, lhs: LinExpr, sense: Sense, rhs: f64) {
        self.constraints.push(Constraint {
            name,
            family,
            lhs,
            sense,
            rhs,
        });
    }

    pub fn set_objective(&mut self, objective: LinExpr) {
        self.objective = objective;
    }

    #[cfg(test)]
    pub fn var(&self, var: VarId) -> &VarDef {
        &self.vars[var.0]
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinExpr {
        &self.objective
    }

    pub fn nb_binaries(&self) -> usize {
        self.vars.iter().filter(|v| v.domain == Domain::Binary).count()
    }

    /// Same variables, a subset of the constraints and a zero objective.
    pub fn feasibility_subproblem(&self, keep: &[bool]) -> MilpModel {
        MilpModel {
            name: format!("{}_feasibility", self.name),
            vars: self.vars.clone(),
            constraints: self
                .constraints
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(c, _)| c.clone())
                .collect(),
            objective: LinExpr::new(),
        }
    }

    /// Constraints and bounds violated by more than `tolerance`.
    pub fn violations(&self, assignment: &Assignment, tolerance: f64) -> Vec<String> {
        let mut out = vec![];
        for (i, def) in self.vars.iter().enumerate() {
            let value = assignment.values[i];
            if value < def.lower - tolerance || value > def.upper + tolerance {
                out.push(format!("bound of {} ({value} not in [{}, {}])", def.name, def.lower, def.upper));
            }
        }
        for c in &self.constraints {
            if c.violation(assignment) > tolerance {
                out.push(c.name.clone());
            }
        }
        out
    }
}

/// Values returned by a backend, one per model variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    values: Vec<f64>,
}

impl Assignment {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.0]
    }

    #[cfg(test)]
    pub fn set(&mut self, var: VarId, value: f64) {
        self.values[var.0] = value;
    }

    /// Binary read with the 0.5 threshold.
    pub fn is_set(&self, var: VarId) -> bool {
        self.values[var.0] >= 0.5
    }

    /// `(name, value)` for every variable, the raw dump of a solve.
    pub fn named<'a>(&'a self, model: &'a MilpModel) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        model
            .vars
            .iter()
            .zip(self.values.iter().copied())
            .map(|(def, value)| (def.name.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_eval() {
        let mut m = MilpModel::new("t");
        let x = m.continuous("x".into(), 0.0);
        let b = m.binary("b".into());
        let e = LinExpr::new().term(x, 2.0).term(b, -3.0).constant(1.5);
        let a = Assignment::new(vec![4.0, 1.0]);
        assert_eq!(e.eval(&a), 2.0 * 4.0 - 3.0 + 1.5);
    }

    #[test]
    fn test_zero_coefficients_are_dropped() {
        let mut m = MilpModel::new("t");
        let x = m.continuous("x".into(), 0.0);
        let e = LinExpr::new().term(x, 0.0);
        assert!(e.terms.is_empty());
    }

    #[test]
    fn test_violations_report_names_and_bounds() {
        let mut m = MilpModel::new("t");
        let x = m.continuous("x".into(), 0.0);
        let y = m.continuous("y".into(), 0.0);
        m.fix(y, 2.0);
        m.add("cap".into(), Family::Boundary, LinExpr::new().term(x, 1.0), Sense::Le, 3.0);
        m.add("floor".into(), Family::ArrivalFloor, LinExpr::new().term(x, 1.0), Sense::Ge, 1.0);

        let ok = Assignment::new(vec![2.0, 2.0]);
        assert!(m.violations(&ok, 1e-9).is_empty());

        let bad = Assignment::new(vec![4.0, 1.0]);
        let v = m.violations(&bad, 1e-9);
        assert_eq!(v.len(), 2);
        assert!(v[0].starts_with("bound of y"));
        assert_eq!(v[1], "cap");
    }

    #[test]
    fn test_feasibility_subproblem_keeps_selected_constraints() {
        let mut m = MilpModel::new("t");
        let x = m.continuous("x".into(), 0.0);
        m.add("a".into(), Family::Boundary, LinExpr::new().term(x, 1.0), Sense::Le, 3.0);
        m.add("b".into(), Family::Boundary, LinExpr::new().term(x, 1.0), Sense::Ge, 5.0);
        m.set_objective(LinExpr::new().term(x, 1.0));

        let sub = m.feasibility_subproblem(&[false, true]);
        assert_eq!(sub.constraints().len(), 1);
        assert_eq!(sub.constraints()[0].name, "b");
        assert!(sub.objective().terms.is_empty());
        assert_eq!(sub.vars().len(), 1);
    }

    #[test]
    fn test_binary_threshold() {
        let mut m = MilpModel::new("t");
        let b = m.binary("b".into());
        let c = m.binary("c".into());
        let a = Assignment::new(vec![0.9999997, 2e-7]);
        assert!(a.is_set(b));
        assert!(!a.is_set(c));
        assert_eq!(m.nb_binaries(), 2);
    }
}

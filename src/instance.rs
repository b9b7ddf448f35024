//! This module defines an abstract representation of a hangar scheduling instance.
//!
//! Aircraft are stored in a single arena: current aircraft first, then the
//! future requests, each addressed by its 0-based position. Every pairwise
//! structure of the model is indexed by these positions.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, HangarError, Result};

/// Plan-view geometry of the hangar. The origin is the corner opposite the door.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hangar {
    pub width: f64,
    pub length: f64,
}

impl Hangar {
    pub fn new(width: f64, length: f64) -> Result<Self> {
        for (name, value) in [("hangar width", width), ("hangar length", length)] {
            ensure_non_negative(name, value)?;
            if value == 0.0 {
                return Err(HangarError::InvalidParameter {
                    name: name.to_string(),
                    value,
                    reason: "must be positive",
                });
            }
        }
        Ok(Self { width, length })
    }
}

/// Request-only attributes of an aircraft that has not arrived yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub arrival: f64,
    pub rejection_penalty: f64,
    pub arrival_penalty: f64,
    pub priority: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Parked in the hangar at time zero.
    Current { x: f64, y: f64 },
    /// Asking to be serviced.
    Future(Request),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
    pub id: String,
    pub model: String,
    pub width: f64,
    pub length: f64,
    pub service: f64,
    pub departure: f64,
    pub departure_penalty: f64,
    pub lifecycle: Lifecycle,
}

impl Aircraft {
    pub fn is_current(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Current { .. })
    }

    pub fn request(&self) -> Option<&Request> {
        match &self.lifecycle {
            Lifecycle::Future(request) => Some(request),
            Lifecycle::Current { .. } => None,
        }
    }

    pub fn initial_position(&self) -> Option<(f64, f64)> {
        match self.lifecycle {
            Lifecycle::Current { x, y } => Some((x, y)),
            Lifecycle::Future(_) => None,
        }
    }

    /// Expected arrival; current aircraft count as arrived at time zero.
    pub fn arrival(&self) -> f64 {
        self.request().map_or(0.0, |r| r.arrival)
    }

    pub fn rejection_penalty(&self) -> f64 {
        self.request().map_or(0.0, |r| r.rejection_penalty)
    }

    pub fn arrival_penalty(&self) -> f64 {
        self.request().map_or(0.0, |r| r.arrival_penalty)
    }

    /// Classification used by the reporting side: an aircraft is a request
    /// exactly when rejecting it or delaying its arrival costs something.
    pub fn is_request_by_penalty(&self) -> bool {
        self.rejection_penalty() > 0.0 || self.arrival_penalty() > 0.0
    }

    fn validate(&self) -> Result<()> {
        let name = |field: &str| format!("{field} of aircraft `{}`", self.id);
        for (field, value) in [("width", self.width), ("length", self.length)] {
            ensure_non_negative(&name(field), value)?;
            if value == 0.0 {
                return Err(HangarError::InvalidParameter {
                    name: name(field),
                    value,
                    reason: "must be positive",
                });
            }
        }
        ensure_non_negative(&name("service duration"), self.service)?;
        ensure_non_negative(&name("departure penalty"), self.departure_penalty)?;
        if !self.departure.is_finite() {
            return Err(HangarError::InvalidParameter {
                name: name("expected departure"),
                value: self.departure,
                reason: "must be finite",
            });
        }
        match &self.lifecycle {
            Lifecycle::Current { x, y } => {
                ensure_non_negative(&name("initial x"), *x)?;
                ensure_non_negative(&name("initial y"), *y)?;
            }
            Lifecycle::Future(request) => {
                ensure_non_negative(&name("expected arrival"), request.arrival)?;
                ensure_non_negative(&name("rejection penalty"), request.rejection_penalty)?;
                ensure_non_negative(&name("arrival penalty"), request.arrival_penalty)?;
            }
        }
        Ok(())
    }

    /// The lifecycle must agree with the penalty-sign classification.
    fn check_classification(&self) -> Result<()> {
        if self.is_current() == self.is_request_by_penalty() {
            let (lifecycle, classified) = if self.is_current() {
                ("current", "a request")
            } else {
                ("a request", "current")
            };
            return Err(HangarError::ClassificationMismatch {
                id: self.id.clone(),
                lifecycle,
                classified,
            });
        }
        Ok(())
    }
}

/// One of the cost-rate vectors that a sensitivity sweep scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyFamily {
    Rejection,
    ArrivalDelay,
    DepartureDelay,
    /// Not a penalty: the minimum separation between two ordered movements.
    MinTimeGap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    aircraft: Vec<Aircraft>,
    nb_current: usize,
}

impl Instance {
    /// Validates the aircraft and lays them out current-first.
    pub fn new(aircraft: Vec<Aircraft>) -> Result<Self> {
        if aircraft.is_empty() {
            return Err(HangarError::EmptyInstance);
        }
        let mut seen = std::collections::HashSet::new();
        for a in &aircraft {
            if !seen.insert(a.id.as_str()) {
                return Err(HangarError::DuplicateId {
                    table: "instance".into(),
                    id: a.id.clone(),
                });
            }
            a.validate()?;
            a.check_classification()?;
        }
        let (mut current, future): (Vec<_>, Vec<_>) =
            aircraft.into_iter().partition(Aircraft::is_current);
        let nb_current = current.len();
        current.extend(future);
        Ok(Self { aircraft: current, nb_current })
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    pub fn aircraft(&self) -> &[Aircraft] {
        &self.aircraft
    }

    pub fn get(&self, idx: usize) -> &Aircraft {
        &self.aircraft[idx]
    }

    pub fn nb_current(&self) -> usize {
        self.nb_current
    }

    pub fn nb_future(&self) -> usize {
        self.aircraft.len() - self.nb_current
    }

    pub fn is_current(&self, idx: usize) -> bool {
        idx < self.nb_current
    }

    pub fn current(&self) -> std::ops::Range<usize> {
        0..self.nb_current
    }

    pub fn future(&self) -> std::ops::Range<usize> {
        self.nb_current..self.aircraft.len()
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.aircraft.iter().position(|a| a.id == id)
    }

    /// Deep copy with one penalty family multiplied by `factor`.
    ///
    /// The copy keeps the current/request partition of `self` even when the
    /// scaled penalties of a request drop to zero. `MinTimeGap` is not carried
    /// by the instance and leaves it unchanged.
    pub fn scaled(&self, family: PenaltyFamily, factor: f64) -> Result<Self> {
        ensure_non_negative("scaling factor", factor)?;
        let mut copy = self.clone();
        for a in copy.aircraft.iter_mut() {
            match (family, &mut a.lifecycle) {
                (PenaltyFamily::Rejection, Lifecycle::Future(r)) => r.rejection_penalty *= factor,
                (PenaltyFamily::ArrivalDelay, Lifecycle::Future(r)) => r.arrival_penalty *= factor,
                (PenaltyFamily::DepartureDelay, _) => a.departure_penalty *= factor,
                _ => {}
            }
        }
        Ok(copy)
    }

    /// Checks the parked aircraft against the hangar walls and each other.
    ///
    /// Returns a human readable description per violation; an empty vector
    /// means the initial state is physically consistent.
    pub fn initial_violations(&self, hangar: &Hangar, buffer: f64) -> Vec<String> {
        const TOL: f64 = 1e-9;
        let mut violations = vec![];
        for c in self.current() {
            let a = &self.aircraft[c];
            let Some((x, y)) = a.initial_position() else { continue };
            if x + TOL < buffer || y + TOL < buffer {
                violations.push(format!(
                    "aircraft {} at ({x}, {y}) is closer than {buffer} to the hangar origin walls",
                    a.id
                ));
            }
            if x + a.width > hangar.width - buffer + TOL {
                violations.push(format!(
                    "aircraft {} exceeds hangar width: {} > {}",
                    a.id,
                    x + a.width,
                    hangar.width - buffer
                ));
            }
            if y + a.length > hangar.length - buffer + TOL {
                violations.push(format!(
                    "aircraft {} exceeds hangar length: {} > {}",
                    a.id,
                    y + a.length,
                    hangar.length - buffer
                ));
            }
        }
        for c in self.current() {
            for d in (c + 1)..self.nb_current {
                let (a, b) = (&self.aircraft[c], &self.aircraft[d]);
                let (Some((ax, ay)), Some((bx, by))) = (a.initial_position(), b.initial_position()) else {
                    continue;
                };
                let apart_x = ax + a.width + buffer <= bx + TOL || bx + b.width + buffer <= ax + TOL;
                let apart_y = ay + a.length + buffer <= by + TOL || by + b.length + buffer <= ay + TOL;
                if !apart_x && !apart_y {
                    violations.push(format!(
                        "aircraft {} and {} overlap (buffer {buffer} included)",
                        a.id, b.id
                    ));
                }
            }
        }
        violations
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn current(id: &str, w: f64, l: f64, x: f64, y: f64) -> Aircraft {
        Aircraft {
            id: id.into(),
            model: "M".into(),
            width: w,
            length: l,
            service: 0.0,
            departure: 10.0,
            departure_penalty: 1.0,
            lifecycle: Lifecycle::Current { x, y },
        }
    }

    pub fn request(id: &str, w: f64, l: f64, arrival: f64, service: f64, departure: f64) -> Aircraft {
        Aircraft {
            id: id.into(),
            model: "M".into(),
            width: w,
            length: l,
            service,
            departure,
            departure_penalty: 1.0,
            lifecycle: Lifecycle::Future(Request {
                arrival,
                rejection_penalty: 1000.0,
                arrival_penalty: 1.0,
                priority: false,
            }),
        }
    }

    #[test]
    fn test_current_aircraft_come_first() {
        let inst = Instance::new(vec![
            request("F1", 10.0, 10.0, 0.0, 1.0, 2.0),
            current("C1", 10.0, 10.0, 5.0, 5.0),
            request("F2", 10.0, 10.0, 0.0, 1.0, 2.0),
        ])
        .unwrap();
        assert_eq!(inst.nb_current(), 1);
        assert_eq!(inst.nb_future(), 2);
        assert_eq!(inst.get(0).id, "C1");
        assert_eq!(inst.get(1).id, "F1");
        assert_eq!(inst.get(2).id, "F2");
        assert_eq!(inst.position_of("F2"), Some(2));
    }

    #[test]
    fn test_empty_instance_rejected() {
        assert!(matches!(Instance::new(vec![]), Err(HangarError::EmptyInstance)));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = Instance::new(vec![
            current("A", 10.0, 10.0, 5.0, 5.0),
            request("A", 10.0, 10.0, 0.0, 1.0, 2.0),
        ])
        .unwrap_err();
        assert!(matches!(err, HangarError::DuplicateId { .. }));
    }

    #[test]
    fn test_request_without_penalties_is_a_classification_mismatch() {
        let mut f = request("F", 10.0, 10.0, 0.0, 1.0, 2.0);
        if let Lifecycle::Future(r) = &mut f.lifecycle {
            r.rejection_penalty = 0.0;
            r.arrival_penalty = 0.0;
        }
        let err = Instance::new(vec![f]).unwrap_err();
        assert!(matches!(err, HangarError::ClassificationMismatch { .. }));
    }

    #[test]
    fn test_zero_width_rejected() {
        let err = Instance::new(vec![current("C", 0.0, 10.0, 5.0, 5.0)]).unwrap_err();
        assert!(matches!(err, HangarError::InvalidParameter { .. }));
    }

    #[test]
    fn test_scaled_touches_only_one_family() {
        let inst = Instance::new(vec![
            current("C", 10.0, 10.0, 5.0, 5.0),
            request("F", 10.0, 10.0, 0.0, 1.0, 2.0),
        ])
        .unwrap();

        let scaled = inst.scaled(PenaltyFamily::Rejection, 0.5).unwrap();
        assert_eq!(scaled.get(1).rejection_penalty(), 500.0);
        assert_eq!(scaled.get(1).arrival_penalty(), 1.0);
        assert_eq!(scaled.get(0).departure_penalty, 1.0);
        // baseline untouched
        assert_eq!(inst.get(1).rejection_penalty(), 1000.0);

        let scaled = inst.scaled(PenaltyFamily::DepartureDelay, 3.0).unwrap();
        assert_eq!(scaled.get(0).departure_penalty, 3.0);
        assert_eq!(scaled.get(1).departure_penalty, 3.0);

        let same = inst.scaled(PenaltyFamily::MinTimeGap, 2.0).unwrap();
        assert_eq!(same, inst);
    }

    #[test]
    fn test_scaled_rejects_negative_factor() {
        let inst = Instance::new(vec![current("C", 10.0, 10.0, 5.0, 5.0)]).unwrap();
        assert!(inst.scaled(PenaltyFamily::Rejection, -1.0).is_err());
    }

    #[test]
    fn test_scaled_to_zero_keeps_requests() {
        let mut f = request("F", 10.0, 10.0, 0.0, 1.0, 2.0);
        if let Lifecycle::Future(r) = &mut f.lifecycle {
            r.arrival_penalty = 0.0;
        }
        let inst = Instance::new(vec![current("C", 10.0, 10.0, 5.0, 5.0), f]).unwrap();
        let free = inst.scaled(PenaltyFamily::Rejection, 0.0).unwrap();
        assert_eq!(free.get(1).rejection_penalty(), 0.0);
        assert!(!free.is_current(1));
        assert_eq!(free.nb_future(), 1);
    }

    #[test]
    fn test_initial_violations() {
        let hangar = Hangar::new(100.0, 100.0).unwrap();
        let ok = Instance::new(vec![
            current("C1", 10.0, 10.0, 5.0, 5.0),
            current("C2", 10.0, 10.0, 20.0, 5.0),
        ])
        .unwrap();
        assert!(ok.initial_violations(&hangar, 5.0).is_empty());

        let overlapping = Instance::new(vec![
            current("C1", 10.0, 10.0, 5.0, 5.0),
            current("C2", 10.0, 10.0, 18.0, 5.0),
        ])
        .unwrap();
        let v = overlapping.initial_violations(&hangar, 5.0);
        assert_eq!(v.len(), 1);
        assert!(v[0].contains("overlap"));

        let outside = Instance::new(vec![current("C1", 10.0, 10.0, 90.0, 2.0)]).unwrap();
        assert_eq!(outside.initial_violations(&hangar, 5.0).len(), 2);
    }
}

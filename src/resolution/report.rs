//! Reading a solved model back as per-aircraft records, and the metrics
//! computed on those records.

use serde::{Serialize, Serializer};

use crate::instance::{Hangar, Instance};

use super::builder::{HangarModel, Weights};
use super::model::Assignment;

const TOL: f64 = 1e-6;

/// One row of the solution report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AircraftRecord {
    #[serde(rename = "Aircraft")]
    pub id: String,
    #[serde(rename = "Accepted", serialize_with = "as_flag")]
    pub accepted: bool,
    #[serde(rename = "Width")]
    pub width: f64,
    #[serde(rename = "Length")]
    pub length: f64,
    #[serde(rename = "ETA")]
    pub arrival: f64,
    #[serde(rename = "Roll_In")]
    pub roll_in: f64,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "ServT")]
    pub service: f64,
    #[serde(rename = "ETD")]
    pub departure: f64,
    #[serde(rename = "Roll_Out")]
    pub roll_out: f64,
    #[serde(rename = "D_Arr")]
    pub arrival_delay: f64,
    #[serde(rename = "D_Dep")]
    pub departure_delay: f64,
    #[serde(rename = "Penalty_Reject")]
    pub rejection_penalty: f64,
    #[serde(rename = "Penalty_ArrivalDelay")]
    pub arrival_penalty: f64,
    #[serde(rename = "Penalty_DepartureDelay")]
    pub departure_penalty: f64,
    #[serde(rename = "Hangar_Width")]
    pub hangar_width: f64,
    #[serde(rename = "Hangar_Length")]
    pub hangar_length: f64,
    #[serde(rename = "StartDate")]
    pub start_date: String,
    /// Lifecycle of the aircraft in the loaded instance.
    #[serde(skip)]
    pub request: bool,
}

fn as_flag<S: Serializer>(accepted: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*accepted))
}

impl AircraftRecord {
    /// Follows the partition of the loaded instance, which agrees with the
    /// penalty signs there. Scaled copies may zero both penalties of a
    /// request without turning it into a parked aircraft.
    pub fn is_request(&self) -> bool {
        self.request
    }
}

/// Per-aircraft records of a solved model, in instance order.
pub fn extract(
    model: &HangarModel,
    assignment: &Assignment,
    instance: &Instance,
    hangar: &Hangar,
    start_date: &str,
) -> Vec<AircraftRecord> {
    let v = &model.vars;
    instance
        .aircraft()
        .iter()
        .enumerate()
        .map(|(i, a)| AircraftRecord {
            id: a.id.clone(),
            accepted: assignment.is_set(v.accept[i]),
            width: a.width,
            length: a.length,
            arrival: a.arrival(),
            roll_in: assignment.value(v.roll_in[i]),
            x: assignment.value(v.x[i]),
            y: assignment.value(v.y[i]),
            service: a.service,
            departure: a.departure,
            roll_out: assignment.value(v.roll_out[i]),
            arrival_delay: v.arrival_delay[i].map_or(0.0, |d| assignment.value(d)),
            departure_delay: assignment.value(v.departure_delay[i]),
            rejection_penalty: a.rejection_penalty(),
            arrival_penalty: a.arrival_penalty(),
            departure_penalty: a.departure_penalty,
            hangar_width: hangar.width,
            hangar_length: hangar.length,
            start_date: start_date.to_string(),
            request: !a.is_current(),
        })
        .collect()
}

/// The objective split into its four terms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObjectiveBreakdown {
    pub rejection: f64,
    pub arrival_delay: f64,
    pub departure_delay: f64,
    pub positioning: f64,
}

impl ObjectiveBreakdown {
    pub fn total(&self) -> f64 {
        self.rejection + self.arrival_delay + self.departure_delay + self.positioning
    }
}

/// Rebuilds the objective from the records. A rejected request costs exactly
/// its rejection penalty.
pub fn decompose(records: &[AircraftRecord], positioning: f64) -> ObjectiveBreakdown {
    let mut b = ObjectiveBreakdown::default();
    for r in records {
        if r.is_request() {
            if !r.accepted {
                b.rejection += r.rejection_penalty;
                continue;
            }
            b.arrival_delay += r.arrival_penalty * r.arrival_delay;
            b.positioning += positioning * (r.x + r.y);
        }
        b.departure_delay += r.departure_penalty * r.departure_delay;
    }
    b
}

/// Relative distance used to compare a reconstructed objective with the
/// solver's.
pub fn relative_gap(reconstructed: f64, reference: f64) -> f64 {
    (reconstructed - reference).abs() / reference.abs().max(1.0)
}

/// `q`-th percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let (lo, hi) = (rank.floor() as usize, rank.ceil() as usize);
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolutionSummary {
    pub n_total: usize,
    pub n_current: usize,
    pub n_requests: usize,
    pub n_accepted: usize,
    pub n_rejected: usize,
    pub acceptance_rate: f64,
    pub total_arrival_delay: f64,
    pub total_departure_delay: f64,
    pub p95_departure_delay: Option<f64>,
    pub breakdown: ObjectiveBreakdown,
    pub objective: f64,
}

pub fn summarize(records: &[AircraftRecord], positioning: f64) -> SolutionSummary {
    let requests: Vec<&AircraftRecord> = records.iter().filter(|r| r.is_request()).collect();
    let n_accepted = requests.iter().filter(|r| r.accepted).count();
    let accepted_delays: Vec<f64> = requests
        .iter()
        .filter(|r| r.accepted)
        .map(|r| r.departure_delay)
        .collect();
    let breakdown = decompose(records, positioning);
    SolutionSummary {
        n_total: records.len(),
        n_current: records.len() - requests.len(),
        n_requests: requests.len(),
        n_accepted,
        n_rejected: requests.len() - n_accepted,
        acceptance_rate: if requests.is_empty() {
            1.0
        } else {
            n_accepted as f64 / requests.len() as f64
        },
        total_arrival_delay: requests.iter().map(|r| r.arrival_delay).sum(),
        total_departure_delay: records.iter().map(|r| r.departure_delay).sum(),
        p95_departure_delay: percentile(&accepted_delays, 95.0),
        breakdown,
        objective: breakdown.total(),
    }
}

/// Physical and definitional checks on a solution, independent of the
/// formulation. Each violation is described in one line.
pub fn verify(records: &[AircraftRecord], instance: &Instance, hangar: &Hangar, weights: &Weights) -> Vec<String> {
    let b = weights.buffer;
    let mut out = vec![];
    for r in records {
        if r.arrival_delay < -TOL || r.departure_delay < -TOL {
            out.push(format!("{}: negative delay", r.id));
        }
        if r.accepted && r.is_request() && r.arrival_delay + TOL < r.roll_in - r.arrival {
            out.push(format!("{}: arrival delay below roll-in lateness", r.id));
        }
        if r.accepted && r.departure_delay + TOL < r.roll_out - r.departure {
            out.push(format!("{}: departure delay below roll-out lateness", r.id));
        }
        // a priced delay never exceeds the lateness it measures
        if r.accepted && r.is_request() && r.arrival_penalty > 0.0 && r.arrival_delay > (r.roll_in - r.arrival).max(0.0) + TOL {
            out.push(format!("{}: arrival delay above roll-in lateness", r.id));
        }
        if r.accepted && r.departure_penalty > 0.0 && r.departure_delay > (r.roll_out - r.departure).max(0.0) + TOL {
            out.push(format!("{}: departure delay above roll-out lateness", r.id));
        }
        if r.accepted && r.roll_out + TOL < r.roll_in + r.service {
            out.push(format!("{}: serviced for less than {}", r.id, r.service));
        }
        if r.accepted && r.is_request() && r.roll_in + TOL < r.arrival {
            out.push(format!("{}: rolled in before arriving", r.id));
        }
        let initial = instance
            .position_of(&r.id)
            .and_then(|i| instance.get(i).initial_position());
        if let Some((x, y)) = initial {
            if !r.accepted {
                out.push(format!("{}: parked aircraft not kept", r.id));
            }
            if (r.x - x).abs() > TOL || (r.y - y).abs() > TOL {
                out.push(format!("{}: parked aircraft moved to ({}, {})", r.id, r.x, r.y));
            }
            if r.roll_in.abs() > TOL {
                out.push(format!("{}: parked aircraft rolled in at {}", r.id, r.roll_in));
            }
        }
        if r.accepted
            && (r.x + TOL < b
                || r.y + TOL < b
                || r.x + r.width > hangar.width - b + TOL
                || r.y + r.length > hangar.length - b + TOL)
        {
            out.push(format!("{}: outside the buffered hangar", r.id));
        }
    }

    let accepted: Vec<&AircraftRecord> = records.iter().filter(|r| r.accepted).collect();
    for (k, p) in accepted.iter().enumerate() {
        for q in &accepted[k + 1..] {
            let eps = weights.min_time_gap;
            let apart_in_time = p.roll_out + eps <= q.roll_in + TOL || q.roll_out + eps <= p.roll_in + TOL;
            let apart_x = p.x + p.width + b <= q.x + TOL || q.x + q.width + b <= p.x + TOL;
            let apart_y = p.y + p.length + b <= q.y + TOL || q.y + q.length + b <= p.y + TOL;
            if !apart_in_time && !apart_x && !apart_y {
                out.push(format!("{} and {}: overlapping while both present", p.id, q.id));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::{current, request};
    use crate::resolution::builder::{build, tests::weights};

    fn record(id: &str, accepted: bool, request: bool) -> AircraftRecord {
        AircraftRecord {
            id: id.into(),
            accepted,
            width: 10.0,
            length: 10.0,
            arrival: 0.0,
            roll_in: 0.0,
            x: 5.0,
            y: 5.0,
            service: 0.0,
            departure: 10.0,
            roll_out: 0.0,
            arrival_delay: 0.0,
            departure_delay: 0.0,
            rejection_penalty: if request { 1000.0 } else { 0.0 },
            arrival_penalty: if request { 2.0 } else { 0.0 },
            departure_penalty: 3.0,
            hangar_width: 100.0,
            hangar_length: 100.0,
            start_date: "2026-01-01 00:00".into(),
            request,
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        assert_eq!(percentile(&[], 95.0), None);
        assert_eq!(percentile(&[4.0], 95.0), Some(4.0));
        let p = percentile(&[0.0, 10.0, 20.0, 30.0, 40.0], 95.0).unwrap();
        assert!((p - 38.0).abs() < 1e-12);
        assert_eq!(percentile(&[3.0, 1.0, 2.0], 50.0), Some(2.0));
    }

    #[test]
    fn test_decompose_gates_rejected_requests() {
        let mut accepted = record("F1", true, true);
        accepted.arrival_delay = 1.5;
        accepted.departure_delay = 0.5;
        accepted.x = 20.0;
        let mut parked = record("C", true, false);
        parked.departure_delay = 2.0;
        let rejected = record("F2", false, true);

        let b = decompose(&[parked, accepted, rejected], 0.001);
        assert_eq!(b.rejection, 1000.0);
        assert!((b.arrival_delay - 3.0).abs() < 1e-12);
        assert!((b.departure_delay - (6.0 + 1.5)).abs() < 1e-12);
        assert!((b.positioning - 0.025).abs() < 1e-12);
        assert!((b.total() - (1000.0 + 3.0 + 7.5 + 0.025)).abs() < 1e-9);
    }

    #[test]
    fn test_summary_counts_and_rate() {
        let mut f1 = record("F1", true, true);
        f1.departure_delay = 4.0;
        let records = vec![record("C", true, false), f1, record("F2", false, true)];
        let s = summarize(&records, 0.001);
        assert_eq!(s.n_total, 3);
        assert_eq!(s.n_current, 1);
        assert_eq!(s.n_requests, 2);
        assert_eq!(s.n_accepted, 1);
        assert_eq!(s.n_rejected, 1);
        assert_eq!(s.acceptance_rate, 0.5);
        assert_eq!(s.p95_departure_delay, Some(4.0));
        assert_eq!(s.objective, s.breakdown.total());
    }

    #[test]
    fn test_summary_without_requests() {
        let s = summarize(&[record("C", true, false)], 0.001);
        assert_eq!(s.acceptance_rate, 1.0);
        assert_eq!(s.p95_departure_delay, None);
    }

    #[test]
    fn test_accepted_serializes_as_flag() {
        let mut w = csv::Writer::from_writer(vec![]);
        w.serialize(record("F", true, true)).unwrap();
        w.serialize(record("G", false, true)).unwrap();
        let text = String::from_utf8(w.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Aircraft,Accepted,Width,Length,ETA,Roll_In"));
        assert!(lines.next().unwrap().starts_with("F,1,"));
        assert!(lines.next().unwrap().starts_with("G,0,"));
    }

    #[test]
    fn test_extract_reads_layout() {
        let inst = Instance::new(vec![
            current("C", 10.0, 10.0, 5.0, 5.0),
            request("F", 10.0, 10.0, 0.0, 1.0, 10.0),
        ])
        .unwrap();
        let hangar = Hangar::new(100.0, 100.0).unwrap();
        let model = build(&inst, &hangar, &weights()).unwrap();
        let mut a = crate::resolution::builder::tests::baseline(&model);
        a.set(model.vars.accept[1], 0.9999);
        a.set(model.vars.x[1], 20.0);
        a.set(model.vars.roll_out[1], 1.0);

        let records = extract(&model, &a, &inst, &hangar, "2026-01-01 00:00");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "C");
        assert!(records[0].accepted);
        assert_eq!((records[0].x, records[0].y), (5.0, 5.0));
        assert_eq!(records[0].arrival_delay, 0.0);
        assert!(records[1].accepted);
        assert_eq!(records[1].x, 20.0);
        assert_eq!(records[1].rejection_penalty, 1000.0);
        assert_eq!(records[1].hangar_width, 100.0);
        assert!(!records[0].is_request());
        assert!(records[1].is_request());
    }

    #[test]
    fn test_verify_flags_delay_beyond_lateness() {
        let inst = Instance::new(vec![request("F", 10.0, 10.0, 0.0, 0.0, 10.0)]).unwrap();
        let hangar = Hangar::new(100.0, 100.0).unwrap();
        let mut f = record("F", true, true);
        f.roll_out = 12.0;
        f.departure_delay = 2.0;
        assert!(verify(&[f.clone()], &inst, &hangar, &weights()).is_empty());

        // leaving on time, yet charged for a late departure
        f.roll_out = 4.0;
        let v = verify(&[f.clone()], &inst, &hangar, &weights());
        assert_eq!(v, vec!["F: departure delay above roll-out lateness".to_string()]);

        // an unpriced delay is left alone
        f.departure_penalty = 0.0;
        assert!(verify(&[f], &inst, &hangar, &weights()).is_empty());
    }

    #[test]
    fn test_verify_flags_overlap_and_moved_parking() {
        let inst = Instance::new(vec![
            current("C", 10.0, 10.0, 5.0, 5.0),
            request("F", 10.0, 10.0, 0.0, 0.0, 10.0),
        ])
        .unwrap();
        let hangar = Hangar::new(100.0, 100.0).unwrap();
        let parked = record("C", true, false);
        let mut f = record("F", true, true);
        f.x = 20.0;
        assert!(verify(&[parked.clone(), f.clone()], &inst, &hangar, &weights()).is_empty());

        f.x = 12.0;
        let v = verify(&[parked.clone(), f.clone()], &inst, &hangar, &weights());
        assert_eq!(v, vec!["C and F: overlapping while both present".to_string()]);

        // same spot, but one after the other
        f.x = 5.0;
        f.roll_in = 0.1;
        f.roll_out = 0.1;
        f.arrival_delay = 0.1;
        assert!(verify(&[parked.clone(), f.clone()], &inst, &hangar, &weights()).is_empty());

        let mut moved = parked;
        moved.y = 30.0;
        let v = verify(&[moved, f], &inst, &hangar, &weights());
        assert_eq!(v.len(), 1);
        assert!(v[0].contains("moved"));
    }
}

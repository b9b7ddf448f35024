use std::{io::Write, path::PathBuf};

use clap::Args;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Bernoulli, Distribution, Uniform};
use tracing::{info, warn};

use crate::error::{ensure_non_negative, HangarError, Result};
use crate::tables::{self, CurrentRow, InstanceTables, ModelRow, RequestRow};

#[derive(Debug, Args)]
pub struct HangarGenerator {
    /// The seed of the instance generation
    #[clap(short = 's', long, default_value = "42")]
    seed: u64,
    /// The number of aircraft parked at time zero
    #[clap(short = 'c', long, default_value = "3")]
    nb_current: usize,
    /// The number of service requests
    #[clap(short = 'n', long, default_value = "7")]
    nb_requests: usize,
    /// The number of aircraft models in the catalog
    #[clap(short = 'm', long, default_value = "4")]
    nb_models: usize,
    /// Hangar width used to clamp the model dimensions
    #[clap(long, default_value = "150")]
    hangar_width: f64,
    /// Hangar length used to clamp the model dimensions
    #[clap(long, default_value = "100")]
    hangar_length: f64,
    /// Clearance kept around every parked aircraft
    #[clap(long, default_value = "5")]
    buffer: f64,
    /// Arrivals are spread uniformly over [0, horizon)
    #[clap(long, default_value = "24")]
    horizon: f64,
    #[clap(long, default_value = "20")]
    min_width: f64,
    #[clap(long, default_value = "80")]
    max_width: f64,
    #[clap(long, default_value = "20")]
    min_length: f64,
    #[clap(long, default_value = "76")]
    max_length: f64,
    #[clap(long, default_value = "0.5")]
    min_service: f64,
    #[clap(long, default_value = "3")]
    max_service: f64,
    /// Bounds of the slack between the end of service and the expected departure
    #[clap(long, default_value = "0.25")]
    min_slack: f64,
    #[clap(long, default_value = "1")]
    max_slack: f64,
    /// Probability that a request is flagged as priority
    #[clap(long, default_value = "0.2")]
    priority_probability: f64,
    #[clap(long, default_value = "500")]
    min_rejection_penalty: f64,
    #[clap(long, default_value = "2000")]
    max_rejection_penalty: f64,
    #[clap(long, default_value = "10")]
    min_delay_penalty: f64,
    #[clap(long, default_value = "50")]
    max_delay_penalty: f64,
    /// Name of the file where to generate the JSON instance
    #[clap(short, long)]
    output: Option<PathBuf>,
}

impl HangarGenerator {
    pub fn generate(&self) -> Result<()> {
        let tables = self.tables()?;
        let mut out = tables::output(self.output.as_deref())?;
        let path = || self.output.clone().unwrap_or_else(|| PathBuf::from("-"));
        serde_json::to_writer_pretty(&mut out, &tables).map_err(|source| HangarError::Json { path: path(), source })?;
        writeln!(out)
            .and_then(|_| out.flush())
            .map_err(|source| HangarError::Io { path: path(), source })?;
        info!(
            models = tables.models.len(),
            current = tables.current.len(),
            requests = tables.requests.len(),
            seed = self.seed,
            "instance generated"
        );
        Ok(())
    }

    fn tables(&self) -> Result<InstanceTables> {
        self.check()?;
        let mut rng = self.rng();
        let models = self.generate_models(&mut rng);
        let current = self.generate_current(&mut rng, &models);
        let requests = self.generate_requests(&mut rng, &models)?;
        Ok(InstanceTables {
            models,
            current,
            requests,
        })
    }

    fn check(&self) -> Result<()> {
        let ranges = [
            ("width", self.min_width, self.max_width),
            ("length", self.min_length, self.max_length),
            ("service", self.min_service, self.max_service),
            ("slack", self.min_slack, self.max_slack),
            ("rejection penalty", self.min_rejection_penalty, self.max_rejection_penalty),
            ("delay penalty", self.min_delay_penalty, self.max_delay_penalty),
            ("horizon", 0.0, self.horizon),
        ];
        for (name, low, high) in ranges {
            ensure_non_negative(name, low)?;
            ensure_non_negative(name, high)?;
            if low > high {
                return Err(HangarError::InvalidParameter {
                    name: format!("maximum {name}"),
                    value: high,
                    reason: "must not be below the minimum",
                });
            }
        }
        if self.nb_models == 0 {
            return Err(HangarError::InvalidParameter {
                name: "number of models".into(),
                value: 0.0,
                reason: "must be positive",
            });
        }
        if !(0.0..=1.0).contains(&self.priority_probability) {
            return Err(HangarError::InvalidParameter {
                name: "priority probability".into(),
                value: self.priority_probability,
                reason: "must lie in [0, 1]",
            });
        }
        ensure_non_negative("buffer", self.buffer)?;
        if self.hangar_width <= 2.0 * self.buffer || self.hangar_length <= 2.0 * self.buffer {
            return Err(HangarError::InvalidParameter {
                name: "buffer".into(),
                value: self.buffer,
                reason: "leaves no room inside the hangar",
            });
        }
        Ok(())
    }

    /// Dimensions are clamped so that every model fits the buffered hangar.
    fn generate_models(&self, rng: &mut impl Rng) -> Vec<ModelRow> {
        let rand_width = Uniform::new_inclusive(self.min_width, self.max_width);
        let rand_length = Uniform::new_inclusive(self.min_length, self.max_length);
        let max_width = self.hangar_width - 2.0 * self.buffer;
        let max_length = self.hangar_length - 2.0 * self.buffer;

        (0..self.nb_models)
            .map(|m| ModelRow {
                id: format!("M{}", m + 1),
                width: round2(rand_width.sample(rng).min(max_width)),
                length: round2(rand_length.sample(rng).min(max_length)),
            })
            .collect()
    }

    /// Shelf packing from the origin: left to right, one row after the other
    /// towards the door. Aircraft that do not fit anymore are dropped.
    fn generate_current(&self, rng: &mut impl Rng, models: &[ModelRow]) -> Vec<CurrentRow> {
        let rand_model = Uniform::new(0, models.len());
        let rand_service = Uniform::new_inclusive(0.0, self.max_service);
        let rand_slack = Uniform::new_inclusive(self.min_slack, self.max_slack);
        let rand_penalty = Uniform::new_inclusive(self.min_delay_penalty, self.max_delay_penalty);

        let b = self.buffer;
        let (mut x, mut y, mut shelf) = (b, b, 0.0_f64);
        let mut current = vec![];
        for i in 0..self.nb_current {
            let model = &models[rand_model.sample(rng)];
            if x + model.width > self.hangar_width - b {
                x = b;
                y += shelf + b;
                shelf = 0.0;
            }
            if x + model.width > self.hangar_width - b || y + model.length > self.hangar_length - b {
                warn!(placed = i, requested = self.nb_current, "hangar full, fewer parked aircraft generated");
                break;
            }
            let service = round2(rand_service.sample(rng));
            current.push(CurrentRow {
                id: format!("C{}", i + 1),
                model: model.id.clone(),
                departure: round2(service + rand_slack.sample(rng)),
                service,
                departure_penalty: round2(rand_penalty.sample(rng)),
                x,
                y,
            });
            x += model.width + b;
            shelf = shelf.max(model.length);
        }
        current
    }

    fn generate_requests(&self, rng: &mut impl Rng, models: &[ModelRow]) -> Result<Vec<RequestRow>> {
        let rand_model = Uniform::new(0, models.len());
        let rand_arrival = Uniform::new_inclusive(0.0, self.horizon);
        let rand_service = Uniform::new_inclusive(self.min_service, self.max_service);
        let rand_slack = Uniform::new_inclusive(self.min_slack, self.max_slack);
        let rand_rejection = Uniform::new_inclusive(self.min_rejection_penalty, self.max_rejection_penalty);
        let rand_penalty = Uniform::new_inclusive(self.min_delay_penalty, self.max_delay_penalty);
        let rand_priority = Bernoulli::new(self.priority_probability).map_err(|_| HangarError::InvalidParameter {
            name: "priority probability".into(),
            value: self.priority_probability,
            reason: "must lie in [0, 1]",
        })?;

        let mut requests = vec![];
        for i in 0..self.nb_requests {
            let model = &models[rand_model.sample(rng)];
            let arrival = round2(rand_arrival.sample(rng));
            let service = round2(rand_service.sample(rng));
            requests.push(RequestRow {
                id: format!("F{}", i + 1),
                model: model.id.clone(),
                arrival,
                departure: round2(arrival + service + rand_slack.sample(rng)),
                service,
                // strictly positive so the row always classifies as a request
                rejection_penalty: round2(rand_rejection.sample(rng)).max(0.01),
                arrival_penalty: round2(rand_penalty.sample(rng)),
                departure_penalty: round2(rand_penalty.sample(rng)),
                priority: rand_priority.sample(rng),
            });
        }
        Ok(requests)
    }

    fn rng(&self) -> impl Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        generator: HangarGenerator,
    }

    fn generator(args: &[&str]) -> HangarGenerator {
        Cli::parse_from(std::iter::once("generate").chain(args.iter().copied())).generator
    }

    #[test]
    fn test_same_seed_same_instance() {
        let a = generator(&["--seed", "7"]).tables().unwrap();
        let b = generator(&["--seed", "7"]).tables().unwrap();
        let c = generator(&["--seed", "8"]).tables().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_generated_instance_is_valid() {
        let g = generator(&["-c", "4", "-n", "10"]);
        let tables = g.tables().unwrap();
        assert_eq!(tables.requests.len(), 10);
        assert!(tables.current.len() <= 4);
        let instance = tables.resolve().unwrap();
        let hangar = crate::instance::Hangar::new(150.0, 100.0).unwrap();
        assert!(instance.initial_violations(&hangar, 5.0).is_empty());
        for a in instance.aircraft() {
            assert!(a.width + 10.0 <= 150.0 && a.length + 10.0 <= 100.0);
            assert!(a.departure >= a.arrival() + a.service);
        }
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let g = generator(&["--min-width", "50", "--max-width", "40"]);
        assert!(matches!(g.tables(), Err(HangarError::InvalidParameter { .. })));
    }
}

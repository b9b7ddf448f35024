//! Input tables (model catalog, parked aircraft, requests) and the CSV
//! outputs of a run.
//!
//! Input CSVs are keyed by their first column, whatever its header; the other
//! columns are looked up by name so their order does not matter.

use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{HangarError, Result},
    instance::{Aircraft, Instance, Lifecycle, Request},
    resolution::model::{Assignment, MilpModel},
};

/// `T1`: one aircraft model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRow {
    pub id: String,
    pub width: f64,
    pub length: f64,
}

/// `T2`: an aircraft parked in the hangar at time zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentRow {
    pub id: String,
    pub model: String,
    pub departure: f64,
    pub service: f64,
    pub departure_penalty: f64,
    pub x: f64,
    pub y: f64,
}

/// `T3`: a service request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRow {
    pub id: String,
    pub model: String,
    pub arrival: f64,
    pub departure: f64,
    pub service: f64,
    pub rejection_penalty: f64,
    pub arrival_penalty: f64,
    pub departure_penalty: f64,
    #[serde(default)]
    pub priority: bool,
}

/// The three tables of an instance, before model ids are resolved. This is
/// also the JSON instance format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceTables {
    pub models: Vec<ModelRow>,
    pub current: Vec<CurrentRow>,
    pub requests: Vec<RequestRow>,
}

impl InstanceTables {
    pub fn read_csv(models: &Path, current: &Path, requests: &Path) -> Result<Self> {
        Ok(Self {
            models: parse_models(open(models)?, &models.display().to_string())?,
            current: parse_current(open(current)?, &current.display().to_string())?,
            requests: parse_requests(open(requests)?, &requests.display().to_string())?,
        })
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        serde_json::from_reader(open(path)?).map_err(|source| HangarError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Attaches model dimensions to every aircraft and validates the result.
    pub fn resolve(&self) -> Result<Instance> {
        let mut catalog = HashMap::new();
        for m in &self.models {
            if catalog.insert(m.id.as_str(), m).is_some() {
                return Err(HangarError::DuplicateId {
                    table: "models".into(),
                    id: m.id.clone(),
                });
            }
        }
        let lookup = |aircraft: &str, model: &str| {
            catalog.get(model).copied().ok_or_else(|| HangarError::UnknownModel {
                aircraft: aircraft.to_string(),
                model: model.to_string(),
            })
        };

        let mut aircraft = Vec::with_capacity(self.current.len() + self.requests.len());
        for c in &self.current {
            let m = lookup(&c.id, &c.model)?;
            aircraft.push(Aircraft {
                id: c.id.clone(),
                model: c.model.clone(),
                width: m.width,
                length: m.length,
                service: c.service,
                departure: c.departure,
                departure_penalty: c.departure_penalty,
                lifecycle: Lifecycle::Current { x: c.x, y: c.y },
            });
        }
        for r in &self.requests {
            let m = lookup(&r.id, &r.model)?;
            aircraft.push(Aircraft {
                id: r.id.clone(),
                model: r.model.clone(),
                width: m.width,
                length: m.length,
                service: r.service,
                departure: r.departure,
                departure_penalty: r.departure_penalty,
                lifecycle: Lifecycle::Future(Request {
                    arrival: r.arrival,
                    rejection_penalty: r.rejection_penalty,
                    arrival_penalty: r.arrival_penalty,
                    priority: r.priority,
                }),
            });
        }
        Instance::new(aircraft)
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path).map(BufReader::new).map_err(|source| HangarError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A keyed CSV table read fully in memory.
struct KeyedTable {
    name: String,
    columns: HashMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl KeyedTable {
    fn read<R: Read>(reader: R, name: &str, required: &[&str]) -> Result<Self> {
        let csv_err = |source| HangarError::Csv {
            table: name.to_string(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let columns: HashMap<String, usize> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, h)| (h.to_string(), i))
            .collect();
        for column in required {
            if !columns.contains_key(*column) {
                return Err(HangarError::MissingColumn {
                    table: name.to_string(),
                    column: column.to_string(),
                });
            }
        }
        let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>().map_err(csv_err)?;

        let mut seen = HashSet::new();
        for row in &rows {
            if !seen.insert(row.get(0).unwrap_or_default()) {
                return Err(HangarError::DuplicateId {
                    table: name.to_string(),
                    id: Self::key(row),
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            columns,
            rows,
        })
    }

    fn key(row: &csv::StringRecord) -> String {
        row.get(0).unwrap_or_default().to_string()
    }

    fn text<'r>(&self, row: &'r csv::StringRecord, column: &str) -> Option<&'r str> {
        self.columns.get(column).and_then(|&i| row.get(i))
    }

    fn number(&self, row: &csv::StringRecord, column: &str) -> Result<f64> {
        let value = self.text(row, column).unwrap_or_default();
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| HangarError::InvalidNumber {
                table: self.name.clone(),
                row: Self::key(row),
                column: column.to_string(),
                value: value.to_string(),
            })
    }

    /// `1`/`0`/`true`/`false`; a missing or empty cell reads as false.
    fn flag(&self, row: &csv::StringRecord, column: &str) -> Result<bool> {
        match self.text(row, column).unwrap_or_default() {
            "" => Ok(false),
            "true" | "True" => Ok(true),
            "false" | "False" => Ok(false),
            _ => Ok(self.number(row, column)? != 0.0),
        }
    }
}

pub fn parse_models<R: Read>(reader: R, name: &str) -> Result<Vec<ModelRow>> {
    let t = KeyedTable::read(reader, name, &["W", "L"])?;
    t.rows
        .iter()
        .map(|row| {
            Ok(ModelRow {
                id: KeyedTable::key(row),
                width: t.number(row, "W")?,
                length: t.number(row, "L")?,
            })
        })
        .collect()
}

pub fn parse_current<R: Read>(reader: R, name: &str) -> Result<Vec<CurrentRow>> {
    let t = KeyedTable::read(reader, name, &["M_ID", "ETD", "ServT", "P_Dep", "Init_X", "Init_Y"])?;
    t.rows
        .iter()
        .map(|row| {
            Ok(CurrentRow {
                id: KeyedTable::key(row),
                model: t.text(row, "M_ID").unwrap_or_default().to_string(),
                departure: t.number(row, "ETD")?,
                service: t.number(row, "ServT")?,
                departure_penalty: t.number(row, "P_Dep")?,
                x: t.number(row, "Init_X")?,
                y: t.number(row, "Init_Y")?,
            })
        })
        .collect()
}

pub fn parse_requests<R: Read>(reader: R, name: &str) -> Result<Vec<RequestRow>> {
    let t = KeyedTable::read(reader, name, &["M_ID", "ETA", "ETD", "ServT", "P_Rej", "P_Arr", "P_Dep"])?;
    t.rows
        .iter()
        .map(|row| {
            Ok(RequestRow {
                id: KeyedTable::key(row),
                model: t.text(row, "M_ID").unwrap_or_default().to_string(),
                arrival: t.number(row, "ETA")?,
                departure: t.number(row, "ETD")?,
                service: t.number(row, "ServT")?,
                rejection_penalty: t.number(row, "P_Rej")?,
                arrival_penalty: t.number(row, "P_Arr")?,
                departure_penalty: t.number(row, "P_Dep")?,
                priority: t.flag(row, "Is_VIP")?,
            })
        })
        .collect()
}

/// A file when a path is given, stdout otherwise.
pub fn output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|source| HangarError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

/// Writes serializable rows with a header line taken from their field names.
pub fn write_rows<T, I, W>(rows: I, writer: W, table: &str) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
    W: Write,
{
    let csv_err = |source| HangarError::Csv {
        table: table.to_string(),
        source,
    };
    let mut w = csv::Writer::from_writer(writer);
    for row in rows {
        w.serialize(row).map_err(csv_err)?;
    }
    w.flush().map_err(|e| csv_err(e.into()))
}

#[derive(Serialize)]
struct VariableRow<'a> {
    #[serde(rename = "VarName")]
    name: &'a str,
    #[serde(rename = "Value")]
    value: f64,
}

/// Raw dump of every model variable.
pub fn write_variables<W: Write>(model: &MilpModel, assignment: &Assignment, writer: W) -> Result<()> {
    write_rows(
        assignment.named(model).map(|(name, value)| VariableRow { name, value }),
        writer,
        "variables",
    )
}

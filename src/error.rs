//! Error type shared by every stage of the hangar pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HangarError {
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed table {table}: {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },
    #[error("malformed instance file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("table {table} is missing required column `{column}`")]
    MissingColumn { table: String, column: String },
    #[error("table {table}, row `{row}`: column `{column}` holds `{value}`, expected a number")]
    InvalidNumber {
        table: String,
        row: String,
        column: String,
        value: String,
    },
    #[error("aircraft `{aircraft}` references unknown model `{model}`")]
    UnknownModel { aircraft: String, model: String },
    #[error("identifier `{id}` appears more than once in {table}")]
    DuplicateId { table: String, id: String },
    #[error("instance contains no aircraft")]
    EmptyInstance,
    #[error("invalid value for {name}: {value} ({reason})")]
    InvalidParameter {
        name: String,
        value: f64,
        reason: &'static str,
    },
    #[error("aircraft `{id}` is {lifecycle} but its penalties classify it as {classified}")]
    ClassificationMismatch {
        id: String,
        lifecycle: &'static str,
        classified: &'static str,
    },
    #[error("aircraft `{id}` ({width} x {length}) does not fit a {hangar_width} x {hangar_length} hangar with buffer {buffer}")]
    FootprintTooLarge {
        id: String,
        width: f64,
        length: f64,
        hangar_width: f64,
        hangar_length: f64,
        buffer: f64,
    },
    #[error("initial hangar configuration is infeasible: {}", .violations.join("; "))]
    InitialConfiguration { violations: Vec<String> },
    #[error("model is infeasible{}", conflict_suffix(.conflict))]
    Infeasible { conflict: Vec<String> },
    #[error("model is unbounded")]
    Unbounded,
    #[error("solver backend failed: {0}")]
    Backend(String),
    #[error("sensitivity run at factor {factor} failed: {source}")]
    Sweep {
        factor: f64,
        #[source]
        source: Box<HangarError>,
    },
    #[error("invalid start date `{0}`, expected YYYY-MM-DD HH:MM")]
    StartDate(String),
}

fn conflict_suffix(conflict: &[String]) -> String {
    if conflict.is_empty() {
        String::new()
    } else {
        format!(", conflicting constraints: {}", conflict.join(", "))
    }
}

pub type Result<T> = std::result::Result<T, HangarError>;

/// Rejects NaN, infinities and negative values for a named parameter.
pub fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(HangarError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: "must be finite",
        });
    }
    if value < 0.0 {
        return Err(HangarError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: "must not be negative",
        });
    }
    Ok(())
}

use crate::model::FileRecord;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, warn};

const REQUIRED_FIELDS: &[&str] = &[
    "/id",
    "/data",
    "/data/filename",
    "/figure",
    "/figure/title",
    "/figure/type",
];

#[derive(Debug, Error)]
pub enum FigureSpecError {
    #[error("could not read figure spec file {filename} ({}): {source}", .path.display())]
    Unreadable {
        filename: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON for figure spec file {filename}: {source}")]
    InvalidJson {
        filename: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing fields for figure spec file {filename}: {}", .missing.join(", "))]
    MissingFields {
        filename: String,
        missing: Vec<&'static str>,
    },
}

impl FigureSpecError {
    pub fn filename(&self) -> &str {
        match self {
            FigureSpecError::Unreadable { filename, .. }
            | FigureSpecError::InvalidJson { filename, .. }
            | FigureSpecError::MissingFields { filename, .. } => filename,
        }
    }
}

#[derive(Debug, Default)]
pub struct FigureSpecValidation {
    pub accepted: Vec<FileRecord>,
    // Well formed, but the target was not reproduced.
    pub skipped: Vec<FileRecord>,
    pub errors: Vec<FigureSpecError>,
}

impl FigureSpecValidation {
    pub fn should_fail_job(&self) -> bool {
        !self.errors.is_empty()
    }
}

pub fn validate_figure_specs(
    specs: Vec<FileRecord>,
    targets: &[FileRecord],
) -> FigureSpecValidation {
    let mut validation = FigureSpecValidation::default();
    for spec in specs {
        match check_spec(&spec) {
            Err(err) => {
                error!(filename = %spec.filename, "{}", err);
                validation.errors.push(err);
            }
            Ok(target) => {
                if targets.iter().any(|t| Some(t.filename.as_str()) == target.as_deref()) {
                    validation.accepted.push(spec);
                } else {
                    warn!(
                        filename = %spec.filename,
                        target = target.as_deref().unwrap_or(""),
                        "no matching summary data or figure image for figure spec, skipping"
                    );
                    validation.skipped.push(spec);
                }
            }
        }
    }
    validation
}

fn check_spec(spec: &FileRecord) -> Result<Option<String>, FigureSpecError> {
    let bytes = fs::read(&spec.filepath).map_err(|source| FigureSpecError::Unreadable {
        filename: spec.filename.clone(),
        path: spec.filepath.clone(),
        source,
    })?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|source| FigureSpecError::InvalidJson {
            filename: spec.filename.clone(),
            source,
        })?;
    let missing = missing_fields(&value);
    if !missing.is_empty() {
        return Err(FigureSpecError::MissingFields {
            filename: spec.filename.clone(),
            missing,
        });
    }
    Ok(value
        .pointer("/data/filename")
        .and_then(Value::as_str)
        .map(str::to_string))
}

fn missing_fields(value: &Value) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|pointer| !value.pointer(pointer).map(is_present).unwrap_or(false))
        .collect()
}

// Empty strings, zero, false and null all count as missing.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

use crate::client::{ApiError, ResultsService};
use crate::discovery::{Discovery, DiscoveryError};
use crate::figure_spec::{validate_figure_specs, FigureSpecError};
use crate::model::{FileRecord, FileType, RunStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct ResultsLayout {
    pub raw_data: Option<PathBuf>,
    pub summary_data: Option<PathBuf>,
    pub figures: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("Job failed due to invalid figure spec files")]
    InvalidFigureSpecs { errors: Vec<FigureSpecError> },
    #[error("failed to post results metadata: {0}")]
    Metadata(#[source] ApiError),
    #[error("failed to mark run as completed: {0}")]
    Complete(#[source] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    Uploaded,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileUploadOutcome {
    pub filename: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    #[serde(flatten)]
    pub status: UploadStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub run_id: String,
    pub discovered: BTreeMap<FileType, usize>,
    pub manifest_len: usize,
    pub skipped_figure_specs: Vec<String>,
    pub outcomes: Vec<FileUploadOutcome>,
    pub completed: bool,
}

impl UploadReport {
    pub fn uploaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == UploadStatus::Uploaded)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileUploadOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, UploadStatus::Failed { .. }))
    }
}

fn scan(
    discovery: &mut Discovery,
    dir: Option<&Path>,
    file_type: FileType,
) -> Result<Vec<FileRecord>, DiscoveryError> {
    match dir {
        Some(dir) => discovery.scan_default(dir, file_type),
        None => {
            info!("no {} directory configured, skipping", file_type.display_name());
            Ok(Vec::new())
        }
    }
}

/// Discovers, validates and uploads every result file for `run_id`, then
/// marks the run COMPLETED. A failed upload is recorded in the report and
/// does not stop the rest.
pub fn upload_results(
    service: &dyn ResultsService,
    run_id: &str,
    layout: &ResultsLayout,
) -> Result<UploadReport, UploadError> {
    info!("reading files");
    let mut discovery = Discovery::new();
    let raw = scan(&mut discovery, layout.raw_data.as_deref(), FileType::RawData)?;
    let summary = scan(
        &mut discovery,
        layout.summary_data.as_deref(),
        FileType::SummaryData,
    )?;
    let images = scan(&mut discovery, layout.figures.as_deref(), FileType::FigureImage)?;
    let raw_specs = scan(&mut discovery, layout.figures.as_deref(), FileType::FigureSpec)?;

    let targets: Vec<FileRecord> = summary.iter().chain(images.iter()).cloned().collect();
    let validation = validate_figure_specs(raw_specs, &targets);
    if validation.should_fail_job() {
        return Err(UploadError::InvalidFigureSpecs {
            errors: validation.errors,
        });
    }
    let skipped_figure_specs = validation
        .skipped
        .iter()
        .map(|s| s.filename.clone())
        .collect();

    let manifest: Vec<FileRecord> = raw
        .into_iter()
        .chain(summary)
        .chain(validation.accepted)
        .chain(images)
        .collect();

    service
        .post_results_metadata(run_id, &manifest)
        .map_err(UploadError::Metadata)?;
    info!(run_id, count = manifest.len(), "posted results metadata");

    let mut outcomes = Vec::with_capacity(manifest.len());
    for file in &manifest {
        let status = match service.upload_result_file(run_id, file) {
            Ok(()) => {
                info!(filename = %file.filename, "uploaded file");
                UploadStatus::Uploaded
            }
            Err(err) => {
                error!(filename = %file.filename, error = %err, "error uploading file");
                UploadStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };
        outcomes.push(FileUploadOutcome {
            filename: file.filename.clone(),
            file_type: file.file_type,
            status,
        });
    }

    let mut report = UploadReport {
        run_id: run_id.to_string(),
        discovered: discovery.counts().clone(),
        manifest_len: manifest.len(),
        skipped_figure_specs,
        outcomes,
        completed: false,
    };
    let failed = report.failures().count();
    if failed > 0 {
        warn!(
            uploaded = report.uploaded(),
            failed, "done uploading files, some uploads failed"
        );
    } else {
        info!(uploaded = report.uploaded(), "done uploading files");
    }

    // Upload failures above still end in COMPLETED.
    service
        .patch_run(run_id, &RunStatus::Completed, None)
        .map_err(UploadError::Complete)?;
    info!(run_id, "marked run as completed");
    report.completed = true;
    Ok(report)
}

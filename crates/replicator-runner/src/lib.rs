pub mod actions;
pub mod checksum;
pub mod client;
pub mod discovery;
pub mod figure_spec;
pub mod lifecycle;
pub mod model;
pub mod upload;

#[cfg(test)]
mod testing;

pub use client::{ApiError, Credentials, ResultsService, ScholarClient, DEFAULT_API_URL};
pub use discovery::{Discovery, DiscoveryError};
pub use figure_spec::{validate_figure_specs, FigureSpecError, FigureSpecValidation};
pub use lifecycle::{set_run_status, start_run, StartRun, StartedRun};
pub use model::{FileRecord, FileType, RunMetadata, RunRecord, RunStatus};
pub use upload::{
    upload_results, FileUploadOutcome, ResultsLayout, UploadError, UploadReport, UploadStatus,
};

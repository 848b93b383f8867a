use crate::client::{ApiError, CreateRunRequest, ResultsService};
use crate::model::{FileRecord, RunMetadata, RunRecord, RunStatus};
use std::cell::RefCell;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateRun { ro_id: String },
    PatchRun {
        run_id: String,
        status: String,
        with_data: bool,
    },
    PostMetadata { run_id: String, filenames: Vec<String> },
    Upload { run_id: String, filename: String },
}

#[derive(Default)]
pub struct RecordingService {
    calls: RefCell<Vec<Call>>,
    created_id: Option<String>,
    fail_patches: bool,
    fail_metadata: bool,
    fail_uploads: BTreeSet<String>,
}

impl RecordingService {
    pub fn with_created_id(id: &str) -> Self {
        Self {
            created_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_patches(mut self) -> Self {
        self.fail_patches = true;
        self
    }

    pub fn failing_metadata(mut self) -> Self {
        self.fail_metadata = true;
        self
    }

    pub fn failing_upload(mut self, filename: &str) -> Self {
        self.fail_uploads.insert(filename.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn rejected(url: &str) -> ApiError {
        ApiError::Status {
            url: url.to_string(),
            status: 500,
            body: "boom".to_string(),
        }
    }
}

impl ResultsService for RecordingService {
    fn create_run(&self, request: &CreateRunRequest<'_>) -> Result<RunRecord, ApiError> {
        self.calls.borrow_mut().push(Call::CreateRun {
            ro_id: request.ro_id.to_string(),
        });
        Ok(RunRecord {
            id: self.created_id.clone().unwrap_or_else(|| "1".to_string()),
        })
    }

    fn patch_run(
        &self,
        run_id: &str,
        status: &RunStatus,
        data: Option<&RunMetadata>,
    ) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(Call::PatchRun {
            run_id: run_id.to_string(),
            status: status.to_string(),
            with_data: data.is_some(),
        });
        if self.fail_patches {
            return Err(Self::rejected("/v1/runs"));
        }
        Ok(())
    }

    fn post_results_metadata(&self, run_id: &str, files: &[FileRecord]) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(Call::PostMetadata {
            run_id: run_id.to_string(),
            filenames: files.iter().map(|f| f.filename.clone()).collect(),
        });
        if self.fail_metadata {
            return Err(Self::rejected("/v1/results"));
        }
        Ok(())
    }

    fn upload_result_file(&self, run_id: &str, file: &FileRecord) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(Call::Upload {
            run_id: run_id.to_string(),
            filename: file.filename.clone(),
        });
        if self.fail_uploads.contains(&file.filename) {
            return Err(Self::rejected("/v1/results/data"));
        }
        Ok(())
    }
}

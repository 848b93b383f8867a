use crate::client::{ApiError, CreateRunRequest, ResultsService};
use crate::model::{RunMetadata, RunStatus};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartRun {
    // The service assigns the id.
    Create {
        ro_id: String,
        user_id: Option<String>,
    },
    Update { run_id: String },
}

impl StartRun {
    pub fn from_inputs(run_id: Option<String>, ro_id: String, user_id: Option<String>) -> Self {
        match run_id {
            Some(run_id) => StartRun::Update { run_id },
            None => StartRun::Create { ro_id, user_id },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedRun {
    pub run_id: String,
    pub created: bool,
}

/// Marks the run RUNNING, creating it first when needed, and returns the id
/// downstream steps should use.
pub fn start_run(
    service: &dyn ResultsService,
    start: &StartRun,
    metadata: &RunMetadata,
) -> Result<StartedRun, ApiError> {
    match start {
        StartRun::Update { run_id } => {
            service.patch_run(run_id, &RunStatus::Running, Some(metadata))?;
            info!(run_id = %run_id, "marked existing run as RUNNING");
            Ok(StartedRun {
                run_id: run_id.clone(),
                created: false,
            })
        }
        StartRun::Create { ro_id, user_id } => {
            let request = CreateRunRequest {
                ro_id,
                user_id: user_id.as_deref(),
                status: RunStatus::Running,
                data: metadata,
            };
            let record = service.create_run(&request)?;
            info!(run_id = %record.id, ro_id = %ro_id, "created run");
            Ok(StartedRun {
                run_id: record.id,
                created: true,
            })
        }
    }
}

pub fn set_run_status(
    service: &dyn ResultsService,
    run_id: &str,
    status: &RunStatus,
) -> Result<(), ApiError> {
    service.patch_run(run_id, status, None)?;
    info!(run_id, status = %status, "set run status");
    Ok(())
}

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use replicator_runner::actions::{self, CiContext};
use replicator_runner::{
    Credentials, ResultsLayout, RunStatus, ScholarClient, StartRun, UploadError, UploadReport,
    DEFAULT_API_URL,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "replicator",
    version = "0.3.0",
    about = "Report reproduction runs and results to the Scholar research replicator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ApiArgs {
    #[arg(long = "access-key", env = "INPUT_SCHOLAR_ACCESS_KEY", hide_env_values = true)]
    access_key: String,
    #[arg(long = "access-secret", env = "INPUT_SCHOLAR_ACCESS_SECRET", hide_env_values = true)]
    access_secret: String,
    #[arg(long = "api-url", env = "SCHOLAR_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
}

impl ApiArgs {
    fn client(&self) -> ScholarClient {
        ScholarClient::new(
            self.api_url.clone(),
            Credentials {
                access_key: self.access_key.clone(),
                access_secret: self.access_secret.clone(),
            },
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a run, or mark an existing one RUNNING, and publish its id.
    StartRun {
        #[arg(long, env = "INPUT_RUN_ID")]
        run_id: Option<String>,
        #[arg(long, env = "INPUT_RO_ID")]
        ro_id: Option<String>,
        #[arg(long, env = "INPUT_USER_ID")]
        user_id: Option<String>,
        #[arg(long)]
        commit: Option<String>,
        #[arg(long)]
        repo_url: Option<String>,
        #[arg(long)]
        workflow: Option<String>,
        #[arg(long)]
        ci_run_id: Option<String>,
        #[command(flatten)]
        api: ApiArgs,
        #[arg(long)]
        json: bool,
    },
    /// Overwrite the status of a run.
    SetRunStatus {
        #[arg(long, env = "INPUT_RUN_ID")]
        run_id: String,
        #[arg(long, env = "INPUT_STATUS")]
        status: String,
        #[command(flatten)]
        api: ApiArgs,
        #[arg(long)]
        json: bool,
    },
    /// Upload result files for a run and mark it COMPLETED.
    UploadResults {
        #[arg(long, env = "INPUT_RUN_ID")]
        run_id: String,
        #[arg(long, env = "INPUT_ARTIFACTS_PATH")]
        artifacts_path: Option<PathBuf>,
        #[arg(long, env = "INPUT_RAW_RESULTS_PATH", hide = true)]
        raw_results_path: Option<PathBuf>,
        #[arg(long, env = "INPUT_RESULTS_PATH")]
        results_path: Option<PathBuf>,
        #[arg(long, env = "INPUT_SUMMARY_RESULTS_PATH", hide = true)]
        summary_results_path: Option<PathBuf>,
        #[arg(long, env = "INPUT_FIGURES_PATH")]
        figures_path: Option<PathBuf>,
        #[command(flatten)]
        api: ApiArgs,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_mode = command_json_mode(&cli.command);
    match run_command(cli.command) {
        Ok(Some(payload)) => {
            emit_json(&payload);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            error!("{:#}", err);
            if json_mode {
                emit_json(&json_error("command_failed", err.to_string(), json!({})));
            }
            println!("{}", actions::error_annotation(&err.to_string()));
            std::process::exit(1);
        }
    }
}

fn run_command(command: Commands) -> Result<Option<Value>> {
    match command {
        Commands::StartRun {
            run_id,
            ro_id,
            user_id,
            commit,
            repo_url,
            workflow,
            ci_run_id,
            api,
            json,
        } => {
            let ctx = CiContext::from_env();
            let mut metadata = ctx.run_metadata();
            if let Some(commit) = actions::non_empty(commit) {
                metadata.repo_commit_hash = Some(commit);
            }
            if let Some(url) = actions::non_empty(repo_url) {
                metadata.repo_url = Some(url);
            }
            if let Some(workflow) = actions::non_empty(workflow) {
                metadata.github_workflow_id = Some(workflow);
            }
            if let Some(id) = actions::non_empty(ci_run_id) {
                metadata.github_run_id = Some(id);
            }

            let run_id = actions::non_empty(run_id);
            let ro_id = actions::non_empty(ro_id);
            if run_id.is_none() && ro_id.is_none() {
                return Err(anyhow!("ro_id is required when no run_id is given"));
            }
            let start = StartRun::from_inputs(
                run_id,
                ro_id.unwrap_or_default(),
                actions::non_empty(user_id),
            );

            let started = replicator_runner::start_run(&api.client(), &start, &metadata)?;
            actions::set_output("run_id", &started.run_id)?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "start-run",
                    "run_id": started.run_id,
                    "created": started.created,
                })));
            }
        }
        Commands::SetRunStatus {
            run_id,
            status,
            api,
            json,
        } => {
            let run_id = required(run_id, "run_id")?;
            let status: RunStatus = required(status, "status")?.parse()?;
            replicator_runner::set_run_status(&api.client(), &run_id, &status)?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "set-run-status",
                    "run_id": run_id,
                    "status": status,
                })));
            }
        }
        Commands::UploadResults {
            run_id,
            artifacts_path,
            raw_results_path,
            results_path,
            summary_results_path,
            figures_path,
            api,
            json,
        } => {
            let run_id = required(run_id, "run_id")?;
            let layout = ResultsLayout {
                raw_data: path_input(artifacts_path).or_else(|| path_input(raw_results_path)),
                summary_data: path_input(results_path).or_else(|| path_input(summary_results_path)),
                figures: path_input(figures_path),
            };
            let report = match replicator_runner::upload_results(&api.client(), &run_id, &layout) {
                Ok(report) => report,
                Err(UploadError::InvalidFigureSpecs { errors }) => {
                    for err in &errors {
                        println!("{}", actions::error_annotation(&err.to_string()));
                    }
                    return Err(anyhow!("Job failed due to invalid figure spec files"));
                }
                Err(err) => return Err(err.into()),
            };
            log_report(&report);
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "upload-results",
                    "report": report,
                })));
            }
        }
    }
    Ok(None)
}

fn required(value: String, name: &str) -> Result<String> {
    actions::non_empty(Some(value)).ok_or_else(|| anyhow!("input required and not supplied: {}", name))
}

fn path_input(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|p| !p.as_os_str().is_empty())
}

fn log_report(report: &UploadReport) {
    info!(
        run_id = %report.run_id,
        files = report.manifest_len,
        uploaded = report.uploaded(),
        skipped_figure_specs = report.skipped_figure_specs.len(),
        "upload summary"
    );
    for (file_type, count) in &report.discovered {
        info!(file_type = %file_type, count, "discovered");
    }
    for failure in report.failures() {
        if let replicator_runner::UploadStatus::Failed { reason } = &failure.status {
            error!(filename = %failure.filename, reason = %reason, "upload failed");
        }
    }
}

fn emit_json(value: &Value) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!(
            "{{\"ok\":false,\"error\":{{\"code\":\"serialization_error\",\"message\":\"failed to serialize JSON payload\",\"details\":{{}}}}}}"
        ),
    }
}

fn json_error(code: &str, message: String, details: Value) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}

fn command_json_mode(command: &Commands) -> bool {
    match command {
        Commands::StartRun { json, .. }
        | Commands::SetRunStatus { json, .. }
        | Commands::UploadResults { json, .. } => *json,
    }
}

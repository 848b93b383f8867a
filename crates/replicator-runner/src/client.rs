use crate::model::{FileRecord, RunMetadata, RunRecord, RunStatus};
use reqwest::blocking::multipart::Form;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_API_URL: &str = "https://research-replicator.usescholar.org";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("could not open {path} for upload: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub access_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest<'a> {
    pub ro_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
    pub status: RunStatus,
    pub data: &'a RunMetadata,
}

#[derive(Debug, Clone, Serialize)]
struct PatchRunRequest<'a> {
    status: &'a RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a RunMetadata>,
}

#[derive(Debug, Serialize)]
struct ResultsMetadataRequest<'a> {
    run_id: &'a str,
    data: ResultsMetadataData<'a>,
}

#[derive(Debug, Serialize)]
struct ResultsMetadataData<'a> {
    files: &'a [FileRecord],
}

/// The remote results service, one method per endpoint.
pub trait ResultsService {
    fn create_run(&self, request: &CreateRunRequest<'_>) -> Result<RunRecord, ApiError>;
    fn patch_run(
        &self,
        run_id: &str,
        status: &RunStatus,
        data: Option<&RunMetadata>,
    ) -> Result<(), ApiError>;
    fn post_results_metadata(&self, run_id: &str, files: &[FileRecord]) -> Result<(), ApiError>;
    fn upload_result_file(&self, run_id: &str, file: &FileRecord) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct ScholarClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl ScholarClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self::with_client(Client::new(), base_url, credentials)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, credentials: Credentials) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .basic_auth(
                &self.credentials.access_key,
                Some(&self.credentials.access_secret),
            )
            .send()
            .map_err(|source| {
                error!(url, error = %source, "request failed without a response");
                ApiError::Transport {
                    url: url.to_string(),
                    source,
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            error!(url, status = status.as_u16(), body = %body, "request rejected");
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        debug!(url, status = status.as_u16(), "request ok");
        Ok(response)
    }
}

impl ResultsService for ScholarClient {
    fn create_run(&self, request: &CreateRunRequest<'_>) -> Result<RunRecord, ApiError> {
        let url = self.url("/v1/runs");
        let response = self.send(&url, self.client.post(&url).json(request))?;
        response
            .json::<RunRecord>()
            .map_err(|source| ApiError::Decode { url, source })
    }

    fn patch_run(
        &self,
        run_id: &str,
        status: &RunStatus,
        data: Option<&RunMetadata>,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/v1/runs/{}", run_id));
        let body = PatchRunRequest { status, data };
        self.send(&url, self.client.patch(&url).json(&body))?;
        Ok(())
    }

    fn post_results_metadata(&self, run_id: &str, files: &[FileRecord]) -> Result<(), ApiError> {
        let url = self.url("/v1/results");
        let body = ResultsMetadataRequest {
            run_id,
            data: ResultsMetadataData { files },
        };
        self.send(&url, self.client.post(&url).json(&body))?;
        Ok(())
    }

    fn upload_result_file(&self, run_id: &str, file: &FileRecord) -> Result<(), ApiError> {
        let url = self.url("/v1/results/data");
        let form = Form::new()
            .text("run_id", run_id.to_string())
            .text("filename", file.filename.clone())
            .file("file", &file.filepath)
            .map_err(|source| ApiError::File {
                path: file.filepath.clone(),
                source,
            })?;
        self.send(&url, self.client.put(&url).multipart(form))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = ScholarClient::new(
            "http://localhost:9000/",
            Credentials {
                access_key: "k".to_string(),
                access_secret: "s".to_string(),
            },
        );
        assert_eq!(client.base_url, "http://localhost:9000");
        assert_eq!(client.url("/v1/runs"), "http://localhost:9000/v1/runs");
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials {
            access_key: "key".to_string(),
            access_secret: "hunter2".to_string(),
        };
        let shown = format!("{:?}", creds);
        assert!(shown.contains("key"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn patch_body_omits_data_for_status_only_updates() {
        let status = RunStatus::Completed;
        let body = PatchRunRequest {
            status: &status,
            data: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"status": "COMPLETED"})
        );
    }

    #[test]
    fn create_body_matches_runs_endpoint_shape() {
        let data = RunMetadata {
            repo_commit_hash: Some("abc123".to_string()),
            repo_url: Some("https://github.com/o/r".to_string()),
            github_workflow_id: Some("reproduce".to_string()),
            github_run_id: Some("99".to_string()),
        };
        let request = CreateRunRequest {
            ro_id: "ro_1",
            user_id: None,
            status: RunStatus::Running,
            data: &data,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "ro_id": "ro_1",
                "status": "RUNNING",
                "data": {
                    "repo_commit_hash": "abc123",
                    "repo_url": "https://github.com/o/r",
                    "github_workflow_id": "reproduce",
                    "github_run_id": "99"
                }
            })
        );
    }
}

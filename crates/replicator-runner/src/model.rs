use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    RawData,
    SummaryData,
    FigureSpec,
    FigureImage,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::RawData => "RAW_DATA",
            FileType::SummaryData => "SUMMARY_DATA",
            FileType::FigureSpec => "FIGURE_SPEC",
            FileType::FigureImage => "FIGURE_IMAGE",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FileType::RawData => "raw data",
            FileType::SummaryData => "summary data",
            FileType::FigureSpec => "figure spec",
            FileType::FigureImage => "figure image",
        }
    }

    pub fn default_extensions(self) -> &'static [&'static str] {
        match self {
            FileType::RawData => &["csv"],
            FileType::SummaryData => &["csv", "md"],
            FileType::FigureSpec => &["json"],
            FileType::FigureImage => &["png", "jpg", "jpeg", "svg"],
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Bytes are uploaded separately, keyed by run id and filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    pub filename: String,
    pub filepath: PathBuf,
    pub size_bytes: u64,
    pub checksum_sha256: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Other(s) => s.as_str(),
        }
    }
}

impl FromStr for RunStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "RUNNING" => RunStatus::Running,
            "COMPLETED" => RunStatus::Completed,
            other => RunStatus::Other(other.to_string()),
        })
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RunStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_commit_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_run_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunRecord {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "run id must be a string or number, got {}",
            other
        ))),
    }
}

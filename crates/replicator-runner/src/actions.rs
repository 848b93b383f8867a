//! Glue for running inside a GitHub Actions job.

use crate::model::RunMetadata;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

pub const OUTPUT_FILE_ENV: &str = "GITHUB_OUTPUT";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
    pub sha: Option<String>,
    pub run_id: Option<String>,
    pub workflow: Option<String>,
    pub repository_url: Option<String>,
}

impl CiContext {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| non_empty(lookup(key));
        let server = get("GITHUB_SERVER_URL").unwrap_or_else(|| "https://github.com".to_string());
        let repository_url = get("GITHUB_REPOSITORY")
            .map(|repo| format!("{}/{}", server.trim_end_matches('/'), repo));
        Self {
            sha: get("GITHUB_SHA"),
            run_id: get("GITHUB_RUN_ID"),
            workflow: get("GITHUB_WORKFLOW"),
            repository_url,
        }
    }

    pub fn run_metadata(&self) -> RunMetadata {
        RunMetadata {
            repo_commit_hash: self.sha.clone(),
            repo_url: self.repository_url.clone(),
            github_workflow_id: self.workflow.clone(),
            github_run_id: self.run_id.clone(),
        }
    }
}

// Unset optional inputs arrive as empty strings.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub fn write_output(output_file: &Path, name: &str, value: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_file)?;
    if value.contains('\n') {
        let delimiter = format!("ghadelimiter_{}", std::process::id());
        writeln!(file, "{name}<<{delimiter}\n{value}\n{delimiter}")
    } else {
        writeln!(file, "{name}={value}")
    }
}

/// Publishes a step output, falling back to stdout outside a runner.
pub fn set_output(name: &str, value: &str) -> io::Result<()> {
    match non_empty(std::env::var(OUTPUT_FILE_ENV).ok()) {
        Some(path) => write_output(Path::new(&path), name, value),
        None => {
            println!("{name}: {value}");
            Ok(())
        }
    }
}

pub fn error_annotation(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{escaped}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    #[test]
    fn context_builds_repository_url_and_ignores_blank_values() {
        let env: HashMap<&str, &str> = [
            ("GITHUB_SHA", "abc123"),
            ("GITHUB_RUN_ID", "987"),
            ("GITHUB_WORKFLOW", " "),
            ("GITHUB_SERVER_URL", "https://github.example.com/"),
            ("GITHUB_REPOSITORY", "lab/paper"),
        ]
        .into_iter()
        .collect();
        let ctx = CiContext::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(ctx.sha.as_deref(), Some("abc123"));
        assert_eq!(ctx.run_id.as_deref(), Some("987"));
        assert_eq!(ctx.workflow, None);
        assert_eq!(
            ctx.repository_url.as_deref(),
            Some("https://github.example.com/lab/paper")
        );

        let meta = ctx.run_metadata();
        assert_eq!(meta.repo_commit_hash.as_deref(), Some("abc123"));
        assert_eq!(meta.github_run_id.as_deref(), Some("987"));
    }

    #[test]
    fn repository_url_defaults_to_github_dot_com() {
        let ctx = CiContext::from_lookup(|k| (k == "GITHUB_REPOSITORY").then(|| "o/r".to_string()));
        assert_eq!(ctx.repository_url.as_deref(), Some("https://github.com/o/r"));
    }

    #[test]
    fn outputs_are_appended() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("output");
        fs::write(&path, "existing=1\n").expect("seed");
        write_output(&path, "run_id", "42").expect("write");
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing=1\nrun_id=42\n");
    }

    #[test]
    fn multiline_output_uses_heredoc() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("output");
        write_output(&path, "report", "a\nb").expect("write");
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("report<<ghadelimiter_"), "{text}");
        assert!(text.contains("\na\nb\n"), "{text}");
    }

    #[test]
    fn error_annotation_escapes_newlines() {
        assert_eq!(error_annotation("bad\nthing 100%"), "::error::bad%0Athing 100%25");
    }

    #[test]
    fn blank_inputs_are_absent() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" r1 ".into())), Some("r1".into()));
        assert_eq!(non_empty(None), None);
    }
}

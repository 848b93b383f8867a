use crate::checksum::sha256_file;
use crate::model::{FileRecord, FileType};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a directory", .path.display())]
    NotADirectory { path: PathBuf },
    #[error("failed to list {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

// Repeat scans of the same directory for the same category report each path
// once; different categories may share a file.
#[derive(Debug, Default)]
pub struct Discovery {
    seen: BTreeSet<(FileType, PathBuf)>,
    counts: BTreeMap<FileType, usize>,
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> &BTreeMap<FileType, usize> {
        &self.counts
    }

    pub fn scan(
        &mut self,
        dir: &Path,
        file_type: FileType,
        allowed_extensions: &[&str],
    ) -> Result<Vec<FileRecord>, DiscoveryError> {
        match fs::metadata(dir) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!(path = %dir.display(), "directory does not exist");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(DiscoveryError::Io {
                    path: dir.to_path_buf(),
                    source,
                })
            }
            Ok(meta) if !meta.is_dir() => {
                error!(path = %dir.display(), "path is not a directory");
                return Err(DiscoveryError::NotADirectory {
                    path: dir.to_path_buf(),
                });
            }
            Ok(_) => {}
        }
        info!(path = %dir.display(), "reading {} files", file_type.display_name());

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        let mut records = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|source| DiscoveryError::Walk {
                path: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() || !has_allowed_extension(entry.path(), allowed_extensions)
            {
                continue;
            }
            let key = (file_type, entry.path().to_path_buf());
            if self.seen.contains(&key) {
                continue;
            }
            records.push(describe_file(entry.path(), file_type)?);
            self.seen.insert(key);
        }

        *self.counts.entry(file_type).or_insert(0) += records.len();
        info!(count = records.len(), "found {} files", file_type.display_name());
        Ok(records)
    }

    pub fn scan_default(
        &mut self,
        dir: &Path,
        file_type: FileType,
    ) -> Result<Vec<FileRecord>, DiscoveryError> {
        self.scan(dir, file_type, file_type.default_extensions())
    }
}

fn has_allowed_extension(path: &Path, allowed_extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed_extensions.contains(&ext))
        .unwrap_or(false)
}

pub fn describe_file(path: &Path, file_type: FileType) -> Result<FileRecord, DiscoveryError> {
    let io_err = |source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size_bytes = fs::metadata(path).map_err(io_err)?.len();
    let checksum_sha256 = sha256_file(path).map_err(io_err)?;
    let file_id = match file_type {
        FileType::FigureSpec => embedded_id(path),
        _ => None,
    };
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(FileRecord {
        file_id,
        filename,
        filepath: path.to_path_buf(),
        size_bytes,
        checksum_sha256,
        file_type,
    })
}

// Best effort; the validator re-reads the spec and reports problems properly.
fn embedded_id(path: &Path) -> Option<String> {
    let parsed = fs::read(path)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
    let Some(value) = parsed else {
        warn!(path = %path.display(), "invalid JSON for figure spec file");
        return None;
    };
    match value.get("id")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

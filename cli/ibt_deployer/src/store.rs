//! Deployment record storage: one pretty-printed JSON file per deployment.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::errors::{DeployerError, Result};
use crate::types::DeploymentResult;

#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `result` to `<dir>/<SYMBOL>_<unix-millis>.json`, creating the
    /// directory if needed. Never overwrites an existing record.
    ///
    /// The document is staged in a temporary file in the same directory and
    /// renamed into place, so a failed write never leaves a partial record.
    pub fn persist(&self, result: &DeploymentResult) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            DeployerError::Persistence(format!("Cannot create {}: {e}", self.dir.display()))
        })?;

        let body = serde_json::to_string_pretty(result)?;
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(|e| {
            DeployerError::Persistence(format!("Cannot stage record in {}: {e}", self.dir.display()))
        })?;
        staged
            .write_all(body.as_bytes())
            .and_then(|_| staged.write_all(b"\n"))
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| {
                DeployerError::Persistence(format!(
                    "Cannot write record in {}: {e}",
                    self.dir.display()
                ))
            })?;

        let mut millis = Utc::now().timestamp_millis();
        loop {
            let path = self.dir.join(record_file_name(&result.config.token_symbol, millis));
            match staged.persist_noclobber(&path) {
                Ok(_) => {
                    info!("Deployment info saved to {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} already exists, bumping timestamp", path.display());
                    staged = e.file;
                    millis += 1;
                }
                Err(e) => {
                    return Err(DeployerError::Persistence(format!(
                        "Cannot create {}: {}",
                        path.display(),
                        e.error
                    )))
                }
            }
        }
    }

    /// Read a single record back.
    pub fn load(path: &Path) -> Result<DeploymentResult> {
        let body = fs::read_to_string(path).map_err(|e| {
            DeployerError::Persistence(format!("Cannot read {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&body)?)
    }

    /// All stored records ordered by file name. A missing directory is empty;
    /// files that do not decode are skipped with a warning.
    pub fn list(&self) -> Result<Vec<(PathBuf, DeploymentResult)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DeployerError::Persistence(format!(
                    "Cannot list {}: {e}",
                    self.dir.display()
                )))
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::load(&path) {
                Ok(record) => records.push((path, record)),
                Err(e) => warn!("Skipping unreadable record {}: {e}", path.display()),
            }
        }
        Ok(records)
    }
}

fn record_file_name(symbol: &str, millis: i64) -> String {
    format!("{symbol}_{millis}.json")
}

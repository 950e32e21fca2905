//! Append-only audit log of engine runs
//!
//! One JSON object per line, one line per install, cleanup, or rollback
//! invocation. Writing a record never fails the run it describes.

use crate::context::RunOptions;
use crate::error::Result;
use crate::model::Configuration;
use crate::result::{CleanupOutcome, Operation, ProvisionOutcome, ProvisioningResult, RunSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Default file name inside the state directory.
pub const AUDIT_FILE_NAME: &str = "audit.jsonl";

/// One engine invocation and everything it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub config: String,
    pub workspace: String,
    pub operation: Operation,
    #[serde(default)]
    pub dry_run: bool,
    /// Error that ended the run, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub results: Vec<ProvisioningResult>,
}

impl AuditEntry {
    /// Record of a provisioning run.
    pub fn for_install(config: &Configuration, opts: &RunOptions, outcome: &ProvisionOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            config: config.name.clone(),
            workspace: opts.workspace.clone(),
            operation: Operation::Install,
            dry_run: opts.dry_run,
            error: outcome.error.as_ref().map(ToString::to_string),
            results: outcome.results.clone(),
        }
    }

    /// Record of a cleanup or rollback run.
    pub fn for_cleanup(config: &Configuration, opts: &RunOptions, outcome: &CleanupOutcome) -> Self {
        let failed = outcome.summary().failed;
        Self {
            timestamp: Utc::now(),
            config: config.name.clone(),
            workspace: opts.workspace.clone(),
            operation: Operation::Delete,
            dry_run: opts.dry_run,
            error: (failed > 0).then(|| format!("{failed} resource(s) could not be deleted")),
            results: outcome.results.clone(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_results(&self.results)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// JSON Lines audit file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Audit log stored as [`AUDIT_FILE_NAME`] inside `state_dir`.
    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join(AUDIT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record, returning any I/O or encoding error.
    pub fn try_record(&self, entry: &AuditEntry) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;

        log::debug!(
            "Recorded {} of '{}' in {}",
            entry.operation,
            entry.config,
            self.path.display()
        );
        Ok(())
    }

    /// Append a record; failures are logged and otherwise ignored.
    pub fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.try_record(entry) {
            log::warn!("Failed to write audit record to {}: {e}", self.path.display());
        }
    }

    /// Read every record, oldest first.
    ///
    /// Lines that do not parse are skipped with a warning.
    pub fn read_entries(&self) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut entries = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => log::warn!(
                    "Skipping malformed audit record at {}:{}: {e}",
                    self.path.display(),
                    index + 1
                ),
            }
        }
        Ok(entries)
    }
}

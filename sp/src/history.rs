//! Run history
//!
//! One pretty-printed JSON file per run, `workflow_{timestamp}.json`, in the
//! history directory. Files are created once and never rewritten.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{RUN_TIMESTAMP_FORMAT, RunRecord, TaskFailure, Workflow};
use crate::error::PlanError;

/// A run record together with the file it lives in
#[derive(Debug, Clone)]
pub struct StoredRun {
    pub path: PathBuf,
    pub record: RunRecord,
}

/// Append-only store of run records
#[derive(Debug, Clone)]
pub struct HistoryRecorder {
    dir: PathBuf,
}

impl HistoryRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a new record for a finished run
    pub fn record(
        &self,
        workflow: &Workflow,
        output_paths: &[PathBuf],
        failures: &[TaskFailure],
        timestamp: DateTime<Local>,
    ) -> Result<StoredRun, PlanError> {
        debug!(workflow_name = %workflow.workflow_name, outputs = %output_paths.len(), "HistoryRecorder::record: called");
        fs::create_dir_all(&self.dir)?;

        let stamp = timestamp.format(RUN_TIMESTAMP_FORMAT).to_string();
        let record = RunRecord {
            run_id: Uuid::now_v7().to_string(),
            workflow_name: workflow.workflow_name.clone(),
            timestamp: stamp.clone(),
            num_tasks: workflow.len(),
            output_files: output_paths.iter().map(|p| p.display().to_string()).collect(),
            workflow: workflow.clone(),
            failures: failures.to_vec(),
        };
        let body = serde_json::to_string_pretty(&record)?;

        // Two runs within the same second get -1, -2, ... suffixes
        let mut seq = 0u32;
        loop {
            let name = if seq == 0 {
                format!("workflow_{stamp}.json")
            } else {
                format!("workflow_{stamp}-{seq}.json")
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(body.as_bytes())?;
                    file.write_all(b"\n")?;
                    info!(path = %path.display(), "Recorded run history");
                    return Ok(StoredRun { path, record });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => seq += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The last `n` runs, newest first
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn recent(&self, n: usize) -> Result<Vec<StoredRun>, PlanError> {
        debug!(%n, dir = %self.dir.display(), "HistoryRecorder::recent: called");
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<(String, u32, PathBuf)> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter_map(|path| {
                let (stamp, seq) = parse_history_name(&path)?;
                Some((stamp, seq, path))
            })
            .collect();
        entries.sort_by(|a, b| (&b.0, b.1).cmp(&(&a.0, a.1)));

        let mut runs = Vec::new();
        for (_, _, path) in entries {
            if runs.len() >= n {
                break;
            }
            match fs::read_to_string(&path)
                .map_err(PlanError::from)
                .and_then(|text| serde_json::from_str::<RunRecord>(&text).map_err(PlanError::from))
            {
                Ok(record) => runs.push(StoredRun { path, record }),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable history file"),
            }
        }
        Ok(runs)
    }
}

/// Split `workflow_{stamp}[-{seq}].json` into its ordering key
fn parse_history_name(path: &Path) -> Option<(String, u32)> {
    if path.extension()?.to_str()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?.strip_prefix("workflow_")?;
    // The timestamp itself contains dashes; the sequence suffix follows the seconds field
    let stamp_len = "YYYY-mm-dd_HH-MM-SS".len();
    let stamp = stem.get(..stamp_len)?;
    let rest = stem.get(stamp_len..)?;
    let seq = match rest.strip_prefix('-') {
        Some(n) => n.parse().ok()?,
        None if rest.is_empty() => 0,
        None => return None,
    };
    Some((stamp.to_string(), seq))
}

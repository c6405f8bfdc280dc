//! Versioned output files
//!
//! Each saved task output gets `{date}-{task}-rev{N}.{ext}`, with N the
//! lowest revision not yet taken. Existing files are never overwritten.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::OutputFormat;
use crate::error::PlanError;

/// Upper bound on revisions probed for one date and task
const MAX_REVISIONS: u32 = 10_000;

/// Writes task outputs into a directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a given revision
    pub fn file_name(date: NaiveDate, task_name: &str, revision: u32, format: OutputFormat) -> String {
        format!(
            "{}-{}-rev{}.{}",
            date.format("%Y-%m-%d"),
            sanitize(task_name),
            revision,
            format.extension()
        )
    }

    /// Save `content` under the first unused revision and return its path
    pub fn save(
        &self,
        task_name: &str,
        content: &str,
        format: OutputFormat,
        date: NaiveDate,
    ) -> Result<PathBuf, PlanError> {
        debug!(%task_name, %format, %date, "OutputWriter::save: called");
        fs::create_dir_all(&self.dir)?;

        for revision in 0..MAX_REVISIONS {
            let path = self.dir.join(Self::file_name(date, task_name, revision, format));
            // create_new fails if the name is taken, so an existing file is never clobbered
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    write_or_remove(&path, file, content)?;
                    info!(path = %path.display(), "Saved task output");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(%revision, "OutputWriter::save: revision taken");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PlanError::Io(std::io::Error::other(format!(
            "no free revision for {task_name} on {date}"
        ))))
    }
}

/// Write `content` to the freshly created `path`, deleting it if the write fails
fn write_or_remove(path: &Path, mut file: impl Write, content: &str) -> std::io::Result<()> {
    let result = file.write_all(content.as_bytes()).and_then(|()| file.flush());
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "Write failed, removing partial output");
        drop(file);
        if let Err(remove_err) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %remove_err, "Could not remove partial output");
        }
        return Err(e);
    }
    Ok(())
}

/// Keep task names filesystem-safe
fn sanitize(task_name: &str) -> String {
    let cleaned: String = task_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "task".to_string() } else { cleaned }
}

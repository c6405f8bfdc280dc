//! Run record: one per executed workflow, never mutated after writing

use serde::{Deserialize, Serialize};

use super::Workflow;
use crate::error::TaskErrorKind;

/// Timestamp format used in run records and history filenames
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// A task that failed during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub task_id: String,
    pub kind: TaskErrorKind,
    pub cause: String,
}

/// Persisted summary of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(default)]
    pub run_id: String,
    pub workflow_name: String,
    pub timestamp: String,
    pub num_tasks: usize,
    pub output_files: Vec<String>,
    pub workflow: Workflow,
    #[serde(default)]
    pub failures: Vec<TaskFailure>,
}

impl RunRecord {
    pub fn succeeded(&self) -> usize {
        self.num_tasks.saturating_sub(self.failures.len())
    }
}

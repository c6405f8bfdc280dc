//! Workflow and task descriptor types
//!
//! A workflow is either taken verbatim from the template catalog or parsed
//! from a model response; both paths go through [`Workflow::new`] so every
//! workflow in a run has already been validated.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PlanError;

/// Declared output format of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Csv,
}

impl OutputFormat {
    /// File extension used for saved outputs
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Csv => "csv",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" => Ok(Self::Markdown),
            "csv" => Ok(Self::Csv),
            other => Err(PlanError::InvalidWorkflowStructure(format!(
                "invalid output_format '{other}' (must be 'markdown' or 'csv')"
            ))),
        }
    }
}

/// One step of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: String,
    pub name: String,
    pub prompt: String,
    pub output_format: OutputFormat,
}

impl TaskDescriptor {
    pub fn new(
        task_id: impl Into<String>,
        name: impl Into<String>,
        prompt: impl Into<String>,
        output_format: OutputFormat,
    ) -> Result<Self, PlanError> {
        let task = Self {
            task_id: task_id.into(),
            name: name.into(),
            prompt: prompt.into(),
            output_format,
        };
        task.validate()?;
        Ok(task)
    }

    /// Every text field must be non-blank
    pub fn validate(&self) -> Result<(), PlanError> {
        for (field, value) in [("task_id", &self.task_id), ("name", &self.name), ("prompt", &self.prompt)] {
            if value.trim().is_empty() {
                return Err(PlanError::InvalidWorkflowStructure(format!(
                    "task '{}' has an empty {field}",
                    self.task_id
                )));
            }
        }
        Ok(())
    }
}

/// A named, ordered list of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow_name: String,
    pub tasks: Vec<TaskDescriptor>,
}

impl Workflow {
    pub fn new(workflow_name: impl Into<String>, tasks: Vec<TaskDescriptor>) -> Result<Self, PlanError> {
        let workflow = Self {
            workflow_name: workflow_name.into(),
            tasks,
        };
        workflow.validate()?;
        Ok(workflow)
    }

    /// Non-empty name, at least one task, valid and uniquely identified tasks
    pub fn validate(&self) -> Result<(), PlanError> {
        debug!(workflow_name = %self.workflow_name, task_count = %self.tasks.len(), "Workflow::validate: called");
        if self.workflow_name.trim().is_empty() {
            return Err(PlanError::InvalidWorkflowStructure("workflow_name is empty".to_string()));
        }
        if self.tasks.is_empty() {
            return Err(PlanError::InvalidWorkflowStructure(
                "workflow must have at least one task".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            task.validate()?;
            if !seen.insert(task.task_id.as_str()) {
                return Err(PlanError::InvalidWorkflowStructure(format!(
                    "duplicate task_id '{}'",
                    task.task_id
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String, PlanError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the workflow as pretty JSON for reuse elsewhere
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), PlanError> {
        let path = path.as_ref();
        debug!(?path, "Workflow::export: called");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json_pretty()? + "\n")?;
        Ok(())
    }

    /// Read a previously exported workflow and validate it
    pub fn import(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        debug!(?path, "Workflow::import: called");
        let text = std::fs::read_to_string(path)?;
        let workflow: Workflow = serde_json::from_str(&text)?;
        workflow.validate()?;
        Ok(workflow)
    }
}

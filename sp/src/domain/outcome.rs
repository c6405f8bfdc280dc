//! Per-task execution state and results

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::TaskDescriptor;
use crate::error::TaskErrorKind;

/// Lifecycle of one task within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    /// Allowed moves: Pending -> Running -> Succeeded | Failed
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running) | (Self::Running, Self::Succeeded) | (Self::Running, Self::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// What a single task step produced
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Succeeded { content: String, path: PathBuf },
    Failed { kind: TaskErrorKind, cause: String },
}

/// Result of one task, tied to its descriptor
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task: TaskDescriptor,
    pub outcome: TaskOutcome,
}

impl TaskResult {
    pub fn succeeded(task: TaskDescriptor, content: String, path: PathBuf) -> Self {
        Self {
            task,
            outcome: TaskOutcome::Succeeded { content, path },
        }
    }

    pub fn failed(task: TaskDescriptor, kind: TaskErrorKind, cause: impl Into<String>) -> Self {
        Self {
            task,
            outcome: TaskOutcome::Failed {
                kind,
                cause: cause.into(),
            },
        }
    }

    pub fn state(&self) -> TaskState {
        match self.outcome {
            TaskOutcome::Succeeded { .. } => TaskState::Succeeded,
            TaskOutcome::Failed { .. } => TaskState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Succeeded { .. })
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        match &self.outcome {
            TaskOutcome::Succeeded { path, .. } => Some(path),
            TaskOutcome::Failed { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<TaskErrorKind> {
        match &self.outcome {
            TaskOutcome::Failed { kind, .. } => Some(*kind),
            TaskOutcome::Succeeded { .. } => None,
        }
    }
}

/// Output of an earlier succeeded task, fed into later prompts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorOutput {
    pub task_id: String,
    pub content: String,
}

impl PriorOutput {
    pub fn new(task_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            content: content.into(),
        }
    }

    /// Labelled form used inside assembled context
    pub fn render(&self) -> String {
        format!("[Task {}]\n{}", self.task_id, self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutputFormat;

    fn descriptor() -> TaskDescriptor {
        TaskDescriptor::new("3", "risk_assessment", "Assess risks", OutputFormat::Markdown).unwrap()
    }

    #[test]
    fn test_state_transitions() {
        assert!(TaskState::Pending.can_transition_to(TaskState::Running));
        assert!(TaskState::Running.can_transition_to(TaskState::Failed));
        assert!(!TaskState::Pending.can_transition_to(TaskState::Succeeded));
        assert!(!TaskState::Succeeded.can_transition_to(TaskState::Running));
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Running.is_terminal());
    }

    #[test]
    fn test_result_accessors() {
        let ok = TaskResult::succeeded(descriptor(), "body".to_string(), PathBuf::from("out.md"));
        assert!(ok.is_success());
        assert_eq!(ok.state(), TaskState::Succeeded);
        assert_eq!(ok.output_path(), Some(&PathBuf::from("out.md")));
        assert_eq!(ok.error_kind(), None);

        let failed = TaskResult::failed(descriptor(), TaskErrorKind::AiError, "timeout");
        assert_eq!(failed.state(), TaskState::Failed);
        assert_eq!(failed.error_kind(), Some(TaskErrorKind::AiError));
        assert!(failed.output_path().is_none());
    }

    #[test]
    fn test_prior_output_render() {
        assert_eq!(PriorOutput::new("2", "Scope").render(), "[Task 2]\nScope");
    }
}

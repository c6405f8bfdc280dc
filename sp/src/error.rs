//! Error taxonomy for planning runs
//!
//! [`PlanError`] covers failures that abort an operation. [`TaskErrorKind`]
//! classifies per-task failures, which the executor records and moves past.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::LlmError;

/// Errors surfaced by the planning pipeline
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid workflow structure: {0}")]
    InvalidWorkflowStructure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("AI error: {0}")]
    Inference(#[from] LlmError),

    #[error("Context store error: {0}")]
    ContextStore(String),

    #[error("Prompt template error: {0}")]
    Prompt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlanError {
    /// Short corrective suggestion shown next to the error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            PlanError::InvalidConfiguration(_) => "Check the named configuration value and restart.",
            PlanError::Validation(_) => "Fix the input document and resubmit.",
            PlanError::InvalidWorkflowStructure(_) => "Retry generation with a clearer goal, or pick a template.",
            PlanError::NotFound(_) => "Run `sp templates` to list the available templates.",
            PlanError::Inference(_) => "Check the API key and network connection, then retry the workflow.",
            PlanError::ContextStore(_) => "Reindex the document and retry.",
            PlanError::Prompt(_) => "Check the prompt overrides under .specplan/prompts.",
            PlanError::Io(_) => "Check that the output and history directories are writable.",
            PlanError::Json(_) => "Check that the file is valid JSON.",
        }
    }
}

/// Classification of a failed task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskErrorKind {
    /// Inference call failed, including exhausted retries
    #[serde(rename = "AI_ERROR")]
    AiError,
    /// Context store query failed
    #[serde(rename = "VECTOR_ERROR")]
    VectorError,
    /// Model returned empty or malformed content
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
    /// Anything else, e.g. the output file could not be written
    #[serde(rename = "UNKNOWN_ERROR")]
    UnknownError,
}

impl TaskErrorKind {
    /// Classify an error raised while executing a task
    pub fn classify(err: &PlanError) -> Self {
        match err {
            PlanError::Inference(_) => Self::AiError,
            PlanError::ContextStore(_) => Self::VectorError,
            PlanError::Validation(_) => Self::ValidationError,
            _ => Self::UnknownError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiError => "AI_ERROR",
            Self::VectorError => "VECTOR_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Suggested recovery for this class of failure
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::AiError => "Check the API key, wait a moment, then retry the workflow.",
            Self::VectorError => "Reindex the document, then retry the workflow.",
            Self::ValidationError => "Retry the workflow; the model returned unusable output.",
            Self::UnknownError => "Check the logs and retry the workflow.",
        }
    }
}

impl std::fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

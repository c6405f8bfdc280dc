//! SpecPlan - planning artifacts from a project specification
//!
//! SpecPlan takes a free-text project specification, indexes it in a
//! [`contextstore::ContextStore`], chooses a workflow (a builtin template or
//! one generated by the model) and runs each task with retrieved context.
//! Every task output is written as a new versioned file and every run is
//! recorded in the history directory.
//!
//! # Modules
//!
//! - [`domain`] - documents, workflows, task outcomes and run records
//! - [`templates`] - builtin workflow templates and keyword suggestion
//! - [`generator`] - model-generated workflows and their validation
//! - [`executor`] - sequential task execution with failure classification
//! - [`llm`] - provider clients and the retrying inference caller
//! - [`planner`] - the end-to-end pipeline
//! - [`output`] / [`history`] - versioned outputs and run records

pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod executor;
pub mod generator;
pub mod history;
pub mod llm;
pub mod output;
pub mod planner;
pub mod prompts;
pub mod retrieval;
pub mod run;
pub mod templates;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use domain::{Document, OutputFormat, RunRecord, TaskDescriptor, TaskOutcome, TaskResult, Workflow};
pub use error::{PlanError, TaskErrorKind};
pub use history::HistoryRecorder;
pub use llm::{InferenceCaller, LlmClient, LlmError, create_client};
pub use output::OutputWriter;
pub use planner::{PlanRequest, Planner, RunReport, WorkflowSelection};
pub use retrieval::{Retriever, StoreRetriever};
pub use templates::TemplateRegistry;

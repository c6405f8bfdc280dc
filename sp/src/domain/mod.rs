//! Domain types for SpecPlan
//!
//! Documents, workflows, per-task results and run records.

mod document;
mod outcome;
mod run_record;
mod workflow;

pub use document::{Document, MAX_DOCUMENT_CHARS, MIN_DOCUMENT_CHARS, validate_text};
pub use outcome::{PriorOutput, TaskOutcome, TaskResult, TaskState};
pub use run_record::{RUN_TIMESTAMP_FORMAT, RunRecord, TaskFailure};
pub use workflow::{OutputFormat, TaskDescriptor, Workflow};

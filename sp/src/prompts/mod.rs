//! Prompt Template System
//!
//! Template loading chain:
//! 1. `.specplan/prompts/{name}.pmt` (user override)
//! 2. Embedded fallback compiled from `sp/prompts/`
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{EnhanceContext, PromptLoader, TaskContext, WorkflowContext};

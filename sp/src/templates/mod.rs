//! Template registry
//!
//! Five builtin workflows for common project categories, keyword-based
//! template suggestion, and prompt enhancement with live document context.

mod registry;

pub use registry::{FALLBACK_TEMPLATE, Template, TemplateInfo, TemplateRegistry};

use tracing::debug;

use crate::domain::TaskDescriptor;
use crate::error::PlanError;
use crate::prompts::{EnhanceContext, PromptLoader};

/// Combine a template task's base prompt with assembled context
pub fn enhance(prompts: &PromptLoader, task: &TaskDescriptor, context: &str) -> Result<String, PlanError> {
    debug!(task_id = %task.task_id, context_len = context.len(), "enhance: called");
    prompts
        .render(
            "enhance",
            &EnhanceContext {
                prompt: &task.prompt,
                context,
            },
        )
        .map_err(|e| PlanError::Prompt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutputFormat;

    #[test]
    fn test_enhance_appends_context_and_directive() {
        let task = TaskDescriptor::new("1", "scope", "Define the scope.", OutputFormat::Markdown).unwrap();
        let prompt = enhance(&PromptLoader::embedded_only(), &task, "Mobile app for field crews").unwrap();
        assert!(prompt.starts_with("Define the scope.\n\nPROJECT CONTEXT:\nMobile app for field crews"));
        assert!(prompt.contains("Base your analysis and recommendations specifically"));
    }
}

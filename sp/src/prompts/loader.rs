//! Prompt Loader
//!
//! Loads prompt templates from the user override directory or falls back to
//! embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Context for the `enhance` template
#[derive(Debug, Clone, Serialize)]
pub struct EnhanceContext<'a> {
    pub prompt: &'a str,
    pub context: &'a str,
}

/// Context for the `task` template
#[derive(Debug, Clone, Serialize)]
pub struct TaskContext<'a> {
    pub prompt: &'a str,
    pub context: &'a str,
    pub format: &'a str,
}

/// Context for the `workflow` template
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowContext<'a> {
    pub context: &'a str,
    pub goal: Option<&'a str>,
    pub max_tasks: usize,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// User override directory (`.specplan/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader rooted at `workdir`
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        let user_dir = workdir.as_ref().join(".specplan/prompts");
        let exists = user_dir.is_dir();
        debug!(?user_dir, %exists, "PromptLoader::new: called");
        Self {
            hbs: Self::engine(),
            user_dir: exists.then_some(user_dir),
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks `.specplan/prompts/{name}.pmt` first, then the embedded copy.
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// The strict-JSON suffix used by JSON-mode inference calls
    pub fn json_instruction(&self) -> Result<String> {
        self.load_template("json-mode")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_enhance_keeps_text_verbatim() {
        let loader = PromptLoader::embedded_only();
        let out = loader
            .render(
                "enhance",
                &EnhanceContext {
                    prompt: "Analyze the \"core\" requirements",
                    context: "Budget < $5k & 3 months",
                },
            )
            .unwrap();
        assert!(out.starts_with("Analyze the \"core\" requirements"));
        assert!(out.contains("PROJECT CONTEXT:\nBudget < $5k & 3 months"));
        assert!(out.trim_end().ends_with("project context provided above."));
    }

    #[test]
    fn test_render_task_names_format() {
        let loader = PromptLoader::embedded_only();
        let out = loader
            .render(
                "task",
                &TaskContext {
                    prompt: "List milestones",
                    context: "ctx",
                    format: "csv",
                },
            )
            .unwrap();
        assert_eq!(out.trim_end(), "List milestones\n\nctx\n\nProvide detailed output in csv format.");
    }

    #[test]
    fn test_render_workflow_with_and_without_goal() {
        let loader = PromptLoader::embedded_only();
        let plain = loader
            .render(
                "workflow",
                &WorkflowContext {
                    context: "spec text",
                    goal: None,
                    max_tasks: 15,
                },
            )
            .unwrap();
        assert!(!plain.contains("WORKFLOW GOAL"));
        assert!(plain.contains("4 to 15 tasks"));
        assert!(plain.contains("\"workflow_name\""));

        let goal = loader
            .render(
                "workflow",
                &WorkflowContext {
                    context: "spec text",
                    goal: Some("Plan the beta launch"),
                    max_tasks: 7,
                },
            )
            .unwrap();
        assert!(goal.contains("WORKFLOW GOAL:\nPlan the beta launch"));
        assert!(goal.contains("4 to 7 tasks"));
    }

    #[test]
    fn test_user_override_wins() {
        let dir = TempDir::new().unwrap();
        let prompts = dir.path().join(".specplan/prompts");
        std::fs::create_dir_all(&prompts).unwrap();
        std::fs::write(prompts.join("task.pmt"), "OVERRIDE {{prompt}}").unwrap();

        let loader = PromptLoader::new(dir.path());
        let out = loader
            .render(
                "task",
                &TaskContext {
                    prompt: "x",
                    context: "",
                    format: "markdown",
                },
            )
            .unwrap();
        assert_eq!(out, "OVERRIDE x");
        assert!(loader.load_template("enhance").unwrap().contains("PROJECT CONTEXT"));
    }

    #[test]
    fn test_unknown_template() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("nonexistent-template").is_err());
    }
}

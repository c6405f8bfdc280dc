//! Task execution
//!
//! Runs a workflow's tasks strictly in order. Each task gets retrieved
//! chunks plus every earlier successful output as context. A failed task is
//! classified and recorded, and execution moves on to the next one.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::context::assemble;
use crate::domain::{OutputFormat, TaskDescriptor, TaskResult};
use crate::error::{PlanError, TaskErrorKind};
use crate::llm::InferenceCaller;
use crate::output::OutputWriter;
use crate::prompts::{PromptLoader, TaskContext};
use crate::retrieval::{DocumentQueryTool, Retriever};
use crate::run::RunContext;
use crate::templates;

static WRAPPING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```\s*$").expect("valid fence regex"));

/// Executes workflow tasks one after another
pub struct TaskExecutor<'a> {
    caller: &'a InferenceCaller,
    prompts: &'a PromptLoader,
    retriever: &'a dyn Retriever,
    writer: &'a OutputWriter,
}

impl<'a> TaskExecutor<'a> {
    pub fn new(
        caller: &'a InferenceCaller,
        prompts: &'a PromptLoader,
        retriever: &'a dyn Retriever,
        writer: &'a OutputWriter,
    ) -> Self {
        Self {
            caller,
            prompts,
            retriever,
            writer,
        }
    }

    /// Run every task in `run`'s workflow, in order
    pub async fn execute(&self, run: &mut RunContext) {
        let tasks = run.workflow().tasks.clone();
        let total = tasks.len();
        info!(workflow_name = %run.workflow().workflow_name, %total, "Executing workflow");

        for (index, task) in tasks.into_iter().enumerate() {
            run.start_task(index);
            info!(task_id = %task.task_id, name = %task.name, "Task {}/{} started", index + 1, total);

            let result = match self.run_task(run, &task).await {
                Ok((content, path)) => {
                    info!(task_id = %task.task_id, path = %path.display(), "Task succeeded");
                    TaskResult::succeeded(task, content, path)
                }
                Err(e) => {
                    let kind = TaskErrorKind::classify(&e);
                    warn!(task_id = %task.task_id, %kind, error = %e, "Task failed, continuing");
                    TaskResult::failed(task, kind, e.to_string())
                }
            };
            run.finish_task(index, result);
        }

        info!(succeeded = %run.succeeded(), failed = %run.failed(), "Workflow finished");
    }

    /// One task: retrieve, assemble, prompt, validate, save
    async fn run_task(&self, run: &RunContext, task: &TaskDescriptor) -> Result<(String, PathBuf), PlanError> {
        let retrieval = &run.config().retrieval;
        debug!(task_id = %task.task_id, top_k = %retrieval.task_top_k, "run_task: called");

        let ranked = self.retriever.query(&task.prompt, retrieval.task_top_k)?;
        let context = assemble(&ranked, run.prior_outputs(), retrieval.context_budget);
        let prompt = self.build_prompt(run, task, &context)?;

        let tool = DocumentQueryTool::new(self.retriever, retrieval.task_top_k);
        let reply = self.caller.call_with_tools(&prompt, false, &[&tool]).await?;
        let content = validate_output(&reply, task.output_format)?;

        let path = self.writer.save(&task.name, &content, task.output_format, run.date())?;
        Ok((content, path))
    }

    /// Template tasks get the enhance directive; generated tasks get the format directive
    fn build_prompt(&self, run: &RunContext, task: &TaskDescriptor, context: &str) -> Result<String, PlanError> {
        if run.template_id().is_some() {
            return templates::enhance(self.prompts, task, context);
        }
        self.prompts
            .render(
                "task",
                &TaskContext {
                    prompt: &task.prompt,
                    context,
                    format: task.output_format.as_str(),
                },
            )
            .map_err(|e| PlanError::Prompt(e.to_string()))
    }
}

/// Reject empty replies and CSV without any delimited row
///
/// A reply wrapped entirely in one code fence is unwrapped first.
pub fn validate_output(reply: &str, format: OutputFormat) -> Result<String, PlanError> {
    let trimmed = reply.trim();
    let content = WRAPPING_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed);

    if content.is_empty() {
        return Err(PlanError::Validation("model returned empty content".to_string()));
    }
    if format == OutputFormat::Csv && !content.lines().any(|l| l.contains(',')) {
        return Err(PlanError::Validation(
            "csv output has no comma-separated rows".to_string(),
        ));
    }
    Ok(format!("{content}\n"))
}

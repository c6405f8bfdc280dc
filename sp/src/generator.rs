//! Workflow generation
//!
//! Asks the model for a JSON workflow and validates its shape before any
//! task runs. Malformed replies are retried up to `generation.attempts`
//! times; inference failures are not retried here because the caller has
//! already retried them.

use tracing::{debug, info, warn};

use crate::config::{GenerationConfig, RetrievalConfig};
use crate::context::assemble;
use crate::domain::{OutputFormat, TaskDescriptor, Workflow};
use crate::error::PlanError;
use crate::llm::InferenceCaller;
use crate::prompts::{PromptLoader, WorkflowContext};
use crate::retrieval::{DocumentQueryTool, Retriever};

/// Query used to pull broad project context for generation
pub const GENERATION_QUERY: &str = "project specification requirements objectives";

const REQUIRED_TASK_FIELDS: [&str; 4] = ["task_id", "name", "prompt", "output_format"];

/// Produces a workflow from the indexed document
pub struct WorkflowGenerator<'a> {
    caller: &'a InferenceCaller,
    prompts: &'a PromptLoader,
    retriever: &'a dyn Retriever,
    retrieval: &'a RetrievalConfig,
    generation: &'a GenerationConfig,
}

impl<'a> WorkflowGenerator<'a> {
    pub fn new(
        caller: &'a InferenceCaller,
        prompts: &'a PromptLoader,
        retriever: &'a dyn Retriever,
        retrieval: &'a RetrievalConfig,
        generation: &'a GenerationConfig,
    ) -> Self {
        Self {
            caller,
            prompts,
            retriever,
            retrieval,
            generation,
        }
    }

    /// Broad document context for the generation prompt
    pub fn generation_context(&self) -> Result<String, PlanError> {
        let ranked = self.retriever.query(GENERATION_QUERY, self.retrieval.workflow_top_k)?;
        debug!(chunks = %ranked.len(), "generation_context: retrieved");
        Ok(assemble(&ranked, &[], self.retrieval.context_budget))
    }

    /// Generate and validate a workflow from `context`
    pub async fn generate(&self, context: &str, goal: Option<&str>) -> Result<Workflow, PlanError> {
        debug!(context_len = %context.len(), ?goal, "generate: called");
        let prompt = self
            .prompts
            .render(
                "workflow",
                &WorkflowContext {
                    context,
                    goal: goal.filter(|g| !g.trim().is_empty()),
                    max_tasks: self.generation.max_tasks,
                },
            )
            .map_err(|e| PlanError::Prompt(e.to_string()))?;

        let tool = DocumentQueryTool::new(self.retriever, self.retrieval.task_top_k);
        let attempts = self.generation.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let reply = self.caller.call_with_tools(&prompt, true, &[&tool]).await?;
            match parse_workflow(&reply, self.generation.max_tasks) {
                Ok(workflow) => {
                    info!(
                        workflow_name = %workflow.workflow_name,
                        tasks = %workflow.len(),
                        %attempt,
                        "Generated workflow"
                    );
                    return Ok(workflow);
                }
                Err(e) => {
                    warn!(%attempt, %attempts, error = %e, "Generated workflow rejected");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| PlanError::InvalidWorkflowStructure("no generation attempts made".to_string())))
    }
}

/// Parse and validate a model reply as a workflow
///
/// Accepts numeric task ids and mixed-case formats; everything else must
/// match the export shape exactly.
pub fn parse_workflow(text: &str, max_tasks: usize) -> Result<Workflow, PlanError> {
    let invalid = |msg: String| PlanError::InvalidWorkflowStructure(msg);

    let value: serde_json::Value =
        serde_json::from_str(text.trim()).map_err(|e| invalid(format!("reply is not valid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| invalid("reply is not a JSON object".to_string()))?;

    for field in ["workflow_name", "tasks"] {
        if !object.contains_key(field) {
            return Err(invalid(format!("missing required field: {field}")));
        }
    }

    let workflow_name = object["workflow_name"]
        .as_str()
        .ok_or_else(|| invalid("workflow_name must be a string".to_string()))?;
    let tasks = object["tasks"]
        .as_array()
        .ok_or_else(|| invalid("'tasks' must be a list".to_string()))?;

    if tasks.is_empty() {
        return Err(invalid("workflow must have at least one task".to_string()));
    }
    if tasks.len() > max_tasks {
        return Err(invalid(format!("too many tasks ({}, maximum {max_tasks})", tasks.len())));
    }

    let mut descriptors = Vec::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        let n = i + 1;
        let task = task
            .as_object()
            .ok_or_else(|| invalid(format!("task {n} is not an object")))?;

        let mut fields = Vec::with_capacity(REQUIRED_TASK_FIELDS.len());
        for field in REQUIRED_TASK_FIELDS {
            let value = match task.get(field) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Number(num)) if field == "task_id" => num.to_string(),
                Some(_) => return Err(invalid(format!("task {n} field {field} must be a string"))),
                None => return Err(invalid(format!("task {n} missing required field: {field}"))),
            };
            fields.push(value);
        }

        let output_format: OutputFormat = fields[3]
            .parse()
            .map_err(|_| invalid(format!("task {n} has invalid output_format (must be 'markdown' or 'csv')")))?;
        descriptors.push(TaskDescriptor::new(
            fields[0].clone(),
            fields[1].clone(),
            fields[2].clone(),
            output_format,
        )?);
    }

    Workflow::new(workflow_name, descriptors)
}

//! Inference call wrapper
//!
//! Adds retry with exponential backoff, JSON-mode cleanup and the
//! tool-call round trip on top of a single-attempt [`LlmClient`].

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use super::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, LlmError, Message, ToolDefinition,
};
use crate::config::LlmConfig;
use crate::prompts::embedded;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("valid fence regex"));

/// A tool the model may call during an inference round trip
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Definition advertised to the model
    fn definition(&self) -> ToolDefinition;

    /// Run the tool; errors are reported back to the model as tool errors
    async fn invoke(&self, input: &serde_json::Value) -> eyre::Result<String>;
}

/// Exponential backoff policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Delay before the attempt following failed `attempt` (1-based)
    ///
    /// `initial * 2^(attempt-1)` capped at `max_backoff`; a rate limit hint
    /// replaces the computed delay but is still capped.
    pub fn delay_after(&self, attempt: u32, error: &LlmError) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        let computed = self.initial_backoff.saturating_mul(1u32 << exp);
        let delay = error.retry_after().unwrap_or(computed);
        delay.min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

/// Retrying inference wrapper shared by the generator and the executor
pub struct InferenceCaller {
    client: Arc<dyn LlmClient>,
    policy: RetryPolicy,
    max_tokens: u32,
    temperature: Option<f32>,
    max_tool_rounds: u32,
    json_instruction: String,
}

impl InferenceCaller {
    pub fn new(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        debug!(max_retries = %config.max_retries, "InferenceCaller::new: called");
        Self {
            client,
            policy: RetryPolicy::from_config(config),
            max_tokens: config.max_tokens,
            temperature: Some(config.temperature),
            max_tool_rounds: 0,
            json_instruction: embedded::JSON_MODE.to_string(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_json_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.json_instruction = instruction.into();
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Single-prompt call without tools
    pub async fn call(&self, prompt: &str, json_mode: bool) -> Result<String, LlmError> {
        self.call_with_tools(prompt, json_mode, &[]).await
    }

    /// Call with tools offered to the model
    ///
    /// Tool calls are answered and the conversation re-sent until the model
    /// replies without tools or `max_tool_rounds` is reached; the last round
    /// is sent without tools so the model must answer in text.
    pub async fn call_with_tools(
        &self,
        prompt: &str,
        json_mode: bool,
        tools: &[&dyn ToolHandler],
    ) -> Result<String, LlmError> {
        debug!(prompt_len = %prompt.len(), %json_mode, tool_count = %tools.len(), "call_with_tools: called");
        let prompt = if json_mode {
            format!("{}\n\n{}", prompt, self.json_instruction.trim())
        } else {
            prompt.to_string()
        };

        let definitions: Vec<ToolDefinition> = tools.iter().map(|t| t.definition()).collect();
        let mut messages = vec![Message::user(prompt)];
        let mut round = 0;

        loop {
            let offer_tools = !definitions.is_empty() && round < self.max_tool_rounds;
            let request = CompletionRequest {
                system_prompt: String::new(),
                messages: messages.clone(),
                tools: if offer_tools { definitions.clone() } else { vec![] },
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };

            let response = self.complete_with_retry(request).await?;

            if !offer_tools || response.tool_calls.is_empty() {
                let text = response.content.unwrap_or_default();
                return Ok(if json_mode { clean_json_response(&text) } else { text });
            }

            round += 1;
            debug!(%round, call_count = %response.tool_calls.len(), "call_with_tools: answering tool calls");
            messages.push(assistant_turn(&response));
            messages.push(Message::user_blocks(run_tools(&response, tools).await));
        }
    }

    /// Send one request, retrying transient failures with backoff
    async fn complete_with_retry(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(%attempt, %max_attempts, "complete_with_retry: attempt");

            let error = match self.client.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !error.is_retryable() {
                debug!(error = %error, "complete_with_retry: non-retryable error");
                return Err(error);
            }

            if attempt >= max_attempts {
                warn!(%attempt, error = %error, "Inference retries exhausted");
                return Err(LlmError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.policy.delay_after(attempt, &error);
            warn!(
                %attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient inference failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn assistant_turn(response: &CompletionResponse) -> Message {
    let mut blocks = Vec::new();
    if let Some(text) = response.content.as_deref().filter(|t| !t.is_empty()) {
        blocks.push(ContentBlock::text(text));
    }
    for call in &response.tool_calls {
        blocks.push(ContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
        });
    }
    Message::assistant_blocks(blocks)
}

async fn run_tools(response: &CompletionResponse, tools: &[&dyn ToolHandler]) -> Vec<ContentBlock> {
    let mut results = Vec::with_capacity(response.tool_calls.len());
    for call in &response.tool_calls {
        let handler = tools.iter().find(|t| t.definition().name == call.name);
        let block = match handler {
            Some(handler) => match handler.invoke(&call.input).await {
                Ok(output) => {
                    info!(tool = %call.name, "Tool call answered");
                    ContentBlock::tool_result(&call.id, output, false)
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool call failed");
                    ContentBlock::tool_result(&call.id, format!("Error: {e}"), true)
                }
            },
            None => {
                warn!(tool = %call.name, "Model requested unknown tool");
                ContentBlock::tool_result(&call.id, format!("Unknown tool: {}", call.name), true)
            }
        };
        results.push(block);
    }
    results
}

/// Strip markdown code fences and prose around a JSON object
///
/// Returns the text between the first `{` and the last `}`; text without
/// braces comes back trimmed so the caller's parser reports the error.
pub fn clean_json_response(text: &str) -> String {
    let text = text.trim();
    let unfenced = CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => unfenced[start..=end].to_string(),
        _ => unfenced.trim().to_string(),
    }
}

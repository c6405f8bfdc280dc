//! OpenAI-compatible chat completions client
//!
//! Serves both OpenAI and OpenRouter, which speak the same Chat Completions
//! wire format and differ only in base URL and optional attribution headers.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, LlmError, Message, MessageContent, Role,
    StopReason, TokenUsage, ToolCall,
};
use crate::config::LlmConfig;

/// OpenAI-compatible API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
    referer: Option<String>,
    title: Option<String>,
}

impl OpenAIClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(provider = %config.provider, model = %config.model(), "from_config: called");
        let api_key = config.get_api_key()?;

        let timeout = Duration::from_millis(config.timeout_ms);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model().to_string(),
            api_key,
            base_url: config.base_url().to_string(),
            http,
            max_tokens: config.max_tokens,
            timeout,
            referer: config.app_referer.clone(),
            title: config.app_title.clone(),
        })
    }

    /// Build the request body for the Chat Completions API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut messages = Vec::new();
        if !request.system_prompt.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": request.system_prompt,
            }));
        }
        messages.extend(self.convert_messages(&request.messages));

        let max_tokens = request.max_tokens.min(self.max_tokens);

        // o1/o3 and GPT-5 models use max_completion_tokens instead of max_tokens
        let bare_model = self.model.rsplit('/').next().unwrap_or(&self.model);
        let uses_completion_tokens =
            bare_model.starts_with("gpt-5") || bare_model.starts_with("o1") || bare_model.starts_with("o3");

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if uses_completion_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if !request.tools.is_empty() {
            debug!("build_request_body: tools not empty, adding tools");
            body["tools"] = serde_json::json!(request.tools.iter().map(|t| t.to_openai_schema()).collect::<Vec<_>>());
            body["tool_choice"] = serde_json::json!("auto");
        }

        body
    }

    /// Convert internal Message types to OpenAI API format
    ///
    /// OpenAI requires one message per tool result, so a single internal message
    /// with multiple tool results becomes multiple OpenAI messages.
    fn convert_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        debug!(message_count = %messages.len(), "convert_messages: called");
        let mut result = Vec::new();

        for msg in messages {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };

            let blocks = match &msg.content {
                MessageContent::Text(text) => {
                    result.push(serde_json::json!({
                        "role": role,
                        "content": text,
                    }));
                    continue;
                }
                MessageContent::Blocks(blocks) => blocks,
            };

            let mut tool_calls = Vec::new();
            let mut tool_results = Vec::new();
            let mut text_content = String::new();

            for block in blocks {
                match block {
                    ContentBlock::Text { text } => text_content.push_str(text),
                    ContentBlock::ToolUse { id, name, input } => {
                        tool_calls.push(serde_json::json!({
                            "id": id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": input.to_string(),
                            }
                        }));
                    }
                    ContentBlock::ToolResult {
                        tool_use_id, content, ..
                    } => {
                        tool_results.push((tool_use_id.clone(), content.clone()));
                    }
                }
            }

            if !tool_results.is_empty() {
                for (tool_call_id, content) in tool_results {
                    result.push(serde_json::json!({
                        "role": "tool",
                        "tool_call_id": tool_call_id,
                        "content": content,
                    }));
                }
                continue;
            }

            if !tool_calls.is_empty() {
                let mut msg = serde_json::json!({
                    "role": "assistant",
                    "tool_calls": tool_calls,
                });
                if !text_content.is_empty() {
                    msg["content"] = serde_json::json!(text_content);
                }
                result.push(msg);
                continue;
            }

            result.push(serde_json::json!({
                "role": role,
                "content": text_content,
            }));
        }

        result
    }

    /// Parse the OpenAI API response
    fn parse_response(&self, api_response: OpenAIResponse) -> CompletionResponse {
        let choice = api_response.choices.into_iter().next();

        let (content, tool_calls, stop_reason) = match choice {
            Some(c) => {
                let tool_calls = c
                    .message
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(|tc| ToolCall {
                        id: tc.id,
                        name: tc.function.name,
                        input: serde_json::from_str(&tc.function.arguments).unwrap_or(serde_json::json!({})),
                    })
                    .collect();
                (
                    c.message.content,
                    tool_calls,
                    StopReason::from_openai(c.finish_reason.as_deref()),
                )
            }
            None => (None, vec![], StopReason::EndTurn),
        };

        let usage = api_response.usage.unwrap_or_default();
        CompletionResponse {
            content,
            tool_calls,
            stop_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let mut http_request = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");
        if let Some(referer) = &self.referer {
            http_request = http_request.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            http_request = http_request.header("X-Title", title);
        }

        let response = match http_request.json(&body).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                debug!("complete: request timed out");
                return Err(LlmError::Timeout(self.timeout));
            }
            Err(e) => {
                debug!(error = %e, "complete: network error");
                return Err(LlmError::Network(e));
            }
        };

        let status = response.status().as_u16();

        if status == 429 {
            debug!("complete: rate limited (429)");
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if !response.status().is_success() {
            debug!(%status, "complete: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        debug!("complete: success");
        let api_response: OpenAIResponse = response.json().await?;
        Ok(self.parse_response(api_response))
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

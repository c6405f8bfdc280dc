//! LLM client abstraction
//!
//! Provider clients make one HTTP attempt per call; [`InferenceCaller`]
//! layers retries, JSON mode and tool round trips on top.

mod anthropic;
mod caller;
mod client;
mod error;
mod openai;
mod types;

pub use anthropic::AnthropicClient;
pub use caller::{InferenceCaller, RetryPolicy, ToolHandler, clean_json_response};
pub use client::LlmClient;
#[cfg(test)]
pub use client::mock;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{
    CompletionRequest, CompletionResponse, ContentBlock, Message, MessageContent, Role, StopReason, TokenUsage,
    ToolCall, ToolDefinition,
};

use std::sync::Arc;
use tracing::debug;

use crate::config::LlmConfig;

/// Create an LLM client for the configured provider
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, "create_client: called");
    match config.provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicClient::from_config(config)?)),
        "openrouter" | "openai" => Ok(Arc::new(OpenAIClient::from_config(config)?)),
        other => Err(LlmError::InvalidResponse(format!("Unknown LLM provider: {other}"))),
    }
}

//! SpecPlan configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PlanError;
use crate::llm::LlmError;

/// Providers with a client implementation
pub const SUPPORTED_PROVIDERS: &[&str] = &["openrouter", "openai", "anthropic"];

/// Main SpecPlan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Document chunking
    pub chunking: ChunkingConfig,

    /// Context retrieval and prompt budget
    pub retrieval: RetrievalConfig,

    /// Workflow generation
    pub generation: GenerationConfig,

    /// Output, history and index locations
    pub storage: StorageConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<(), PlanError> {
        let invalid = |msg: String| Err(PlanError::InvalidConfiguration(msg));

        if !SUPPORTED_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return invalid(format!(
                "llm.provider '{}' is not supported (expected one of: {})",
                self.llm.provider,
                SUPPORTED_PROVIDERS.join(", ")
            ));
        }
        if self.llm.model().trim().is_empty() {
            return invalid("llm.model must not be empty".to_string());
        }
        if self.llm.api_key_env().trim().is_empty() {
            return invalid("llm.api-key-env must not be empty".to_string());
        }
        if self.llm.base_url().trim().is_empty() {
            return invalid("llm.base-url must not be empty".to_string());
        }
        if self.llm.max_retries == 0 {
            return invalid("llm.max-retries must be at least 1".to_string());
        }
        if self.llm.timeout_ms == 0 {
            return invalid("llm.timeout-ms must be positive".to_string());
        }
        if self.llm.max_tokens == 0 {
            return invalid("llm.max-tokens must be positive".to_string());
        }
        if self.chunking.chunk_size == 0 {
            return invalid("chunking.chunk-size must be positive".to_string());
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return invalid(format!(
                "chunking.chunk-overlap ({}) must be smaller than chunking.chunk-size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            ));
        }
        if self.retrieval.workflow_top_k == 0 || self.retrieval.task_top_k == 0 {
            return invalid("retrieval.workflow-top-k and retrieval.task-top-k must be at least 1".to_string());
        }
        if self.retrieval.context_budget == 0 {
            return invalid("retrieval.context-budget must be positive".to_string());
        }
        if self.generation.attempts == 0 {
            return invalid("generation.attempts must be at least 1".to_string());
        }
        if self.generation.max_tasks == 0 {
            return invalid("generation.max-tasks must be at least 1".to_string());
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::default_locations() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level so logging can start before the full load
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(p) => Some(p.clone()),
            None => Self::default_locations().into_iter().find(|p| p.exists()),
        }?;
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    /// Project-local `.specplan.yml`, then `~/.config/specplan/specplan.yml`
    fn default_locations() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".specplan.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("specplan").join("specplan.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openrouter", "openai" or "anthropic"
    pub provider: String,

    /// Model identifier (provider default if unset)
    pub model: Option<String>,

    /// Environment variable containing the API key (provider default if unset)
    #[serde(rename = "api-key-env")]
    pub api_key_env: Option<String>,

    /// API base URL (provider default if unset)
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Total attempts per inference call, including the first
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further attempt
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for any single retry delay
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Attribution headers some gateways (OpenRouter) display
    #[serde(rename = "app-referer")]
    pub app_referer: Option<String>,

    #[serde(rename = "app-title")]
    pub app_title: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: None,
            api_key_env: None,
            base_url: None,
            max_tokens: 4000,
            temperature: 0.7,
            timeout_ms: 60_000,
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            app_referer: None,
            app_title: Some("SpecPlan".to_string()),
        }
    }
}

/// Endpoint, model and key variable used when the config leaves them unset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDefaults {
    pub base_url: &'static str,
    pub model: &'static str,
    pub api_key_env: &'static str,
}

/// Defaults for a supported provider
pub fn provider_defaults(provider: &str) -> Option<ProviderDefaults> {
    match provider {
        "openrouter" => Some(ProviderDefaults {
            base_url: "https://openrouter.ai/api",
            model: "anthropic/claude-3.5-sonnet",
            api_key_env: "OPENROUTER_API_KEY",
        }),
        "openai" => Some(ProviderDefaults {
            base_url: "https://api.openai.com",
            model: "gpt-4o",
            api_key_env: "OPENAI_API_KEY",
        }),
        "anthropic" => Some(ProviderDefaults {
            base_url: "https://api.anthropic.com",
            model: "claude-sonnet-4-20250514",
            api_key_env: "ANTHROPIC_API_KEY",
        }),
        _ => None,
    }
}

impl LlmConfig {
    fn defaults(&self) -> Option<ProviderDefaults> {
        provider_defaults(&self.provider)
    }

    /// Configured model, else the provider's default
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .or_else(|| self.defaults().map(|d| d.model))
            .unwrap_or_default()
    }

    /// Configured key variable, else the provider's default
    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .or_else(|| self.defaults().map(|d| d.api_key_env))
            .unwrap_or_default()
    }

    /// Configured base URL without a trailing slash, else the provider's default
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .or_else(|| self.defaults().map(|d| d.base_url))
            .unwrap_or_default()
            .trim_end_matches('/')
    }

    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String, LlmError> {
        let api_key_env = self.api_key_env();
        debug!(%api_key_env, "get_api_key: called");
        match std::env::var(api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(LlmError::MissingApiKey(api_key_env.to_string())),
        }
    }
}

/// Document chunking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Characters per chunk
    #[serde(rename = "chunk-size")]
    pub chunk_size: usize,

    /// Characters shared by neighbouring chunks
    #[serde(rename = "chunk-overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: contextstore::DEFAULT_CHUNK_SIZE,
            chunk_overlap: contextstore::DEFAULT_OVERLAP,
        }
    }
}

/// Retrieval and context assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks retrieved when generating a workflow
    #[serde(rename = "workflow-top-k")]
    pub workflow_top_k: usize,

    /// Chunks retrieved for each task
    #[serde(rename = "task-top-k")]
    pub task_top_k: usize,

    /// Maximum characters of assembled context per prompt
    #[serde(rename = "context-budget")]
    pub context_budget: usize,

    /// Document query tool round trips allowed per call (0 disables the tool)
    #[serde(rename = "max-tool-rounds")]
    pub max_tool_rounds: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            workflow_top_k: 10,
            task_top_k: 5,
            context_budget: 20_000,
            max_tool_rounds: 3,
        }
    }
}

/// Workflow generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Generation requests made before giving up on malformed replies
    pub attempts: u32,

    /// Largest task list accepted from the model
    #[serde(rename = "max-tasks")]
    pub max_tasks: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            max_tasks: 15,
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for task output files
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Directory for run records
    #[serde(rename = "history-dir")]
    pub history_dir: PathBuf,

    /// Directory for the context store index
    #[serde(rename = "store-dir")]
    pub store_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            history_dir: PathBuf::from("history"),
            store_dir: PathBuf::from(".contextstore"),
        }
    }
}

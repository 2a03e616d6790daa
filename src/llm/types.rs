//! Provider-agnostic request/response types for the LLM client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One turn of conversation history passed to a provider.
///
/// Per the external interface contract, a provider is expected to either
/// honor this history or echo it back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single `generate` call against the black-box LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
    pub max_tokens: Option<u64>,
    pub temperature: Option<f32>,
}

impl LLMRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            history: Vec::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Optional usage statistics a provider may report alongside its text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<TokenUsage>,
    #[serde(default)]
    pub provider_metadata: HashMap<String, serde_json::Value>,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
            provider_metadata: HashMap::new(),
        }
    }
}

/// Named provider configuration, one entry per `[llm.<name>]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_type: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub max_tokens: Option<u64>,
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub default: bool,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: "echo".to_string(),
            api_key: None,
            base_url: None,
            model: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: None,
            enable: true,
            default: false,
        }
    }
}

/// Errors a provider implementation may surface. Per spec.md §7 these are
/// fatal only at configuration time; mid-round generation failures are
/// recovered by the multi-round controller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("provider-specific error: {0}")]
    ProviderSpecific(String),
}

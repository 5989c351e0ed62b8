//! The seam between suggestion prompts and a text-generation provider.
//!
//! [`LlmBackend`] takes one [`CompletionRequest`] and returns one
//! [`CompletionResponse`]; suggestions are short, so there is no streaming.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Failures reported by a backend.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Provider cannot be reached or the client could not be built
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Missing or rejected API key
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Provider answered with an error status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Network error: {0}")]
    NetworkError(String),

    /// Provider reply did not have the expected shape
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LlmError {
    /// Whether the user has to fix their key in Settings.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// A text-generation provider.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Model identifier sent to the provider.
    fn id(&self) -> &str;

    /// Cheap reachability probe.
    async fn is_available(&self) -> bool;

    /// Run one prompt to completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// One prompt plus sampling settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    /// Sampling temperature, clamped to `0.0..=2.0`
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// A request holding a single user prompt.
    pub fn user(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message {
                role: MessageRole::User,
                content: prompt.into(),
            }],
            ..Default::default()
        }
    }

    pub fn with_system(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max: Option<u32>) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    /// Prompt text of the most recent user message.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Generated text with provider metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    /// Cut off at `max_tokens`
    Length,
    ContentFilter,
}

/// Token accounting as reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

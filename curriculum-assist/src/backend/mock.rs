//! Mock LLM backend for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::*;

/// Scripted failure for [`MockBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Unauthorized,
    RateLimited,
    Network,
}

/// Mock backend for testing.
///
/// Returns a fixed response (or a scripted failure) and records the last
/// request it saw.
pub struct MockBackend {
    model_id: String,
    available: AtomicBool,
    response_content: String,
    failure: Option<MockFailure>,
    call_count: AtomicU32,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            available: AtomicBool::new(true),
            response_content: "Mock response".to_string(),
            failure: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Set the response content.
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.response_content = content.into();
        self
    }

    /// Fail every call with `failure`.
    pub fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Get the number of times complete was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// The most recent request passed to `complete`.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        // Estimate token counts
        let prompt_tokens: u32 = request
            .messages
            .iter()
            .map(|m| m.content.len() as u32 / 4)
            .sum();

        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request);
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(LlmError::Unavailable("Mock backend disabled".to_string()));
        }

        match self.failure {
            Some(MockFailure::Unauthorized) => {
                return Err(LlmError::Unauthorized("Mock key rejected".to_string()))
            }
            Some(MockFailure::RateLimited) => {
                return Err(LlmError::RateLimited { retry_after_ms: None })
            }
            Some(MockFailure::Network) => {
                return Err(LlmError::NetworkError("Mock connection reset".to_string()))
            }
            None => {}
        }

        let completion_tokens = self.response_content.len() as u32 / 4;

        Ok(CompletionResponse {
            content: self.response_content.clone(),
            finish_reason: FinishReason::Stop,
            usage: Usage {
                prompt_tokens,
                completion_tokens,
            },
        })
    }
}

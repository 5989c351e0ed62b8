//! SuggestionService - entry point for generated CLO text.
//!
//! Wraps one [`LlmBackend`] with the prompts for description suggestions,
//! Bloom level classification and evaluation summaries. The service never
//! touches the curriculum store; callers apply accepted suggestions
//! themselves.

use std::sync::Arc;

use tracing::{debug, info, warn};

use curriculum::aggregate::EvaluationRecord;
use curriculum::BloomLevel;

use crate::backend::{LlmBackend, LlmError, OpenAiBackend};
use crate::config::AssistConfig;
use crate::prompt::PromptBuilder;

/// Error types for the suggestion service.
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    /// Backend error, surfaced with the provider's own message
    #[error(transparent)]
    Backend(#[from] LlmError),

    /// Suggested Bloom level is not one of the six levels
    #[error("Suggested Bloom level is not in the taxonomy: \"{0}\"")]
    Validation(String),

    /// Request validation error
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AssistError {
    /// Whether the user needs to fix their API key.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_unauthorized())
    }
}

/// Generates CLO text through an [`LlmBackend`].
pub struct SuggestionService {
    backend: Arc<dyn LlmBackend>,
    config: AssistConfig,
}

impl SuggestionService {
    /// Create a service over an existing backend.
    pub fn new(backend: Arc<dyn LlmBackend>, config: AssistConfig) -> Self {
        Self { backend, config }
    }

    /// Create a service with an OpenAI-compatible backend built from `config`.
    pub fn from_config(config: AssistConfig) -> Result<Self, AssistError> {
        let backend = OpenAiBackend::from_config(&config)?;
        Ok(Self::new(Arc::new(backend), config))
    }

    pub fn config(&self) -> &AssistConfig {
        &self.config
    }

    /// Backend identifier (model name).
    pub fn backend_id(&self) -> &str {
        self.backend.id()
    }

    /// Suggest a CLO description for `level` in the given course.
    pub async fn suggest_description(
        &self,
        level: BloomLevel,
        course_name: &str,
        course_description: &str,
    ) -> Result<String, AssistError> {
        self.ensure_credentials()?;
        let request =
            PromptBuilder::new(&self.config).description(level, course_name, course_description);

        debug!(level = %level, model = %self.backend.id(), "Requesting CLO description");
        let response = self.backend.complete(request).await.map_err(log_failure)?;

        Ok(response.content.trim().to_string())
    }

    /// Classify `description` into a Bloom level.
    ///
    /// Replies outside the six levels are rejected rather than applied.
    pub async fn suggest_bloom_level(&self, description: &str) -> Result<BloomLevel, AssistError> {
        if description.trim().is_empty() {
            return Err(AssistError::InvalidRequest(
                "CLO description is required to suggest a Bloom level".to_string(),
            ));
        }
        self.ensure_credentials()?;
        let request = PromptBuilder::new(&self.config).bloom_level(description);

        debug!(model = %self.backend.id(), "Requesting Bloom level");
        let response = self.backend.complete(request).await.map_err(log_failure)?;

        response.content.parse::<BloomLevel>().map_err(|_| {
            let reply = response.content.trim().to_string();
            warn!(reply = %reply, "Discarding Bloom suggestion outside the taxonomy");
            AssistError::Validation(reply)
        })
    }

    /// Write a short review summary of evaluation results.
    pub async fn summarize(&self, records: &[EvaluationRecord]) -> Result<String, AssistError> {
        if records.is_empty() {
            return Err(AssistError::InvalidRequest(
                "No evaluation data to summarize".to_string(),
            ));
        }
        self.ensure_credentials()?;
        let request = PromptBuilder::new(&self.config).summary(records);

        info!(records = records.len(), model = %self.backend.id(), "Requesting evaluation summary");
        let response = self.backend.complete(request).await.map_err(log_failure)?;

        Ok(response.content)
    }

    fn ensure_credentials(&self) -> Result<(), AssistError> {
        if self.config.has_credentials() {
            Ok(())
        } else {
            Err(LlmError::Unauthorized(
                "No API key configured; add one in Settings".to_string(),
            )
            .into())
        }
    }
}

fn log_failure(error: LlmError) -> LlmError {
    warn!(error = %error, "Suggestion request failed");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockFailure};
    use curriculum::{Achievement, CloId};

    fn keyed() -> AssistConfig {
        AssistConfig::default().with_api_key("sk-test")
    }

    fn service(backend: Arc<MockBackend>, config: AssistConfig) -> SuggestionService {
        SuggestionService::new(backend, config)
    }

    #[tokio::test]
    async fn test_suggest_description_trims() {
        let backend = Arc::new(MockBackend::default().with_response("  Explain core data structures.\n"));
        let svc = service(backend.clone(), keyed());

        let text = svc
            .suggest_description(BloomLevel::Understanding, "CS101", "Intro")
            .await
            .unwrap();
        assert_eq!(text, "Explain core data structures.");
        assert_eq!(backend.last_request().unwrap().temperature, Some(0.7));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_call() {
        let backend = Arc::new(MockBackend::default());
        let svc = service(backend.clone(), AssistConfig::default());

        let err = svc
            .suggest_description(BloomLevel::Applying, "CS101", "Intro")
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bloom_suggestion_is_parsed_leniently() {
        let backend = Arc::new(MockBackend::default().with_response("\"Analyzing.\""));
        let svc = service(backend, keyed());

        let level = svc.suggest_bloom_level("Compare two sorting algorithms").await.unwrap();
        assert_eq!(level, BloomLevel::Analyzing);
    }

    #[tokio::test]
    async fn test_bloom_suggestion_outside_taxonomy_is_rejected() {
        let backend = Arc::new(MockBackend::default().with_response("Synthesizing"));
        let svc = service(backend, keyed());

        let err = svc.suggest_bloom_level("Combine ideas").await.unwrap_err();
        assert!(matches!(err, AssistError::Validation(ref v) if v == "Synthesizing"));
        assert!(err.to_string().contains("\"Synthesizing\""));
    }

    #[tokio::test]
    async fn test_bloom_suggestion_needs_description() {
        let backend = Arc::new(MockBackend::default());
        let svc = service(backend.clone(), keyed());

        let err = svc.suggest_bloom_level("   ").await.unwrap_err();
        assert!(matches!(err, AssistError::InvalidRequest(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_error_surfaces_unmodified() {
        let backend = Arc::new(MockBackend::default().with_failure(MockFailure::RateLimited));
        let svc = service(backend.clone(), keyed());

        let records = vec![EvaluationRecord {
            clo_id: CloId::from("CLO1"),
            description: "Explain X".to_string(),
            achievement: Achievement::clamped(80),
        }];
        let err = svc.summarize(&records).await.unwrap_err();
        assert!(matches!(err, AssistError::Backend(LlmError::RateLimited { .. })));
        // No automatic retry
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_summarize_requires_records() {
        let backend = Arc::new(MockBackend::default());
        let svc = service(backend, keyed());
        assert!(matches!(
            svc.summarize(&[]).await,
            Err(AssistError::InvalidRequest(_))
        ));
    }
}

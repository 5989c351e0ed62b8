//! Configuration for the suggestion service.

use serde::{Deserialize, Serialize};

use curriculum::persistence::{
    read_slot, GEMINI_API_KEY_SLOT, OPENROUTER_API_KEY_SLOT, OPENROUTER_MODEL_SLOT,
};
use curriculum::SlotStorage;

use crate::backend::openai::OPENROUTER_BASE_URL;

/// Gemini's OpenAI compatibility endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Model used when the Gemini key is configured.
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Model used with OpenRouter when none is stored.
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-3.5-turbo";

/// An OpenRouter model offered in the settings dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelOption {
    pub name: &'static str,
    pub id: &'static str,
}

/// Models offered for OpenRouter.
pub const OPENROUTER_MODELS: [ModelOption; 4] = [
    ModelOption { name: "GPT-3.5 Turbo", id: "openai/gpt-3.5-turbo" },
    ModelOption { name: "Llama 3 8B", id: "meta-llama/llama-3-8b-instruct" },
    ModelOption { name: "Mistral 7B", id: "mistralai/mistral-7b-instruct" },
    ModelOption { name: "Gemma 7B", id: "google/gemma-7b-it" },
];

/// Which hosted provider the configuration points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    OpenRouter,
    /// Local or self-hosted endpoint that needs no key
    Local,
}

/// Configuration for [`SuggestionService`](crate::SuggestionService).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub provider: Provider,
    /// Chat completions base URL (without `/chat/completions`)
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Temperature for CLO description suggestions
    pub description_temperature: f32,
    /// Temperature for Bloom level classification
    pub bloom_temperature: f32,
    /// Temperature for evaluation summaries
    pub summary_temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Request timeout (ms)
    pub timeout_ms: u64,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenRouter,
            base_url: OPENROUTER_BASE_URL.to_string(),
            model: DEFAULT_OPENROUTER_MODEL.to_string(),
            api_key: None,
            description_temperature: 0.7,
            bloom_temperature: 0.2,
            summary_temperature: 0.6,
            max_tokens: None,
            timeout_ms: 30_000,
        }
    }
}

impl AssistConfig {
    /// OpenRouter with the given model.
    pub fn openrouter(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Gemini through its OpenAI compatibility endpoint.
    pub fn gemini() -> Self {
        Self {
            provider: Provider::Gemini,
            base_url: GEMINI_BASE_URL.to_string(),
            model: GEMINI_MODEL.to_string(),
            ..Default::default()
        }
    }

    /// A keyless local endpoint such as Ollama.
    pub fn local(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: Provider::Local,
            base_url: base_url.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the API key; blank keys count as unset.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = non_blank(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set max tokens per completion.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set request timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Build from the settings slots the page persists.
    ///
    /// A Gemini key takes precedence; otherwise the OpenRouter key and model
    /// slots are used. With neither key the result is an OpenRouter config
    /// without credentials.
    pub fn from_slots(storage: &impl SlotStorage) -> Self {
        let gemini_key = read_slot::<String>(storage, GEMINI_API_KEY_SLOT).and_then(non_blank);
        if let Some(key) = gemini_key {
            return Self::gemini().with_api_key(key);
        }

        let model = read_slot::<String>(storage, OPENROUTER_MODEL_SLOT)
            .and_then(non_blank)
            .unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string());
        let mut config = Self::openrouter(model);
        config.api_key = read_slot::<String>(storage, OPENROUTER_API_KEY_SLOT).and_then(non_blank);
        config
    }

    /// Whether requests need an API key.
    pub fn requires_api_key(&self) -> bool {
        self.provider != Provider::Local
    }

    /// Whether a usable credential is present (or none is needed).
    pub fn has_credentials(&self) -> bool {
        !self.requires_api_key() || self.api_key.is_some()
    }

    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curriculum::MemoryStorage;

    #[test]
    fn test_defaults() {
        let config = AssistConfig::default();
        assert_eq!(config.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.model, "openai/gpt-3.5-turbo");
        assert_eq!(config.description_temperature, 0.7);
        assert_eq!(config.bloom_temperature, 0.2);
        assert_eq!(config.summary_temperature, 0.6);
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_from_slots_prefers_gemini() {
        let storage = MemoryStorage::from_slots([
            (GEMINI_API_KEY_SLOT, r#""g-key""#),
            (OPENROUTER_API_KEY_SLOT, r#""or-key""#),
        ]);
        let config = AssistConfig::from_slots(&storage);
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.model, GEMINI_MODEL);
        assert_eq!(config.api_key.as_deref(), Some("g-key"));
    }

    #[test]
    fn test_from_slots_openrouter() {
        let storage = MemoryStorage::from_slots([
            (GEMINI_API_KEY_SLOT, r#""  ""#),
            (OPENROUTER_API_KEY_SLOT, r#""or-key""#),
            (OPENROUTER_MODEL_SLOT, r#""google/gemma-7b-it""#),
        ]);
        let config = AssistConfig::from_slots(&storage);
        assert_eq!(config.provider, Provider::OpenRouter);
        assert_eq!(config.model, "google/gemma-7b-it");
        assert_eq!(config.api_key.as_deref(), Some("or-key"));
        assert!(config.has_credentials());
    }

    #[test]
    fn test_from_empty_slots() {
        let config = AssistConfig::from_slots(&MemoryStorage::new());
        assert_eq!(config, AssistConfig::default());
    }

    #[test]
    fn test_local_needs_no_key() {
        let config = AssistConfig::local("http://localhost:11434/v1", "llama3.2");
        assert!(config.has_credentials());
    }

    #[test]
    fn test_yaml_round_trip_with_partial_input() {
        let config = AssistConfig::from_yaml("model: meta-llama/llama-3-8b-instruct\ntimeout_ms: 5000\n").unwrap();
        assert_eq!(config.model, "meta-llama/llama-3-8b-instruct");
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.base_url, OPENROUTER_BASE_URL);

        let yaml = config.to_yaml().unwrap();
        assert!(!yaml.contains("api_key"));
        assert_eq!(AssistConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_model_catalog() {
        let ids: Vec<&str> = OPENROUTER_MODELS.iter().map(|m| m.id).collect();
        assert!(ids.contains(&DEFAULT_OPENROUTER_MODEL));
        assert_eq!(OPENROUTER_MODELS.len(), 4);
    }
}

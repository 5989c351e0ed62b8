//! CLO Studio assist - generated text for CLO authoring
//!
//! Provides:
//! - Trait-based LLM backends (OpenRouter/OpenAI-compatible, mock)
//! - Prompts for CLO descriptions, Bloom level classification and
//!   evaluation summaries
//! - Settings-slot driven configuration
//! - Per-form staleness tracking for outstanding requests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          SuggestionService              │
//! │  (description / bloom / summary)        │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┴───────────┐
//!      ▼                       ▼
//! ┌─────────────┐       ┌─────────────┐
//! │ LlmBackend  │       │ Prompt      │
//! │ (OpenAI/    │       │ Builder     │
//! │  Mock)      │       │             │
//! └─────────────┘       └─────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod inflight;
pub mod prompt;
pub mod service;

// Re-export main types for convenience
pub use backend::{CompletionRequest, CompletionResponse, LlmBackend, LlmError};
pub use config::{AssistConfig, Provider, OPENROUTER_MODELS};
pub use inflight::{InflightGate, Ticket};
pub use prompt::PromptBuilder;
pub use service::{AssistError, SuggestionService};

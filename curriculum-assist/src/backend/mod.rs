//! LLM Backend abstraction layer.
//!
//! Provides a trait-based interface for text-generation providers:
//! - OpenAI-compatible (OpenRouter, OpenAI, Gemini compatibility, Ollama)
//! - Mock backend for testing

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{MockBackend, MockFailure};
pub use openai::OpenAiBackend;
pub use traits::{CompletionRequest, CompletionResponse, LlmBackend, LlmError};

//! Shared LLM service: Ollama and OpenAI-compatible clients for chat
//! (blocking and streaming) and embeddings, grouped into profiles.

pub mod chat;
pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use chat::{ChatMessage, ChatRole, TextStream};
pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::AiLlmError;
pub use service_profiles::{LlmProfile, LlmServiceProfiles};

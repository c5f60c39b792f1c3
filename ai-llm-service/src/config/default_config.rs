//! Default LLM configs loaded from environment variables.
//!
//! Three roles are provided:
//!
//! - **Chat**      → answers questions from retrieved context
//! - **Rewrite**   → turns follow-up questions into standalone ones (optional, falls back to chat)
//! - **Embedding** → embedding generator for chunks and queries
//!
//! # Environment variables
//!
//! Chat:
//! - `LLM_KIND`       = `openai` (default; also `groq`) or `ollama`
//! - `CHAT_MODEL`     = model id (default `llama3-8b-8192`)
//! - `LLM_ENDPOINT`   = base URL (default Groq for `openai`, Ollama URL for `ollama`)
//! - `LLM_API_KEY` / `GROQ_API_KEY` / `OPENAI_API_KEY` = credential (first one set wins)
//! - `LLM_MAX_TOKENS` = optional max tokens (u32)
//! - `LLM_TEMPERATURE` = optional temperature (default 0.7)
//! - `REWRITE_MODEL`  = optional dedicated model for question rewriting
//!
//! Embedding:
//! - `EMBEDDING_KIND`     = `ollama` (default) or `openai`
//! - `EMBEDDING_MODEL`    = model id (default `all-minilm`)
//! - `EMBEDDING_ENDPOINT` = base URL (default Ollama URL / `https://api.openai.com`)
//! - `EMBEDDING_API_KEY` / `OPENAI_API_KEY` = credential for `openai`
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` (default `http://localhost:11434`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_first, env_opt, env_opt_f32, env_opt_u32,
        validate_http_endpoint,
    },
};

/// Default base URL for the OpenAI-compatible chat provider (Groq).
pub const DEFAULT_OPENAI_CHAT_ENDPOINT: &str = "https://api.groq.com/openai";
/// Default base URL for OpenAI embeddings.
pub const DEFAULT_OPENAI_EMBEDDING_ENDPOINT: &str = "https://api.openai.com";
pub const DEFAULT_CHAT_MODEL: &str = "llama3-8b-8192";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Resolves the Ollama endpoint from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
/// 3. `http://localhost:11434`
///
/// # Errors
///
/// - [`ConfigError::InvalidNumber`] if `OLLAMA_PORT` is invalid
/// - [`ConfigError::InvalidFormat`] if `OLLAMA_URL` has no http(s) scheme
pub fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = env_opt("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = env_opt("OLLAMA_PORT") {
        port.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_PORT",
            reason: "expected u16 (1..=65535)",
        })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Ok(DEFAULT_OLLAMA_URL.to_string())
}

fn provider_from_env(var: &'static str, default: LlmProvider) -> Result<LlmProvider, AiLlmError> {
    match env_opt(var) {
        Some(kind) => Ok(kind.parse::<LlmProvider>()?),
        None => Ok(default),
    }
}

/// Constructs the **chat** profile used for answer generation.
///
/// # Defaults
/// - provider `openai` against Groq
/// - `temperature = Some(0.7)`
/// - `timeout_secs = Some(120)`
///
/// The API key is optional here; a missing key is reported by the client.
pub fn config_chat() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env("LLM_KIND", LlmProvider::OpenAI)?;
    let endpoint = match env_opt("LLM_ENDPOINT") {
        Some(url) => {
            validate_http_endpoint("LLM_ENDPOINT", &url)?;
            url
        }
        None => match provider {
            LlmProvider::OpenAI => DEFAULT_OPENAI_CHAT_ENDPOINT.to_string(),
            LlmProvider::Ollama => ollama_endpoint()?,
        },
    };
    let api_key = match provider {
        LlmProvider::OpenAI => env_first(&["LLM_API_KEY", "GROQ_API_KEY", "OPENAI_API_KEY"]),
        LlmProvider::Ollama => env_opt("LLM_API_KEY"),
    };

    let cfg = LlmModelConfig {
        provider,
        model: env_opt("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
        endpoint,
        api_key,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(env_opt_f32("LLM_TEMPERATURE")?.unwrap_or(0.7)),
        top_p: None,
        timeout_secs: Some(120),
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Constructs the optional **rewrite** profile.
///
/// Returns `Ok(None)` unless `REWRITE_MODEL` is set; the rewrite model shares
/// provider, endpoint and key with the chat profile and runs at temperature 0.
pub fn config_rewrite(chat: &LlmModelConfig) -> Result<Option<LlmModelConfig>, AiLlmError> {
    let Some(model) = env_opt("REWRITE_MODEL") else {
        return Ok(None);
    };
    let mut cfg = chat.with_model(model);
    cfg.temperature = Some(0.0);
    cfg.timeout_secs = Some(60);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Constructs the **embedding** profile.
///
/// # Defaults
/// - provider `ollama`, model `all-minilm`
/// - `temperature = Some(0.0)` (deterministic)
/// - `timeout_secs = Some(60)`
pub fn config_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env("EMBEDDING_KIND", LlmProvider::Ollama)?;
    let endpoint = match env_opt("EMBEDDING_ENDPOINT") {
        Some(url) => {
            validate_http_endpoint("EMBEDDING_ENDPOINT", &url)?;
            url
        }
        None => match provider {
            LlmProvider::OpenAI => DEFAULT_OPENAI_EMBEDDING_ENDPOINT.to_string(),
            LlmProvider::Ollama => ollama_endpoint()?,
        },
    };
    let api_key = match provider {
        LlmProvider::OpenAI => env_first(&["EMBEDDING_API_KEY", "OPENAI_API_KEY"]),
        LlmProvider::Ollama => None,
    };

    let cfg = LlmModelConfig {
        provider,
        model: env_opt("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        endpoint,
        api_key,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(60),
    };
    cfg.validate()?;
    Ok(cfg)
}

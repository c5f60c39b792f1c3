//! Shared LLM service with three profiles: `chat`, `rewrite`, and `embedding`.
//!
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (provider+endpoint+model+key+timeout).
//! - If the `rewrite` profile is not provided, it falls back to `chat`.
//! - Client construction errors (e.g. a missing API key) surface on the
//!   first call that needs the client, not at startup.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    chat::{ChatMessage, TextStream},
    config::{
        default_config::{config_chat, config_embedding, config_rewrite},
        llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::AiLlmError,
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Which generation profile a call should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProfile {
    /// Answer generation.
    Chat,
    /// Standalone-question rewriting.
    Rewrite,
}

/// Shared service managing the **chat**, **rewrite** and **embedding** profiles.
pub struct LlmServiceProfiles {
    chat: LlmModelConfig,
    rewrite: LlmModelConfig,
    embedding: LlmModelConfig,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service.
    ///
    /// - `rewrite_opt`: optional rewrite profile; `None` reuses `chat`.
    /// - `health_timeout_secs`: optional timeout for the health checker.
    pub fn new(
        chat: LlmModelConfig,
        rewrite_opt: Option<LlmModelConfig>,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        let rewrite = rewrite_opt.unwrap_or_else(|| chat.clone());

        Ok(Self {
            chat,
            rewrite,
            embedding,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Builds all profiles from environment (see `config::default_config`).
    pub fn from_env() -> Result<Self, AiLlmError> {
        let chat = config_chat()?;
        let rewrite = config_rewrite(&chat)?;
        let embedding = config_embedding()?;

        info!(
            chat.provider = ?chat.provider,
            chat.model = %chat.model,
            chat.has_key = chat.api_key.is_some(),
            rewrite.model = %rewrite.as_ref().map(|r| r.model.as_str()).unwrap_or("<chat>"),
            embedding.provider = ?embedding.provider,
            embedding.model = %embedding.model,
            "LLM profiles loaded"
        );

        Self::new(chat, rewrite, embedding, Some(10))
    }

    /// Non-streaming completion with the given profile.
    pub async fn complete(
        &self,
        profile: LlmProfile,
        messages: &[ChatMessage],
    ) -> Result<String, AiLlmError> {
        let cfg = self.profile_cfg(profile);
        match cfg.provider {
            LlmProvider::Ollama => self.get_or_init_ollama(cfg).await?.chat(messages).await,
            LlmProvider::OpenAI => self.get_or_init_openai(cfg).await?.chat(messages).await,
        }
    }

    /// Streaming completion with the given profile.
    pub async fn stream(
        &self,
        profile: LlmProfile,
        messages: &[ChatMessage],
    ) -> Result<TextStream, AiLlmError> {
        let cfg = self.profile_cfg(profile);
        match cfg.provider {
            LlmProvider::Ollama => {
                self.get_or_init_ollama(cfg)
                    .await?
                    .chat_stream(messages)
                    .await
            }
            LlmProvider::OpenAI => {
                self.get_or_init_openai(cfg)
                    .await?
                    .chat_stream(messages)
                    .await
            }
        }
    }

    /// Computes one embedding using the **embedding** profile.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        match self.embedding.provider {
            LlmProvider::Ollama => {
                self.get_or_init_ollama(&self.embedding)
                    .await?
                    .embeddings(input)
                    .await
            }
            LlmProvider::OpenAI => {
                self.get_or_init_openai(&self.embedding)
                    .await?
                    .embeddings(input)
                    .await
            }
        }
    }

    /// Computes embeddings for a batch of inputs (one request).
    pub async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AiLlmError> {
        match self.embedding.provider {
            LlmProvider::Ollama => {
                self.get_or_init_ollama(&self.embedding)
                    .await?
                    .embeddings_batch(inputs)
                    .await
            }
            LlmProvider::OpenAI => {
                self.get_or_init_openai(&self.embedding)
                    .await?
                    .embeddings_batch(inputs)
                    .await
            }
        }
    }

    /// Health snapshot for all distinct profiles.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        self.health.check_many(&self.distinct_profiles()).await
    }

    /// Returns references to the current profiles `(chat, rewrite, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig, &LlmModelConfig) {
        (&self.chat, &self.rewrite, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    fn profile_cfg(&self, profile: LlmProfile) -> &LlmModelConfig {
        match profile {
            LlmProfile::Chat => &self.chat,
            LlmProfile::Rewrite => &self.rewrite,
        }
    }

    fn distinct_profiles(&self) -> Vec<LlmModelConfig> {
        let mut list: Vec<LlmModelConfig> = Vec::with_capacity(3);
        for cfg in [&self.chat, &self.rewrite, &self.embedding] {
            if !list.contains(cfg) {
                list.push(cfg.clone());
            }
        }
        list
    }

    async fn get_or_init_ollama(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.ollama.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        debug!(model = %cfg.model, "creating Ollama client");
        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }

    async fn get_or_init_openai(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.openai.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        debug!(model = %cfg.model, "creating OpenAI client");
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Internal cache key to identify unique client configs.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}

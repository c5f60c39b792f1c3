use std::sync::Arc;
use std::time::Duration;

use ai_llm_service::{AiLlmError, LlmServiceProfiles};
use contextor::{ContextorConfig, ContextorError, ProfileChat, RagChat, SessionStore};
use rag_store::embed::llm::LlmEmbedder;
use rag_store::{RagConfig, RagError, RagStore};
use thiserror::Error;
use tracing::info;

/// Startup configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid number")]
    InvalidNumber { var: &'static str, value: String },

    #[error(transparent)]
    Llm(#[from] AiLlmError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Chat(#[from] ContextorError),
}

/// HTTP server settings.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Listen address, e.g. "127.0.0.1:5002".
    pub address: String,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5002".into(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();
        let address = std::env::var("API_ADDRESS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(d.address);
        let max_upload_bytes = match std::env::var("MAX_UPLOAD_BYTES") {
            Ok(v) if !v.trim().is_empty() => {
                v.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber {
                        var: "MAX_UPLOAD_BYTES",
                        value: v.clone(),
                    })?
            }
            _ => d.max_upload_bytes,
        };
        Ok(Self {
            address,
            max_upload_bytes,
        })
    }
}

/// Shared state for all HTTP handlers.
pub struct AppState {
    pub config: ApiConfig,
    pub chat: Arc<RagChat>,
    /// Profiles probed by `/health`; `None` when the chat model is not
    /// backed by the LLM service.
    pub llm: Option<Arc<LlmServiceProfiles>>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        chat: Arc<RagChat>,
        llm: Option<Arc<LlmServiceProfiles>>,
    ) -> Self {
        Self { config, chat, llm }
    }

    /// Wires the LLM profiles, the store, the sessions and the chat pipeline
    /// from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = ApiConfig::from_env()?;
        let rag_cfg = RagConfig::from_env()?;
        let ctx_cfg = ContextorConfig::from_env()?;

        let llm = Arc::new(LlmServiceProfiles::from_env()?);
        let store = Arc::new(RagStore::new(
            rag_cfg,
            Arc::new(LlmEmbedder::new(llm.clone())),
        )?);
        let sessions = Arc::new(SessionStore::new(
            ctx_cfg.session_ttl,
            ctx_cfg.history_max_turns,
        ));

        info!(
            address = %config.address,
            max_upload_bytes = config.max_upload_bytes,
            chunk_size = store.config().chunk_size,
            chunk_overlap = store.config().chunk_overlap,
            top_k = store.config().top_k,
            "application state ready"
        );

        let chat = Arc::new(RagChat::new(
            ctx_cfg,
            store,
            sessions,
            Arc::new(ProfileChat::new(llm.clone())),
        ));
        Ok(Self::new(config, chat, Some(llm)))
    }

    /// Starts periodic eviction of idle sessions.
    pub fn spawn_session_evictor(&self) -> tokio::task::JoinHandle<()> {
        let period = Duration::from_secs(60).min(self.chat.config().session_ttl);
        self.chat.sessions().clone().spawn_evictor(period)
    }
}

use ai_llm_service::health_service::HealthStatus;
use serde::Serialize;

/// Response payload for /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `true` when every probed LLM profile answered.
    pub ok: bool,
    pub document: DocumentStatus,
    pub sessions: usize,
    pub llm: Vec<HealthStatus>,
}

#[derive(Debug, Serialize)]
pub struct DocumentStatus {
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub pages: usize,
    pub chunks: usize,
    pub generation: u64,
}

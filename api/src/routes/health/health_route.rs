//! GET /health: document status and LLM backend probes.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    routes::health::health_response::{DocumentStatus, HealthResponse},
};

pub async fn health_route(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    let document = match state.chat.store().current().await {
        Some(index) => DocumentStatus {
            loaded: true,
            name: Some(index.info().name.clone()),
            pages: index.info().pages,
            chunks: index.len(),
            generation: index.generation(),
        },
        None => DocumentStatus {
            loaded: false,
            name: None,
            pages: 0,
            chunks: 0,
            generation: 0,
        },
    };

    let llm = match &state.llm {
        Some(profiles) => profiles.health_all().await,
        None => Vec::new(),
    };

    Json(ApiResponse::success(HealthResponse {
        ok: llm.iter().all(|s| s.ok),
        document,
        sessions: state.chat.sessions().len().await,
        llm,
    }))
}

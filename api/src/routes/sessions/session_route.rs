//! DELETE /sessions/{id}: forgets a conversation.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::info;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::{AppError, AppResult},
    routes::chat::chat_request::is_valid_session_id,
};

#[derive(Debug, Serialize)]
pub struct SessionResetResponse {
    pub session_id: String,
    /// `false` if the session was unknown or already expired.
    pub cleared: bool,
}

pub async fn reset_session_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<SessionResetResponse>>> {
    if !is_valid_session_id(&id) {
        return Err(AppError::BadRequest("invalid session id".into()));
    }
    let cleared = state.chat.sessions().reset(&id).await;
    info!(session = %id, cleared, "session reset");
    Ok(Json(ApiResponse::success(SessionResetResponse {
        session_id: id,
        cleared,
    })))
}

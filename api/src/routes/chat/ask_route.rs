//! POST /ask: one chat turn, answered as a single JSON document.

use std::sync::Arc;

use axum::{Json, extract::State};
use contextor::AskOutcome;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    routes::chat::chat_request::ChatRequest,
};

/// Handler: POST /ask
///
/// Same pipeline as `/chat`, collected. Failures of the turn are reported in
/// `data.error` rather than as an HTTP error, like the stream does.
pub async fn ask_route(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ApiResponse<AskOutcome>>> {
    let question = body.question()?;
    let session_id = body.session()?;
    let outcome = state.chat.ask(&session_id, &question).await;
    Ok(Json(ApiResponse::success(outcome)))
}

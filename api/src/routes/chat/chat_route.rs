//! POST /chat: streams an answer as Server-Sent Events.

use std::{convert::Infallible, sync::Arc};

use axum::{
    Json,
    extract::State,
    http::{HeaderName, HeaderValue},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::StreamExt;
use tracing::debug;

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::chat::chat_request::ChatRequest,
};

pub const SESSION_HEADER: HeaderName = HeaderName::from_static("x-session-id");

/// Handler: POST /chat
///
/// Every frame is one `data:` line; the stream always ends with
/// `data: [END_OF_STREAM]`. Errors arrive in-band as `data: [ERROR] ...`.
///
/// # Example
/// ```bash
/// curl -N -X POST http://127.0.0.1:5002/chat \
///   -H 'content-type: application/json' \
///   -d '{"query":"What is this document about?"}'
/// ```
pub async fn chat_route(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Response> {
    let question = body.question()?;
    let session_id = body.session()?;
    let header = HeaderValue::from_str(&session_id)
        .map_err(|e| AppError::BadRequest(format!("invalid session id: {e}")))?;

    debug!(session = %session_id, chars = question.chars().count(), "chat request");

    let frames = state
        .chat
        .chat_stream(session_id, question)
        .map(|frame| Ok::<_, Infallible>(Event::default().data(frame.payload())));

    let sse = Sse::new(frames).keep_alive(KeepAlive::default());
    Ok(([(SESSION_HEADER, header)], sse).into_response())
}

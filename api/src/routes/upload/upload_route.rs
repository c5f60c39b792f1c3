//! POST /upload: replaces the current document with an uploaded PDF.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State},
};
use tracing::{debug, info};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::{AppError, AppResult},
    routes::upload::upload_response::UploadResponse,
};

/// Handler: POST /upload (multipart, field `file`)
///
/// # Example
/// ```bash
/// curl -F 'file=@report.pdf' http://127.0.0.1:5002/upload
/// ```
pub async fn upload_route(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<UploadResponse>>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string).unwrap_or_default();
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(AppError::BadRequest("No file part".into()));
    };
    let name = display_name(&file_name);
    if name.is_empty() {
        return Err(AppError::BadRequest("No selected file".into()));
    }
    if !name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(AppError::BadRequest(
            "Invalid file type. Please upload a PDF.".into(),
        ));
    }
    let limit = state.config.max_upload_bytes;
    if bytes.len() > limit {
        return Err(AppError::PayloadTooLarge { limit });
    }

    debug!(file = %name, bytes = bytes.len(), "upload received");
    let report = state.chat.ingest_pdf(bytes.to_vec(), name.clone()).await?;
    info!(
        file = %name,
        generation = report.generation,
        chunks = report.chunks,
        "upload indexed"
    );

    Ok(Json(ApiResponse::success(UploadResponse {
        message: format!("File '{name}' processed successfully."),
        pages: report.document.pages,
        chunks: report.chunks,
        generation: report.generation,
    })))
}

/// Last path component of a client-supplied file name, without control
/// characters.
fn display_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

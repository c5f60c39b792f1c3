pub mod ollama_service;
pub mod open_ai_service;
pub(crate) mod stream_decode;

use std::time::Instant;

use tracing::error;

use crate::error_handler::{
    AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
};

/// Passes 2xx responses through; otherwise reads a body snippet, logs it,
/// and returns `ProviderErrorKind::HttpStatus`.
pub(crate) async fn ensure_success(
    provider: Provider,
    resp: reqwest::Response,
    url: &str,
    model: &str,
    started: Instant,
) -> Result<reqwest::Response, AiLlmError> {
    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let snippet = make_snippet(&text);

    error!(
        %provider,
        %status,
        %url,
        %snippet,
        model = %model,
        latency_ms = started.elapsed().as_millis(),
        "provider returned non-success status"
    );

    Err(ProviderError::new(
        provider,
        ProviderErrorKind::HttpStatus(HttpError {
            status,
            url: url.to_string(),
            snippet,
        }),
    )
    .into())
}

/// Rejects empty endpoints and endpoints without an http/https scheme.
pub(crate) fn checked_base(provider: Provider, endpoint: &str) -> Result<String, AiLlmError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty()
        || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        return Err(ProviderError::new(
            provider,
            ProviderErrorKind::InvalidEndpoint(endpoint.to_string()),
        )
        .into());
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

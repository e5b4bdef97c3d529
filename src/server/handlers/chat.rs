use axum::{
    body::{Body, Bytes},
    extract::State,
    response::Response,
};
use std::sync::Arc;

use crate::error::RelayError;
use crate::providers::ollama::ChatPrompt;
use crate::server::{AppState, util::relay_response_headers};

/// `POST /chat`：解析请求体，转发到上游，并按行流式回传上游 body。
///
/// 请求体不校验 Content-Type，任何能解析为 ChatPrompt 的 JSON 都接受。
pub async fn chat(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let prompt = ChatPrompt::from_slice(&body).map_err(|e| {
        tracing::warn!("Rejecting /chat body: {}", e);
        RelayError::InvalidJson(e)
    })?;
    tracing::debug!(
        requested_model = %prompt.model,
        messages = prompt.messages.len(),
        "Forwarding chat request"
    );

    let upstream = app_state
        .forwarder
        .forward(prompt)
        .await
        .inspect_err(|e| tracing::warn!("Upstream call failed: {}", e))?;

    let status = upstream.status();
    let headers = relay_response_headers(upstream.headers());

    let mut response = Response::new(Body::from_stream(upstream.into_line_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

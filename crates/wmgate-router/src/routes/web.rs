//! Simplified `{message}` endpoints backed directly by the primary provider.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use wmgate_common::GEMINI_MODEL_IDS;
use wmgate_core::{GatewayContext, OPENAI_WEB_MODEL_IDS, RuntimeMode, SessionManager};
use wmgate_protocol::web::{WebPromptRequest, WebPromptResponse};

use crate::error::GatewayError;
use crate::extract::{ensure_valid, parse_json};

/// Only reachable while the gateway runs in `webai` mode.
pub(crate) async fn require_webai(
    State(context): State<Arc<GatewayContext>>,
    request: Request,
    next: Next,
) -> Response {
    if context.mode() == Some(RuntimeMode::NativeApi) {
        return GatewayError::NotFound(format!(
            "{} is not available in {} mode.",
            request.uri().path(),
            RuntimeMode::NativeApi
        ))
        .into_response();
    }
    next.run(request).await
}

struct Prompt {
    message: String,
    model: String,
    files: Vec<String>,
}

fn parse_prompt(context: &GatewayContext, body: &[u8]) -> Result<Prompt, GatewayError> {
    let request: WebPromptRequest = parse_json(body)?;
    let known: Vec<&str> = GEMINI_MODEL_IDS
        .iter()
        .chain(OPENAI_WEB_MODEL_IDS.iter())
        .copied()
        .collect();
    ensure_valid(request.validate(&known))?;
    Ok(Prompt {
        model: request.model.unwrap_or_else(|| context.default_model()),
        message: request.message,
        files: request.files.unwrap_or_default(),
    })
}

/// Stateless: every call is a fresh conversation.
pub(crate) async fn gemini(
    State(context): State<Arc<GatewayContext>>,
    body: Bytes,
) -> Result<Json<WebPromptResponse>, GatewayError> {
    let prompt = parse_prompt(&context, &body)?;
    let output = context
        .provider()?
        .generate_content(&prompt.message, &prompt.model, &prompt.files, None)
        .await?;
    Ok(Json(WebPromptResponse {
        response: output.text,
    }))
}

pub(crate) async fn gemini_chat(
    State(context): State<Arc<GatewayContext>>,
    body: Bytes,
) -> Result<Json<WebPromptResponse>, GatewayError> {
    let prompt = parse_prompt(&context, &body)?;
    let sessions = context.sessions();
    session_turn(&sessions.chat, prompt).await
}

pub(crate) async fn translate(
    State(context): State<Arc<GatewayContext>>,
    body: Bytes,
) -> Result<Json<WebPromptResponse>, GatewayError> {
    let prompt = parse_prompt(&context, &body)?;
    let sessions = context.sessions();
    session_turn(&sessions.translate, prompt).await
}

async fn session_turn(
    slot: &SessionManager,
    prompt: Prompt,
) -> Result<Json<WebPromptResponse>, GatewayError> {
    let response = slot
        .get_response(&prompt.model, &prompt.message, &prompt.files)
        .await?;
    Ok(Json(WebPromptResponse { response }))
}

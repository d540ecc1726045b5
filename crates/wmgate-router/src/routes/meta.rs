use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use wmgate_core::GatewayContext;

pub(crate) const SERVICE_NAME: &str = "web-model-api-gateway";

pub(crate) const ENDPOINTS: [&str; 9] = [
    "POST /gemini",
    "POST /gemini-chat",
    "POST /translate",
    "POST /v1/chat/completions",
    "POST /v1/responses",
    "GET /v1/models",
    "GET /v1/models/:model",
    "POST /v1beta/models/:model",
    "POST /v1beta/models/:model:streamGenerateContent",
];

#[derive(Debug, Serialize)]
pub(crate) struct Health {
    status: &'static str,
    service: &'static str,
    active_provider: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct Docs {
    api: &'static str,
    active_provider: String,
    mode: Option<&'static str>,
    endpoints: &'static [&'static str],
}

pub(crate) async fn root(State(context): State<Arc<GatewayContext>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        service: SERVICE_NAME,
        active_provider: context.active_provider_id(),
    })
}

pub(crate) async fn docs(State(context): State<Arc<GatewayContext>>) -> Json<Docs> {
    Json(Docs {
        api: "Web Model API Gateway",
        active_provider: context.active_provider_id(),
        mode: context.mode().map(|mode| mode.as_str()),
        endpoints: &ENDPOINTS,
    })
}

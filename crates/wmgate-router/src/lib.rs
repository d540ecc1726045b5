//! HTTP surface of the gateway.
//!
//! Every dialect shares one [`GatewayContext`]; handlers resolve the model,
//! run one generation and wrap the text in the caller's wire format.

mod error;
mod extract;
mod prompt;
mod routes;
mod sse;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use wmgate_core::GatewayContext;

pub use error::GatewayError;
pub use prompt::{chat_prompt, content_text, input_text, prompt_line, responses_prompt};

/// Largest request body accepted on any route.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub fn gateway_router(context: Arc<GatewayContext>) -> Router {
    let web = Router::new()
        .route("/gemini", post(routes::web::gemini))
        .route("/gemini-chat", post(routes::web::gemini_chat))
        .route("/translate", post(routes::web::translate))
        .route_layer(middleware::from_fn_with_state(
            context.clone(),
            routes::web::require_webai,
        ));

    Router::new()
        .route("/", get(routes::meta::root))
        .route("/docs", get(routes::meta::docs))
        .route("/v1/models", get(routes::openai::list_models))
        .route("/v1/models/{model}", get(routes::openai::get_model))
        .route("/v1/chat/completions", post(routes::openai::chat_completions))
        .route("/v1/responses", post(routes::openai::responses))
        .route("/v1beta/models/{*name}", post(routes::google::generate_content))
        .merge(web)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(context)
}

pub(crate) fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

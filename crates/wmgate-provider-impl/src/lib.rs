//! Concrete backends behind the provider trait.
//!
//! `gemini` speaks the cookie-authenticated web RPC; `openai_web` forwards to
//! a hosted OpenAI-compatible API.

pub mod gemini;
mod http_client;
pub mod openai_web;

use std::sync::Arc;

use wmgate_provider_core::ProviderRegistry;

pub use gemini::{
    CookieSource, Credentials, GeminiEndpoints, GeminiWebClient, GeminiWebProvider,
    NoBrowserCookies,
};
pub use openai_web::OpenAiWebProvider;

pub use wmgate_common::SharedConfig;

/// Registry with every built-in provider, in probe order.
pub fn build_registry(
    config: SharedConfig,
    config_location: &str,
    cookie_source: Arc<dyn CookieSource>,
) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new(config_location);
    registry.register(Arc::new(GeminiWebProvider::new(
        config.clone(),
        config_location,
        cookie_source,
    )));
    registry.register(Arc::new(OpenAiWebProvider::new(config, config_location)));
    registry
}

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use wreq::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use wmgate_common::OpenAiWebConfig;
use wmgate_provider_core::{ProviderError, ProviderOutput, ProviderResult};

use crate::http_client::{SharedClientKind, shared_client, transport_error};

pub(crate) const PROVIDER_ID: &str = "openai-web";
pub(crate) const PROVIDER_LABEL: &str = "OpenAI Web";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

impl WireMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: &'a [WireMessage],
}

/// Client bound to one base URL and key, built by a passing healthcheck.
pub struct OpenAiWebClient {
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAiWebClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiWebClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiWebClient {
    pub fn from_config(config: &OpenAiWebConfig, location: &str) -> ProviderResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ProviderError::CredentialsMissing {
                what: "openai_web.api_key".to_string(),
                location: location.to_string(),
            })?;
        Ok(Self {
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|err| ProviderError::Transport(format!("invalid api key header: {err}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Lists models to prove the key is accepted.
    pub async fn healthcheck(&self) -> ProviderResult<()> {
        let http = shared_client(SharedClientKind::OpenAiWeb, None)?;
        let response = http
            .get(format!("{}/v1/models", self.base_url))
            .headers(self.headers()?)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::InitFailed {
                provider: PROVIDER_LABEL.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Non-streaming chat completion over the full `messages` history.
    pub async fn complete(&self, model: &str, messages: &[WireMessage]) -> ProviderResult<ProviderOutput> {
        let http = shared_client(SharedClientKind::OpenAiWeb, None)?;
        let mut headers = self.headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = ChatRequest {
            model,
            stream: false,
            messages,
        };
        let response = http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::UpstreamStatus {
                provider: PROVIDER_LABEL.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await.map_err(transport_error)?;
        let text = assistant_content(&payload).ok_or_else(|| ProviderError::MissingContent {
            provider: PROVIDER_LABEL.to_string(),
        })?;
        debug!(model, turns = messages.len(), "chat completion received");
        Ok(ProviderOutput::text(text))
    }
}

fn assistant_content(payload: &Value) -> Option<String> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}

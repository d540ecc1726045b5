use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use tracing::{error, info};
use wmgate_provider_core::{
    ChatSession, ContinuationMetadata, ProviderError, ProviderOutput, ProviderResult,
    WebModelProvider,
};

use super::client::{OpenAiWebClient, PROVIDER_ID, PROVIDER_LABEL, WireMessage};
use crate::SharedConfig;

pub struct OpenAiWebProvider {
    config: SharedConfig,
    config_location: String,
    client: ArcSwapOption<OpenAiWebClient>,
    last_error: ArcSwapOption<String>,
}

impl OpenAiWebProvider {
    pub fn new(config: SharedConfig, config_location: &str) -> Self {
        Self {
            config,
            config_location: config_location.to_string(),
            client: ArcSwapOption::empty(),
            last_error: ArcSwapOption::empty(),
        }
    }

    fn client(&self) -> ProviderResult<Arc<OpenAiWebClient>> {
        self.client
            .load_full()
            .ok_or_else(|| ProviderError::NotInitialized(PROVIDER_LABEL.to_string()))
    }
}

#[async_trait]
impl WebModelProvider for OpenAiWebProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn label(&self) -> &str {
        PROVIDER_LABEL
    }

    fn is_enabled(&self) -> bool {
        self.config.load().openai_web.enabled
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.load_full().map(|err| err.as_ref().clone())
    }

    async fn initialize(&self) -> bool {
        let config = self.config.load_full();
        if !config.openai_web.enabled {
            self.client.store(None);
            self.last_error.store(Some(Arc::new(
                "OpenAI Web is disabled via openai_web.enabled=false".to_string(),
            )));
            return false;
        }

        let probe = async {
            let client = OpenAiWebClient::from_config(&config.openai_web, &self.config_location)?;
            client.healthcheck().await?;
            Ok::<_, ProviderError>(client)
        };
        match probe.await {
            Ok(client) => {
                info!(provider = PROVIDER_ID, base_url = client.base_url(), "provider initialized");
                self.client.store(Some(Arc::new(client)));
                self.last_error.store(None);
                true
            }
            Err(err) => {
                error!(provider = PROVIDER_ID, error = %err, "provider initialization failed");
                self.client.store(None);
                self.last_error.store(Some(Arc::new(err.to_string())));
                false
            }
        }
    }

    async fn generate_content(
        &self,
        prompt: &str,
        model: &str,
        _files: &[String],
        _metadata: Option<&ContinuationMetadata>,
    ) -> ProviderResult<ProviderOutput> {
        self.client()?
            .complete(model, &[WireMessage::user(prompt)])
            .await
    }

    fn start_chat(&self, model: &str) -> ProviderResult<Box<dyn ChatSession>> {
        Ok(Box::new(OpenAiWebChatSession {
            client: self.client()?,
            model: model.to_string(),
            history: Vec::new(),
        }))
    }
}

/// Conversation kept client side as the full message history.
struct OpenAiWebChatSession {
    client: Arc<OpenAiWebClient>,
    model: String,
    history: Vec<WireMessage>,
}

#[async_trait]
impl ChatSession for OpenAiWebChatSession {
    fn model(&self) -> &str {
        &self.model
    }

    async fn send_message(&mut self, prompt: &str, _files: &[String]) -> ProviderResult<ProviderOutput> {
        let mut messages = self.history.clone();
        messages.push(WireMessage::user(prompt));
        let output = self.client.complete(&self.model, &messages).await?;
        messages.push(WireMessage::assistant(output.text.clone()));
        self.history = messages;
        Ok(output)
    }
}

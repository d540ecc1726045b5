use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use tracing::{error, info};
use wmgate_provider_core::{
    ChatSession, ContinuationMetadata, ProviderError, ProviderOutput, ProviderResult,
    WebModelProvider,
};

use super::client::GeminiWebClient;
use super::constants::{GeminiEndpoints, PROVIDER_ID, PROVIDER_LABEL};
use super::cookies::CookieSource;
use crate::SharedConfig;

pub struct GeminiWebProvider {
    config: SharedConfig,
    config_location: String,
    endpoints: GeminiEndpoints,
    cookie_source: Arc<dyn CookieSource>,
    client: ArcSwapOption<GeminiWebClient>,
    last_error: ArcSwapOption<String>,
}

impl GeminiWebProvider {
    pub fn new(
        config: SharedConfig,
        config_location: &str,
        cookie_source: Arc<dyn CookieSource>,
    ) -> Self {
        Self {
            config,
            config_location: config_location.to_string(),
            endpoints: GeminiEndpoints::default(),
            cookie_source,
            client: ArcSwapOption::empty(),
            last_error: ArcSwapOption::empty(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: GeminiEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn client(&self) -> ProviderResult<Arc<GeminiWebClient>> {
        self.client
            .load_full()
            .ok_or_else(|| ProviderError::NotInitialized(PROVIDER_LABEL.to_string()))
    }
}

#[async_trait]
impl WebModelProvider for GeminiWebProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn label(&self) -> &str {
        PROVIDER_LABEL
    }

    fn is_enabled(&self) -> bool {
        self.config.load().gemini.enabled
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.load_full().map(|err| err.as_ref().clone())
    }

    async fn initialize(&self) -> bool {
        let config = self.config.load_full();
        if !config.gemini.enabled {
            self.client.store(None);
            self.last_error.store(Some(Arc::new(
                "Gemini Web is disabled via gemini.enabled=false".to_string(),
            )));
            return false;
        }

        match GeminiWebClient::init(
            &config.gemini,
            &self.config_location,
            self.endpoints.clone(),
            self.cookie_source.as_ref(),
        )
        .await
        {
            Ok(client) => {
                self.client.store(Some(Arc::new(client)));
                self.last_error.store(None);
                info!(provider = PROVIDER_ID, "provider initialized");
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
        files: &[String],
        metadata: Option<&ContinuationMetadata>,
    ) -> ProviderResult<ProviderOutput> {
        let initial = ContinuationMetadata::default();
        let output = self
            .client()?
            .generate_content(prompt, model, files, metadata.unwrap_or(&initial))
            .await?;
        Ok(output.into())
    }

    fn start_chat(&self, model: &str) -> ProviderResult<Box<dyn ChatSession>> {
        Ok(Box::new(self.client()?.start_chat(model)))
    }
}

use std::fmt;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use serde::Serialize;
use wmgate_common::AppConfig;
use wmgate_provider_core::{ProviderRegistry, ProviderResult, WebModelProvider};

use crate::models::{LanguageModel, ModelRegistry};
use crate::session::SessionSlots;

/// Which router set is reachable. Both share one listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeMode {
    Webai,
    NativeApi,
}

impl RuntimeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeMode::Webai => "webai",
            RuntimeMode::NativeApi => "native-api",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RuntimeMode::Webai => "WebAI",
            RuntimeMode::NativeApi => "Native API",
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the primary provider at call time.
pub type ProviderResolver =
    Arc<dyn Fn() -> ProviderResult<Arc<dyn WebModelProvider>> + Send + Sync>;

/// Everything a request handler needs. The mutable fields are replaced
/// wholesale by the runtime controller; handlers only read them.
pub struct GatewayContext {
    registry: Arc<ProviderRegistry>,
    models: ModelRegistry,
    resolver: ProviderResolver,
    default_model: ArcSwap<String>,
    active_provider: Arc<ArcSwap<String>>,
    sessions: ArcSwap<SessionSlots>,
    mode: ArcSwapOption<RuntimeMode>,
}

impl GatewayContext {
    pub fn new(registry: Arc<ProviderRegistry>, config: &AppConfig) -> Self {
        let active_provider = Arc::new(ArcSwap::from_pointee(config.active_provider.clone()));
        let resolver: ProviderResolver = {
            let registry = registry.clone();
            let active_provider = active_provider.clone();
            Arc::new(move || registry.primary(active_provider.load().as_str()))
        };
        Self {
            sessions: ArcSwap::from_pointee(SessionSlots::new(resolver.clone())),
            registry,
            models: ModelRegistry::new(),
            resolver,
            default_model: ArcSwap::from_pointee(config.default_model.clone()),
            active_provider,
            mode: ArcSwapOption::empty(),
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// The configured active provider, or why it cannot serve.
    pub fn provider(&self) -> ProviderResult<Arc<dyn WebModelProvider>> {
        (self.resolver)()
    }

    pub fn default_model(&self) -> String {
        self.default_model.load().as_ref().clone()
    }

    pub fn set_default_model(&self, model: &str) {
        self.default_model.store(Arc::new(model.to_string()));
    }

    pub fn active_provider_id(&self) -> String {
        self.active_provider.load().as_ref().clone()
    }

    pub fn sessions(&self) -> Arc<SessionSlots> {
        self.sessions.load_full()
    }

    pub fn mode(&self) -> Option<RuntimeMode> {
        self.mode.load().as_deref().copied()
    }

    /// Driven by the runtime controller; exposed so routers can be served
    /// without one.
    pub fn set_mode(&self, mode: Option<RuntimeMode>) {
        self.mode.store(mode.map(Arc::new));
    }

    /// Generation adapter for `requested`, falling back to the default model.
    pub fn resolve_model(&self, requested: Option<&str>) -> LanguageModel {
        self.models
            .resolve(requested, &self.default_model(), &self.resolver)
    }

    /// Re-reads the mutable fields from `config`. Session slots are replaced,
    /// dropping any continuation state.
    pub(crate) fn reset(&self, config: &AppConfig) {
        self.default_model
            .store(Arc::new(config.default_model.clone()));
        self.active_provider
            .store(Arc::new(config.active_provider.clone()));
        self.sessions
            .store(Arc::new(SessionSlots::new(self.resolver.clone())));
    }
}

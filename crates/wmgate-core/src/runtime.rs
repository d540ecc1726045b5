use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use wmgate_common::{AppConfig, ConfigStore, ModePreference, SharedConfig};
use wmgate_provider_core::ProviderStatus;

use crate::context::{GatewayContext, RuntimeMode};
use crate::error::RuntimeError;

/// Builds the HTTP application served for a context.
pub type AppFactory = Arc<dyn Fn(Arc<GatewayContext>) -> axum::Router + Send + Sync>;

/// Read-only snapshot of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeState {
    pub mode: Option<RuntimeMode>,
    pub host: String,
    pub port: u16,
    pub webai_available: bool,
    pub native_api_available: bool,
    pub active_provider_id: String,
    pub active_provider_available: bool,
}

struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// Owns the listener and the mode. Driven from a single control flow, so
/// every lifecycle operation takes `&mut self`.
pub struct RuntimeController {
    store: Arc<dyn ConfigStore>,
    config: SharedConfig,
    context: Arc<GatewayContext>,
    app: AppFactory,
    server: Option<ServerHandle>,
    mode: Option<RuntimeMode>,
    webai_available: bool,
    native_api_available: bool,
    active_provider_available: bool,
}

impl RuntimeController {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        config: SharedConfig,
        context: Arc<GatewayContext>,
        app: AppFactory,
    ) -> Self {
        Self {
            store,
            config,
            context,
            app,
            server: None,
            mode: None,
            webai_available: false,
            native_api_available: true,
            active_provider_available: false,
        }
    }

    pub fn context(&self) -> &Arc<GatewayContext> {
        &self.context
    }

    pub fn config(&self) -> Arc<AppConfig> {
        self.config.load_full()
    }

    /// Address the listener is bound to, when running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|server| server.local_addr)
    }

    pub fn state(&self) -> RuntimeState {
        let config = self.config.load();
        RuntimeState {
            mode: self.mode,
            host: config.host.clone(),
            port: config.port,
            webai_available: self.webai_available,
            native_api_available: self.native_api_available,
            active_provider_id: self.context.active_provider_id(),
            active_provider_available: self.active_provider_available,
        }
    }

    pub fn statuses(&self) -> Vec<ProviderStatus> {
        self.context.registry().statuses()
    }

    /// Probes every provider and derives mode availability from the active
    /// one. Unavailability is recorded, never raised.
    pub async fn bootstrap(&mut self) -> Vec<ProviderStatus> {
        info!("checking runtime availability");
        let statuses = self.context.registry().initialize_providers().await;

        let active_id = self.context.active_provider_id();
        let status = self.context.registry().status(&active_id);
        self.active_provider_available = status.as_ref().is_some_and(|status| status.available);
        self.webai_available = self.active_provider_available;

        match &status {
            Some(status) => {
                info!(
                    provider = %status.id,
                    label = %status.label,
                    available = status.available,
                    "active provider"
                );
                if !status.available
                    && let Some(reason) = &status.error
                {
                    warn!(provider = %status.id, reason = %reason, "active provider unavailable");
                }
            }
            None => warn!(provider = %active_id, "active provider is not registered"),
        }
        info!(
            webai = self.webai_available,
            native_api = self.native_api_available,
            "mode availability"
        );
        statuses
    }

    fn is_available(&self, mode: RuntimeMode) -> bool {
        match mode {
            RuntimeMode::Webai => self.webai_available,
            RuntimeMode::NativeApi => self.native_api_available,
        }
    }

    async fn start_server(&mut self) -> Result<(), RuntimeError> {
        if self.server.is_some() {
            return Ok(());
        }

        let config = self.config.load_full();
        let addr = config.bind_address();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(err) if err.kind() == ErrorKind::AddrInUse => {
                return Err(RuntimeError::PortInUse {
                    host: config.host.clone(),
                    port: config.port,
                    location: self.store.location(),
                });
            }
            Err(source) => return Err(RuntimeError::Bind { addr, source }),
        };
        let local_addr = listener
            .local_addr()
            .map_err(|source| RuntimeError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let router = (self.app)(self.context.clone());
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await
        });

        info!(addr = %local_addr, "server running on http://{}:{}", config.host, config.port);
        self.server = Some(ServerHandle {
            local_addr,
            shutdown,
            task,
        });
        Ok(())
    }

    async fn stop_server(&mut self) -> Result<(), RuntimeError> {
        let Some(server) = self.server.take() else {
            return Ok(());
        };
        let _ = server.shutdown.send(());
        match server.task.await {
            Ok(Ok(())) => {
                info!(addr = %server.local_addr, "server stopped");
                Ok(())
            }
            Ok(Err(err)) => Err(RuntimeError::Server(err.to_string())),
            Err(err) => Err(RuntimeError::Server(err.to_string())),
        }
    }

    /// Binds the listener on first use; later switches only flip the mode.
    pub async fn switch_mode(&mut self, mode: RuntimeMode) -> Result<(), RuntimeError> {
        if self.mode == Some(mode) {
            return Ok(());
        }
        if !self.is_available(mode) {
            return Err(RuntimeError::ModeUnavailable { mode });
        }

        self.start_server().await?;
        self.mode = Some(mode);
        self.context.set_mode(Some(mode));
        info!(mode = %mode, "switched mode");
        Ok(())
    }

    pub async fn start_default_mode(&mut self) -> Result<RuntimeMode, RuntimeError> {
        let preferred = self.config.load().default_mode;
        let candidates: &[RuntimeMode] = match preferred {
            ModePreference::Webai if self.webai_available => &[RuntimeMode::Webai],
            ModePreference::NativeApi => &[RuntimeMode::NativeApi],
            _ => &[RuntimeMode::Webai, RuntimeMode::NativeApi],
        };

        for &mode in candidates {
            if self.is_available(mode) {
                self.switch_mode(mode).await?;
                return Ok(mode);
            }
        }
        Err(RuntimeError::NoAvailableMode {
            location: self.store.location(),
        })
    }

    /// Re-reads the store and applies it as a whole.
    ///
    /// The store is read before anything is torn down: an unreadable or
    /// invalid file leaves the running server untouched.
    pub async fn reload_configuration(&mut self) -> Result<(), RuntimeError> {
        let next = self.store.load()?;

        let was_running = self.server.is_some();
        let previous = self.mode;
        self.stop_server().await?;
        self.mode = None;
        self.context.set_mode(None);

        self.config.store(Arc::new(next));
        self.context.reset(&self.config.load());
        info!(location = %self.store.location(), "configuration reloaded");

        self.bootstrap().await;

        if !was_running {
            return Ok(());
        }
        if let Some(mode) = previous
            && self.is_available(mode)
        {
            return self.switch_mode(mode).await;
        }
        self.start_default_mode().await.map(|_| ())
    }

    /// Changes the default model and persists it.
    pub fn set_default_model(&mut self, model: &str) -> Result<(), RuntimeError> {
        if !self.context.models().contains(model) {
            return Err(RuntimeError::UnknownModel(model.to_string()));
        }
        let model_id = model.to_string();
        self.store
            .update(&|config| config.default_model = model_id.clone())?;
        let mut live = self.config.load().as_ref().clone();
        live.default_model = model_id;
        self.config.store(Arc::new(live));
        self.context.set_default_model(model);
        info!(model, "default model updated");
        Ok(())
    }

    /// Stops the listener if running. Safe to call repeatedly.
    pub async fn shutdown(&mut self) -> Result<(), RuntimeError> {
        let result = self.stop_server().await;
        self.mode = None;
        self.context.set_mode(None);
        result
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use tracing::{info, warn};

use crate::WebModelProvider;
use crate::errors::{ProviderError, ProviderResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub id: String,
    pub label: String,
    /// Configuration switch.
    pub enabled: bool,
    /// Outcome of the last initialization probe.
    pub available: bool,
    pub error: Option<String>,
}

/// Backends in registration order plus the availability recorded by the last
/// [`ProviderRegistry::initialize_providers`] run.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn WebModelProvider>>,
    availability: ArcSwap<HashMap<String, bool>>,
    config_location: String,
}

impl ProviderRegistry {
    /// `config_location` is quoted in operator-facing errors.
    pub fn new(config_location: impl Into<String>) -> Self {
        Self {
            providers: Vec::new(),
            availability: ArcSwap::from_pointee(HashMap::new()),
            config_location: config_location.into(),
        }
    }

    /// Registering an id twice replaces the earlier provider in place.
    pub fn register(&mut self, provider: Arc<dyn WebModelProvider>) {
        match self.providers.iter_mut().find(|p| p.id() == provider.id()) {
            Some(slot) => *slot = provider,
            None => self.providers.push(provider),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn WebModelProvider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.id().to_string()).collect()
    }

    fn is_available(&self, id: &str) -> bool {
        self.availability.load().get(id).copied().unwrap_or(false)
    }

    /// Probes every enabled provider in order and replaces the availability
    /// map. Disabled providers are never probed.
    pub async fn initialize_providers(&self) -> Vec<ProviderStatus> {
        let mut availability = HashMap::new();
        let mut statuses = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let enabled = provider.is_enabled();
            if !enabled {
                availability.insert(provider.id().to_string(), false);
                statuses.push(ProviderStatus {
                    id: provider.id().to_string(),
                    label: provider.label().to_string(),
                    enabled,
                    available: false,
                    error: Some(format!("Disabled via config: {}", self.config_location)),
                });
                continue;
            }

            let available = provider.initialize().await;
            availability.insert(provider.id().to_string(), available);
            statuses.push(ProviderStatus {
                id: provider.id().to_string(),
                label: provider.label().to_string(),
                enabled,
                available,
                error: provider.last_error(),
            });
        }

        self.availability.store(Arc::new(availability));
        self.log_matrix(&statuses);
        statuses
    }

    fn log_matrix(&self, statuses: &[ProviderStatus]) {
        for status in statuses {
            if status.available {
                info!(provider = %status.id, label = %status.label, "provider available");
            } else {
                warn!(
                    provider = %status.id,
                    label = %status.label,
                    reason = %status.error.as_deref().unwrap_or(""),
                    "provider unavailable"
                );
            }
        }
    }

    pub fn status(&self, id: &str) -> Option<ProviderStatus> {
        let provider = self.get(id)?;
        let enabled = provider.is_enabled();
        let error = if enabled {
            provider.last_error()
        } else {
            Some(format!("Disabled via config: {}", self.config_location))
        };
        Some(ProviderStatus {
            id: provider.id().to_string(),
            label: provider.label().to_string(),
            enabled,
            available: self.is_available(id),
            error,
        })
    }

    pub fn statuses(&self) -> Vec<ProviderStatus> {
        self.providers
            .iter()
            .filter_map(|p| self.status(p.id()))
            .collect()
    }

    /// The designated provider, or the reason it cannot serve. Never falls
    /// back to another registered provider.
    pub fn primary(&self, active_id: &str) -> ProviderResult<Arc<dyn WebModelProvider>> {
        let Some(provider) = self.get(active_id) else {
            return Err(ProviderError::NotRegistered {
                id: active_id.to_string(),
                location: self.config_location.clone(),
            });
        };
        if !self.is_available(active_id) {
            let reason = provider
                .last_error()
                .filter(|reason| !reason.is_empty())
                .unwrap_or_else(|| "Provider is unavailable.".to_string());
            return Err(ProviderError::Unavailable {
                label: provider.label().to_string(),
                reason,
            });
        }
        Ok(provider)
    }
}

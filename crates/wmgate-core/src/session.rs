use tokio::sync::Mutex;
use tracing::debug;
use wmgate_provider_core::{ChatSession, ProviderResult};

use crate::context::ProviderResolver;

struct ActiveSession {
    provider_id: String,
    model: String,
    session: Box<dyn ChatSession>,
}

/// One logical conversation slot.
///
/// The slot keeps a single chat session pinned to the (provider, model) pair
/// it was created for. A request for a different pair discards it and starts
/// fresh, so context from one backend or model never leaks into another.
/// Turns on one slot are serialized: the lock is held for the whole turn.
pub struct SessionManager {
    resolve: ProviderResolver,
    active: Mutex<Option<ActiveSession>>,
}

impl SessionManager {
    pub fn new(resolve: ProviderResolver) -> Self {
        Self {
            resolve,
            active: Mutex::new(None),
        }
    }

    pub async fn get_response(
        &self,
        model: &str,
        message: &str,
        files: &[String],
    ) -> ProviderResult<String> {
        let provider = (self.resolve)()?;
        let mut active = self.active.lock().await;

        let mut current = match active.take() {
            Some(current) if current.model == model && current.provider_id == provider.id() => {
                current
            }
            _ => {
                let session = provider.start_chat(model)?;
                debug!(provider = provider.id(), model, "started chat session");
                ActiveSession {
                    provider_id: provider.id().to_string(),
                    model: model.to_string(),
                    session,
                }
            }
        };

        let result = current.session.send_message(message, files).await;
        *active = Some(current);
        Ok(result?.text)
    }
}

/// The two fixed slots.
pub struct SessionSlots {
    pub translate: SessionManager,
    pub chat: SessionManager,
}

impl SessionSlots {
    pub fn new(resolve: ProviderResolver) -> Self {
        Self {
            translate: SessionManager::new(resolve.clone()),
            chat: SessionManager::new(resolve),
        }
    }
}

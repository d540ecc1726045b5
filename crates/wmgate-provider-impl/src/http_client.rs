use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use wmgate_provider_core::{ProviderError, ProviderResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SharedClientKind {
    /// Follows redirects; the landing page bounces through account checks.
    Gemini,
    OpenAiWeb,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    kind: SharedClientKind,
    proxy: Option<String>,
}

static CLIENT_CACHE: OnceLock<Mutex<HashMap<ClientKey, wreq::Client>>> = OnceLock::new();

/// Cached client per (kind, proxy). `None` means a direct connection.
pub(crate) fn shared_client(
    kind: SharedClientKind,
    proxy: Option<&str>,
) -> ProviderResult<wreq::Client> {
    let key = ClientKey {
        kind,
        proxy: normalize_proxy(proxy),
    };

    let cache = CLIENT_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache
        .lock()
        .map_err(|_| ProviderError::Transport("http client cache lock failed".to_string()))?;

    if let Some(client) = guard.get(&key) {
        return Ok(client.clone());
    }

    let client = build_client(&key)?;
    guard.insert(key, client.clone());
    Ok(client)
}

fn build_client(key: &ClientKey) -> ProviderResult<wreq::Client> {
    let mut builder = wreq::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT);
    if key.kind == SharedClientKind::Gemini {
        builder = builder.redirect(wreq::redirect::Policy::limited(10));
    }
    if let Some(proxy_url) = key.proxy.as_deref() {
        builder = builder.proxy(wreq::Proxy::all(proxy_url).map_err(transport_error)?);
    }
    builder.build().map_err(transport_error)
}

pub(crate) fn normalize_proxy(value: Option<&str>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

pub(crate) fn transport_error(err: wreq::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}

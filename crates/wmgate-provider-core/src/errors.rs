pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing credentials. Set {what} in {location}.")]
    CredentialsMissing { what: String, location: String },
    #[error(
        "Failed to initialize access token from web response (status={status}). Check cookies or proxy behavior."
    )]
    TokenExtractionFailed { status: u16 },
    #[error("{provider} initialization failed ({status}): {body}")]
    InitFailed {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("{0} client is not initialized.")]
    NotInitialized(String),
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),
    #[error("Failed to read attachment '{path}': {message}")]
    AttachmentRead { path: String, message: String },
    #[error("File upload failed with status {status}")]
    UploadFailed { status: u16 },
    #[error("{provider} request failed with status {status}")]
    UpstreamStatus {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("Could not parse web model response payload")]
    PayloadParseFailed,
    #[error("Failed to parse web model response body.")]
    ResponseBodyNotFound,
    #[error("Web model returned no candidates.")]
    NoCandidates,
    #[error("{provider} response missing assistant content.")]
    MissingContent { provider: String },
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("failed to encode upstream request: {0}")]
    RequestEncoding(String),
    #[error("Active provider '{id}' is not registered. Update active_provider in {location}.")]
    NotRegistered { id: String, location: String },
    #[error("Active provider '{label}' is unavailable. {reason}")]
    Unavailable { label: String, reason: String },
}

impl ProviderError {
    /// HTTP status the gateway answers with when this error reaches a route.
    pub fn status(&self) -> u16 {
        match self {
            ProviderError::UnsupportedModel(_) | ProviderError::AttachmentRead { .. } => 400,
            ProviderError::CredentialsMissing { .. }
            | ProviderError::TokenExtractionFailed { .. }
            | ProviderError::InitFailed { .. }
            | ProviderError::NotInitialized(_)
            | ProviderError::NotRegistered { .. }
            | ProviderError::Unavailable { .. } => 503,
            ProviderError::UploadFailed { .. }
            | ProviderError::UpstreamStatus { .. }
            | ProviderError::PayloadParseFailed
            | ProviderError::ResponseBodyNotFound
            | ProviderError::NoCandidates
            | ProviderError::MissingContent { .. } => 502,
            ProviderError::Transport(_) | ProviderError::RequestEncoding(_) => 500,
        }
    }

    /// Whether the message may be shown to HTTP callers.
    pub fn expose(&self) -> bool {
        !matches!(
            self,
            ProviderError::Transport(_) | ProviderError::RequestEncoding(_)
        )
    }
}

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};
use wmgate_protocol::error::DetailBody;
use wmgate_provider_core::ProviderError;

pub(crate) const GENERIC_FAILURE: &str = "Internal server error";

/// Everything a route can fail with. Serialized as `{detail}`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid JSON body")]
    InvalidJson,
    #[error("Invalid request: {}", .0.join("; "))]
    InvalidRequest(Vec<String>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidJson
            | GatewayError::InvalidRequest(_)
            | GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Provider(err) => {
                StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Unrecognized failures never leak detail.
    pub fn public_detail(&self) -> String {
        match self {
            GatewayError::Provider(err) => provider_detail(err),
            GatewayError::Internal(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }
}

fn provider_detail(err: &ProviderError) -> String {
    if err.expose() {
        err.to_string()
    } else {
        GENERIC_FAILURE.to_string()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            GatewayError::Provider(err) if !err.expose() => {
                error!(error = %err, "request failed");
            }
            GatewayError::Internal(detail) => error!(error = %detail, "request failed"),
            GatewayError::Provider(err) => {
                warn!(status = status.as_u16(), error = %err, "provider error");
            }
            _ => {}
        }
        (status, Json(DetailBody::new(self.public_detail()))).into_response()
    }
}

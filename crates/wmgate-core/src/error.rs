use wmgate_common::ConfigError;

use crate::context::RuntimeMode;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("{} mode is unavailable.", .mode.label())]
    ModeUnavailable { mode: RuntimeMode },
    #[error("No available mode to start. Check {location} and provider initialization logs.")]
    NoAvailableMode { location: String },
    #[error(
        "Port {port} is already in use on {host}. Stop the existing process or change port in {location}."
    )]
    PortInUse {
        host: String,
        port: u16,
        location: String,
    },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server task failed: {0}")]
    Server(String),
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

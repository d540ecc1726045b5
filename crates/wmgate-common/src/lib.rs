mod config;
mod store;

use std::sync::Arc;

use arc_swap::ArcSwap;

pub use config::{
    AppConfig, Browser, ConfigPatch, GeminiConfig, LogLevel, ModePreference, OpenAiWebConfig,
    DEFAULT_CONFIG_PATH, GEMINI_MODEL_IDS, KNOWN_PROVIDER_IDS,
};
pub use store::{ConfigError, ConfigStore, FileConfigStore, MemoryConfigStore};

/// Live configuration shared across crates; swapped whole on reload.
pub type SharedConfig = Arc<ArcSwap<AppConfig>>;

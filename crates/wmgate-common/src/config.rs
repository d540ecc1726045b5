use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/app.config.json";

/// Provider ids the gateway knows how to construct.
pub const KNOWN_PROVIDER_IDS: [&str; 2] = ["gemini-web", "openai-web"];

/// Model ids served by the cookie-authenticated web backend.
pub const GEMINI_MODEL_IDS: [&str; 3] = ["gemini-3.0-pro", "gemini-2.5-pro", "gemini-2.5-flash"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModePreference {
    #[default]
    Auto,
    Webai,
    NativeApi,
}

impl std::str::FromStr for ModePreference {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "auto" => Ok(ModePreference::Auto),
            "webai" => Ok(ModePreference::Webai),
            "native-api" => Ok(ModePreference::NativeApi),
            other => Err(format!(
                "unknown mode '{other}' (expected auto, webai or native-api)"
            )),
        }
    }
}

/// Browser whose cookie store may be consulted for web-model credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
    Brave,
    Edge,
    Safari,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeminiConfig {
    pub enabled: bool,
    pub browser: Browser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie_1psid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie_1psidts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    pub allow_browser_cookies: bool,
    /// Write the landing page to disk when token extraction fails.
    pub debug_save_init_html: bool,
    /// Retry token extraction once without the proxy.
    pub retry_without_proxy: bool,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            browser: Browser::Chrome,
            cookie_1psid: None,
            cookie_1psidts: None,
            http_proxy: None,
            allow_browser_cookies: false,
            debug_save_init_html: false,
            retry_without_proxy: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenAiWebConfig {
    pub enabled: bool,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for OpenAiWebConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
        }
    }
}

/// Persisted gateway configuration.
///
/// Unknown keys are rejected so typos in the file surface at load time
/// instead of silently falling back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub log_level: LogLevel,
    pub host: String,
    pub port: u16,
    pub default_mode: ModePreference,
    pub active_provider: String,
    pub default_model: String,
    pub gemini: GeminiConfig,
    pub openai_web: OpenAiWebConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            host: "localhost".to_string(),
            port: 9091,
            default_mode: ModePreference::Auto,
            active_provider: "gemini-web".to_string(),
            default_model: "gemini-2.5-flash".to_string(),
            gemini: GeminiConfig::default(),
            openai_web: OpenAiWebConfig::default(),
        }
    }
}

impl AppConfig {
    /// Returns every rule violation as `path: message`.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.host.trim().is_empty() {
            issues.push("host: must not be empty".to_string());
        }
        if self.port == 0 {
            issues.push("port: must be between 1 and 65535".to_string());
        }
        if !KNOWN_PROVIDER_IDS.contains(&self.active_provider.as_str()) {
            issues.push(format!(
                "active_provider: expected one of {}, got '{}'",
                KNOWN_PROVIDER_IDS.join(", "),
                self.active_provider
            ));
        }
        if self.default_model.trim().is_empty() {
            issues.push("default_model: must not be empty".to_string());
        }
        let base_url = self.openai_web.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            issues.push("openai_web.base_url: must be an http(s) URL".to_string());
        }
        issues
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Optional layer used for merging configuration.
///
/// Merge order: CLI > ENV > file. The patch is re-applied on every load so a
/// hot reload keeps command-line overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub default_mode: Option<ModePreference>,
    pub active_provider: Option<String>,
    pub default_model: Option<String>,
}

impl ConfigPatch {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(mode) = self.default_mode {
            config.default_mode = mode;
        }
        if let Some(provider) = &self.active_provider {
            config.active_provider = provider.clone();
        }
        if let Some(model) = &self.default_model {
            config.default_model = model.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 9091);
        assert!(config.gemini.enabled);
        assert!(!config.openai_web.enabled);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = serde_json::from_str::<AppConfig>(r#"{"APP_PORT": 1}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));

        let err =
            serde_json::from_str::<AppConfig>(r#"{"gemini": {"cookie": "x"}}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn mode_preference_uses_kebab_case() {
        let config: AppConfig =
            serde_json::from_str(r#"{"default_mode": "native-api"}"#).unwrap();
        assert_eq!(config.default_mode, ModePreference::NativeApi);
        assert_eq!("webai".parse::<ModePreference>(), Ok(ModePreference::Webai));
        assert!("native".parse::<ModePreference>().is_err());
    }

    #[test]
    fn validate_collects_all_issues() {
        let config = AppConfig {
            host: " ".to_string(),
            port: 0,
            active_provider: "claude".to_string(),
            ..AppConfig::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 3);
        assert!(issues[2].starts_with("active_provider:"));
    }

    #[test]
    fn patch_overrides_only_set_fields() {
        let patch = ConfigPatch {
            host: Some("0.0.0.0".to_string()),
            port: Some(2000),
            ..ConfigPatch::default()
        };

        let mut config = AppConfig::default();
        patch.apply(&mut config);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 2000);
        assert_eq!(config.default_model, "gemini-2.5-flash");
    }
}

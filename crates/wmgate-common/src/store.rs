use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::{AppConfig, ConfigPatch};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid JSON in config file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("Invalid config file '{path}':\n{}", issues.join("\n"))]
    Invalid { path: String, issues: Vec<String> },
    #[error("failed to write config file '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("config store lock poisoned")]
    Poisoned,
}

/// Source of truth for the persisted configuration.
pub trait ConfigStore: Send + Sync {
    /// Human-readable location used in operator-facing messages.
    fn location(&self) -> String;

    fn exists(&self) -> bool;

    /// Loads, overlays and validates the configuration.
    fn load(&self) -> Result<AppConfig, ConfigError>;

    /// Applies `edit` to the stored configuration (without overlays) and
    /// persists the result.
    fn update(&self, edit: &dyn Fn(&mut AppConfig)) -> Result<AppConfig, ConfigError>;
}

fn check(config: AppConfig, location: &str) -> Result<AppConfig, ConfigError> {
    let issues = config.validate();
    if issues.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Invalid {
            path: location.to_string(),
            issues,
        })
    }
}

/// JSON file store. Writes go through `<path>.<pid>.tmp` and a rename so
/// readers never observe a half-written file.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
    patch: ConfigPatch,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            patch: ConfigPatch::default(),
        }
    }

    pub fn with_patch(mut self, patch: ConfigPatch) -> Self {
        self.patch = patch;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_stored(&self) -> Result<AppConfig, ConfigError> {
        let location = self.location();
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(AppConfig::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: location,
                    source,
                });
            }
        };
        let text = text.trim();
        if text.is_empty() {
            return Ok(AppConfig::default());
        }
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: location,
            source,
        })
    }

    pub fn write(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let location = self.location();
        let write_err = |source| ConfigError::Write {
            path: location.clone(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        let mut payload = serde_json::to_string_pretty(config)
            .map_err(|err| write_err(std::io::Error::other(err)))?;
        payload.push('\n');

        let temp = PathBuf::from(format!("{}.{}.tmp", self.path.display(), std::process::id()));
        std::fs::write(&temp, payload).map_err(write_err)?;
        std::fs::rename(&temp, &self.path).map_err(write_err)
    }
}

impl ConfigStore for FileConfigStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = self.read_stored()?;
        self.patch.apply(&mut config);
        check(config, &self.location())
    }

    fn update(&self, edit: &dyn Fn(&mut AppConfig)) -> Result<AppConfig, ConfigError> {
        let mut stored = self.read_stored()?;
        edit(&mut stored);
        let stored = check(stored, &self.location())?;
        self.write(&stored)?;
        let mut merged = stored;
        self.patch.apply(&mut merged);
        Ok(merged)
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    config: Mutex<AppConfig>,
}

impl MemoryConfigStore {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    /// Replaces the stored configuration, as an operator editing the file would.
    pub fn set(&self, config: AppConfig) {
        if let Ok(mut guard) = self.config.lock() {
            *guard = config;
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn location(&self) -> String {
        "<memory>".to_string()
    }

    fn exists(&self) -> bool {
        true
    }

    fn load(&self) -> Result<AppConfig, ConfigError> {
        let config = self
            .config
            .lock()
            .map_err(|_| ConfigError::Poisoned)?
            .clone();
        check(config, "<memory>")
    }

    fn update(&self, edit: &dyn Fn(&mut AppConfig)) -> Result<AppConfig, ConfigError> {
        let mut guard = self.config.lock().map_err(|_| ConfigError::Poisoned)?;
        let mut next = guard.clone();
        edit(&mut next);
        let next = check(next, "<memory>")?;
        *guard = next.clone();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_empty_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.config.json");
        let store = FileConfigStore::new(&path);
        assert!(!store.exists());
        assert_eq!(store.load().unwrap(), AppConfig::default());

        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(store.load().unwrap(), AppConfig::default());
    }

    #[test]
    fn invalid_json_reports_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.config.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = FileConfigStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("app.config.json"));
    }

    #[test]
    fn invalid_values_are_aggregated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.config.json");
        std::fs::write(&path, r#"{"active_provider": "nope", "host": ""}"#).unwrap();
        let err = FileConfigStore::new(&path).load().unwrap_err();
        let ConfigError::Invalid { issues, .. } = err else {
            panic!("expected invalid config error");
        };
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn write_is_atomic_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.config.json");
        let store = FileConfigStore::new(&path);
        let config = AppConfig {
            port: 9100,
            ..AppConfig::default()
        };
        store.write(&config).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(store.load().unwrap().port, 9100);
    }

    #[test]
    fn patch_applies_on_load_but_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.config.json");
        let store = FileConfigStore::new(&path).with_patch(ConfigPatch {
            port: Some(7000),
            ..ConfigPatch::default()
        });

        let merged = store
            .update(&|config| config.default_model = "gemini-2.5-pro".to_string())
            .unwrap();
        assert_eq!(merged.port, 7000);
        assert_eq!(merged.default_model, "gemini-2.5-pro");

        let raw = FileConfigStore::new(&path).load().unwrap();
        assert_eq!(raw.port, 9091);
        assert_eq!(raw.default_model, "gemini-2.5-pro");
    }

    #[test]
    fn memory_store_rejects_invalid_updates() {
        let store = MemoryConfigStore::new(AppConfig::default());
        let err = store
            .update(&|config| config.active_provider = "other".to_string())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert_eq!(store.load().unwrap().active_provider, "gemini-web");
    }
}

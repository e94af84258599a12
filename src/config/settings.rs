use super::{default_state_root, ConfigError, StatePaths};
use crate::catalog::{Catalog, CatalogError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_INTENT_TIMEOUT_MS: u64 = 4_000;
pub const DEFAULT_INTENT_DEBOUNCE_MS: u64 = 250;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
    #[serde(default)]
    pub intent: IntentSettings,
}

/// Remote intent parsing. Without an endpoint only local matching is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntentSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_intent_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_intent_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for IntentSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key_env: None,
            timeout_ms: DEFAULT_INTENT_TIMEOUT_MS,
            debounce_ms: DEFAULT_INTENT_DEBOUNCE_MS,
        }
    }
}

fn default_intent_timeout_ms() -> u64 {
    DEFAULT_INTENT_TIMEOUT_MS
}

fn default_intent_debounce_ms() -> u64 {
    DEFAULT_INTENT_DEBOUNCE_MS
}

impl IntentSettings {
    /// Reads the api key from the configured environment variable, if any.
    pub fn api_key(&self) -> Option<String> {
        let name = self.api_key_env.as_deref()?;
        std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw, path)
    }

    pub fn from_yaml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root) = &self.state_root {
            if !root.is_absolute() {
                return Err(ConfigError::Settings(
                    "`state_root` must be an absolute path".to_string(),
                ));
            }
        }
        if let Some(endpoint) = &self.intent.endpoint {
            let endpoint = endpoint.trim();
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::Settings(
                    "`intent.endpoint` must start with http:// or https://".to_string(),
                ));
            }
        }
        if let Some(name) = &self.intent.api_key_env {
            if name.trim().is_empty() {
                return Err(ConfigError::Settings(
                    "`intent.api_key_env` must be non-empty when set".to_string(),
                ));
            }
        }
        if self.intent.timeout_ms == 0 {
            return Err(ConfigError::Settings(
                "`intent.timeout_ms` must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolve_state_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.state_root {
            Some(root) => Ok(root.clone()),
            None => default_state_root(),
        }
    }

    pub fn state_paths(&self) -> Result<StatePaths, ConfigError> {
        Ok(StatePaths::new(self.resolve_state_root()?))
    }

    /// Connector catalog from `catalog_path`, or the built-in one.
    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => Catalog::from_path(path),
            None => Catalog::builtin(),
        }
    }
}

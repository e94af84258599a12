use crate::config::ConfigError;
use std::path::{Path, PathBuf};

pub const GLOBAL_STATE_DIR: &str = ".pipewright";
pub const GLOBAL_SETTINGS_FILE_NAME: &str = "config.yaml";
pub const SESSION_FILE_NAME: &str = "session.json";
pub const LOG_DIR_NAME: &str = "logs";
pub const LOG_FILE_NAME: &str = "pipewright.log";

fn home_dir() -> Result<PathBuf, ConfigError> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or(ConfigError::HomeDirectoryUnavailable)
}

pub fn default_state_root() -> Result<PathBuf, ConfigError> {
    Ok(home_dir()?.join(GLOBAL_STATE_DIR))
}

pub fn default_global_config_path() -> Result<PathBuf, ConfigError> {
    Ok(default_state_root()?.join(GLOBAL_SETTINGS_FILE_NAME))
}

/// Files owned by one state root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    root: PathBuf,
}

impl StatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_path(&self) -> PathBuf {
        self.root.join(SESSION_FILE_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_DIR_NAME).join(LOG_FILE_NAME)
    }
}

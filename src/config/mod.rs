pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_global_settings, load_settings_from};
pub use paths::{
    default_global_config_path, default_state_root, StatePaths, GLOBAL_SETTINGS_FILE_NAME,
    GLOBAL_STATE_DIR, LOG_DIR_NAME, LOG_FILE_NAME, SESSION_FILE_NAME,
};
pub use settings::{
    IntentSettings, Settings, DEFAULT_INTENT_DEBOUNCE_MS, DEFAULT_INTENT_TIMEOUT_MS,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_home<T>(home: &Path, run: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().expect("env lock");
        let old_home = std::env::var_os("HOME");
        std::env::set_var("HOME", home);
        let result = run();
        if let Some(value) = old_home {
            std::env::set_var("HOME", value);
        } else {
            std::env::remove_var("HOME");
        }
        result
    }

    #[test]
    fn empty_settings_use_intent_defaults() {
        let settings: Settings = serde_yaml::from_str("intent: {}").expect("parse settings");
        assert_eq!(settings.intent.timeout_ms, DEFAULT_INTENT_TIMEOUT_MS);
        assert_eq!(settings.intent.debounce_ms, DEFAULT_INTENT_DEBOUNCE_MS);
        assert!(settings.intent.endpoint.is_none());
        settings.validate().expect("defaults are valid");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = serde_yaml::from_str::<Settings>("workspaces_path: /tmp\n")
            .expect_err("unknown key should fail");
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn validation_rejects_non_http_endpoint_and_zero_timeout() {
        let settings: Settings = serde_yaml::from_str(
            r#"
intent:
  endpoint: ftp://intent.local
"#,
        )
        .expect("parse settings");
        match settings.validate().expect_err("endpoint should fail") {
            ConfigError::Settings(message) => assert!(message.contains("intent.endpoint")),
            other => panic!("unexpected error: {other:?}"),
        }

        let settings: Settings = serde_yaml::from_str(
            r#"
intent:
  timeout_ms: 0
"#,
        )
        .expect("parse settings");
        match settings.validate().expect_err("timeout should fail") {
            ConfigError::Settings(message) => assert!(message.contains("timeout_ms")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validation_requires_absolute_state_root() {
        let settings: Settings =
            serde_yaml::from_str("state_root: relative/dir\n").expect("parse settings");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn state_paths_derive_session_and_log_files() {
        let paths = StatePaths::new("/tmp/pw");
        assert_eq!(paths.session_path(), PathBuf::from("/tmp/pw/session.json"));
        assert_eq!(paths.log_path(), PathBuf::from("/tmp/pw/logs/pipewright.log"));
    }

    #[test]
    fn default_global_config_path_targets_home_pipewright_config_yaml() {
        let temp = tempdir().expect("temp dir");
        let path = with_home(temp.path(), default_global_config_path)
            .expect("resolve global config path");
        assert_eq!(path, temp.path().join(".pipewright/config.yaml"));
    }

    #[test]
    fn load_global_settings_defaults_when_file_is_missing() {
        let temp = tempdir().expect("temp dir");
        let settings = with_home(temp.path(), load_global_settings).expect("load settings");
        assert_eq!(settings, Settings::default());
        let root = with_home(temp.path(), || settings.resolve_state_root()).expect("root");
        assert_eq!(root, temp.path().join(".pipewright"));
    }

    #[test]
    fn load_global_settings_reads_pipewright_config_yaml() {
        let temp = tempdir().expect("temp dir");
        let state_root = temp.path().join("state");
        fs::create_dir_all(temp.path().join(".pipewright")).expect("create config dir");
        fs::write(
            temp.path().join(".pipewright/config.yaml"),
            format!(
                r#"
state_root: {}
intent:
  endpoint: https://intent.example.com/parse
  api_key_env: PIPEWRIGHT_INTENT_KEY
  debounce_ms: 100
"#,
                state_root.display()
            ),
        )
        .expect("write global config");

        let settings = with_home(temp.path(), load_global_settings).expect("load settings");
        assert_eq!(settings.state_root.as_deref(), Some(state_root.as_path()));
        assert_eq!(settings.intent.debounce_ms, 100);
        assert_eq!(settings.intent.timeout_ms, DEFAULT_INTENT_TIMEOUT_MS);
        assert_eq!(
            settings.state_paths().expect("paths").session_path(),
            state_root.join("session.json")
        );
    }

    #[test]
    fn settings_without_catalog_path_load_builtin_catalog() {
        let catalog = Settings::default().load_catalog().expect("builtin catalog");
        assert!(catalog.connector("Shopify").is_some());
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::app::infrastructure::error::AppError;

/// What happens to a module's hotkeys on pages its constraint rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InactiveHotkeys {
    /// Keys stay claimed by the module and do nothing.
    #[default]
    Noop,
    /// Keys are released so other modules may claim them.
    Unregister,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Prefix of every settings store key
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_search_debounce")]
    pub search_debounce_ms: u64,

    #[serde(default = "default_readiness_timeout")]
    pub readiness_timeout_ms: u64,

    #[serde(default = "default_readiness_iterations")]
    pub readiness_max_iterations: u32,

    #[serde(default = "default_subscription_interval")]
    pub subscription_interval_secs: u64,

    #[serde(default)]
    pub inactive_hotkeys: InactiveHotkeys,

    /// Overrides the location of the settings store file
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    #[serde(default)]
    pub user: Option<UserInfo>,
}

fn default_namespace() -> String {
    "re621".to_string()
}

fn default_base_url() -> String {
    "https://e621.net".to_string()
}

fn default_user_agent() -> String {
    format!("re621/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    10
}

fn default_search_debounce() -> u64 {
    500
}

fn default_readiness_timeout() -> u64 {
    5_000
}

fn default_readiness_iterations() -> u32 {
    100
}

fn default_subscription_interval() -> u64 {
    60 * 60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            search_debounce_ms: default_search_debounce(),
            readiness_timeout_ms: default_readiness_timeout(),
            readiness_max_iterations: default_readiness_iterations(),
            subscription_interval_secs: default_subscription_interval(),
            inactive_hotkeys: InactiveHotkeys::default(),
            settings_path: None,
            user: None,
        }
    }
}

impl Config {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn subscription_interval(&self) -> Duration {
        Duration::from_secs(self.subscription_interval_secs)
    }

    /// Path of the JSON settings store used by the file backend
    pub fn settings_store_path(&self) -> PathBuf {
        self.settings_path.clone().unwrap_or_else(|| {
            let mut path = config_dir();
            path.push("settings.json");
            path
        })
    }

    /// Load config from disk, or fall back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::get_config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse config: {}. Using defaults.", e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Save config to disk
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Get config file path (cross-platform)
    pub fn get_config_path() -> PathBuf {
        let mut path = config_dir();
        path.push("config.toml");
        path
    }
}

fn config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("re621");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.namespace, "re621");
        assert_eq!(config.base_url, "https://e621.net");
        assert_eq!(config.search_debounce(), Duration::from_millis(500));
        assert_eq!(config.readiness_max_iterations, 100);
        assert_eq!(config.inactive_hotkeys, InactiveHotkeys::Noop);
        assert!(config.user.is_none());
    }

    #[test]
    fn test_partial_config() {
        // Old config missing newer fields
        let config: Config = toml::from_str(r#"namespace = "test""#).unwrap();
        assert_eq!(config.namespace, "test");
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.subscription_interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_inactive_hotkeys_serialization() {
        let config: Config = toml::from_str(r#"inactive_hotkeys = "unregister""#).unwrap();
        assert_eq!(config.inactive_hotkeys, InactiveHotkeys::Unregister);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            namespace: "custom".to_string(),
            user: Some(UserInfo {
                id: 42,
                name: "fox".to_string(),
            }),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_unparsable_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "namespace = [").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_settings_path_override() {
        let config = Config {
            settings_path: Some(PathBuf::from("/tmp/re621.json")),
            ..Default::default()
        };
        assert_eq!(config.settings_store_path(), PathBuf::from("/tmp/re621.json"));
    }
}

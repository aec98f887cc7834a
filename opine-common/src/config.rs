//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(config) = load_toml_config(&config_path) {
            if let Some(root_folder) = config.root_folder {
                return PathBuf::from(root_folder);
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Database file path inside the root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("opine.db")
}

/// Optional TOML configuration file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root data folder override
    pub root_folder: Option<String>,

    /// Delay before the single submission retry, milliseconds
    pub submit_retry_delay_ms: Option<u64>,
}

/// Runtime tunables for the respondent wizard service
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Delay before the single submission retry
    pub submit_retry_delay_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            submit_retry_delay_ms: 500,
        }
    }
}

impl RuntimeConfig {
    /// Build runtime config, applying TOML overrides where present
    pub fn from_toml(toml: &TomlConfig) -> Self {
        let defaults = Self::default();
        Self {
            submit_retry_delay_ms: toml
                .submit_retry_delay_ms
                .unwrap_or(defaults.submit_retry_delay_ms),
        }
    }
}

/// Load and parse the TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
}

/// Load the TOML config from the default location, or defaults if absent
pub fn load_default_toml_config() -> TomlConfig {
    find_config_file()
        .and_then(|path| load_toml_config(&path))
        .unwrap_or_default()
}

/// Get default configuration file path for the platform
fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("opine").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/opine/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("opine"))
        .unwrap_or_else(|| PathBuf::from("./opine_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_arg_takes_priority() {
        let resolved = resolve_root_folder(Some("/tmp/opine-test"), "OPINE_TEST_UNSET_VAR");
        assert_eq!(resolved, PathBuf::from("/tmp/opine-test"));
    }

    #[test]
    fn runtime_config_applies_toml_override() {
        let toml = TomlConfig {
            root_folder: None,
            submit_retry_delay_ms: Some(50),
        };
        let runtime = RuntimeConfig::from_toml(&toml);
        assert_eq!(runtime.submit_retry_delay_ms, 50);
    }

    #[test]
    fn runtime_config_defaults_without_override() {
        let runtime = RuntimeConfig::from_toml(&TomlConfig::default());
        assert_eq!(runtime.submit_retry_delay_ms, 500);
    }

    #[test]
    fn toml_config_parses_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "root_folder = \"/srv/opine\"\nsubmit_retry_delay_ms = 250\n",
        )
        .unwrap();

        let config = load_toml_config(&path).unwrap();
        assert_eq!(config.root_folder.as_deref(), Some("/srv/opine"));
        assert_eq!(config.submit_retry_delay_ms, Some(250));
    }

    #[test]
    fn malformed_config_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "root_folder = [not toml").unwrap();

        assert!(load_toml_config(&path).is_err());
    }
}

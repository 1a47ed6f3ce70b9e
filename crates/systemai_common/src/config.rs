//! SystemAI configuration
//!
//! Config file: $SYSTEMAI_CONFIG, or <config_dir>/systemai/config.toml.
//! The pipeline never reads this globally: the front-end loads it once and
//! hands `execution_policy()` and the planner settings down explicitly.

use crate::error::ConfigError;
use crate::executor::{ExecutionPolicy, FailurePolicy};
use crate::planner::{DEFAULT_MODEL, OLLAMA_GENERATE_URL};
use crate::pm::PackageManagerKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment override for the config file location
pub const CONFIG_ENV: &str = "SYSTEMAI_CONFIG";

fn default_backend() -> String {
    "ollama".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    OLLAMA_GENERATE_URL.to_string()
}

/// Persisted settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemAiConfig {
    #[serde(default)]
    pub first_run_completed: bool,

    #[serde(default)]
    pub distro_family: String,

    #[serde(default)]
    pub package_manager: PackageManagerKind,

    #[serde(default)]
    pub shell: String,

    #[serde(default)]
    pub editor: String,

    /// Show the planner's root hints when rendering plans
    #[serde(default)]
    pub allow_root_suggest: bool,

    /// Gates the "retry as root?" escalation
    #[serde(default)]
    pub allow_root_execute: bool,

    #[serde(default = "default_backend")]
    pub ai_backend: String,

    #[serde(default = "default_model")]
    pub ai_model: String,

    #[serde(default = "default_endpoint")]
    pub ai_endpoint: String,
}

impl Default for SystemAiConfig {
    fn default() -> Self {
        Self {
            first_run_completed: false,
            distro_family: String::new(),
            package_manager: PackageManagerKind::Manual,
            shell: String::new(),
            editor: String::new(),
            allow_root_suggest: false,
            allow_root_execute: false,
            ai_backend: default_backend(),
            ai_model: default_model(),
            ai_endpoint: default_endpoint(),
        }
    }
}

impl SystemAiConfig {
    /// Resolve the config file path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        dirs::config_dir()
            .map(|dir| dir.join("systemai").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default location
    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Save to the default location
    pub fn save(&mut self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Load from `path`; `Ok(None)` when the file does not exist yet
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    /// Save to `path`, marking the first run as done
    pub fn save_to(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.first_run_completed = true;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Executor policy derived from these settings
    pub fn execution_policy(&self, on_failure: FailurePolicy) -> ExecutionPolicy {
        ExecutionPolicy {
            package_manager: self.package_manager,
            allow_root_execute: self.allow_root_execute,
            on_failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SystemAiConfig::default();
        assert!(!config.first_run_completed);
        assert!(!config.allow_root_execute);
        assert_eq!(config.package_manager, PackageManagerKind::Manual);
        assert_eq!(config.ai_model, "llama3.2:3b");
        assert_eq!(config.ai_backend, "ollama");
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = SystemAiConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_marks_first_run_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = SystemAiConfig {
            distro_family: "arch".to_string(),
            package_manager: PackageManagerKind::Pacman,
            allow_root_execute: true,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert!(config.first_run_completed);

        let loaded = SystemAiConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "package_manager = \"apt\"\nallow_root_execute = true\n").unwrap();

        let loaded = SystemAiConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.package_manager, PackageManagerKind::Apt);
        assert_eq!(loaded.ai_endpoint, OLLAMA_GENERATE_URL);

        let policy = loaded.execution_policy(FailurePolicy::ContinueOnFailure);
        assert!(policy.allow_root_execute);
        assert_eq!(policy.package_manager, PackageManagerKind::Apt);
    }

    #[test]
    fn test_parse_error_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "package_manager = \"brew\"\n").unwrap();

        let err = SystemAiConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}

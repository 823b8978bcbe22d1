//! Configuration loading and persistence.

use super::Config;
use crate::env;
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when no file exists. Environment overrides are applied either way.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load_or_default(&path)
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Apply `SECRET_WALLET_SERVICE` on top of the file contents.
    pub fn apply_env_overrides(&mut self) {
        if let Some(service) = env::get_var(env::SERVICE_VAR) {
            self.service = service;
        }
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Resolve where the metadata index lives.
    pub fn metadata_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.metadata_path {
            Some(path) => Ok(paths::expand_tilde(&path.to_string_lossy())),
            None => paths::metadata_file(),
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.service.trim().is_empty() {
            errors.push("service must not be empty".to_string());
        }

        if self.inject.reuse_seconds == 0 {
            errors.push(
                "inject.reuse_seconds must be greater than 0, or every secret prompts again"
                    .to_string(),
            );
        }

        if let Some(path) = &self.metadata_path {
            if path.as_os_str().is_empty() {
                errors.push("metadata_path must not be empty when set".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default storage namespace for vault records.
pub const DEFAULT_SERVICE: &str = "dev.secret-wallet";

/// Main secret-wallet configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Namespace that every stored secret is filed under.
    #[serde(default = "default_service")]
    pub service: String,

    /// Override for the metadata index location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<PathBuf>,

    /// Biometric protection settings.
    #[serde(default)]
    pub biometric: BiometricConfig,

    /// Injection settings.
    #[serde(default)]
    pub inject: InjectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: default_service(),
            metadata_path: None,
            biometric: BiometricConfig::default(),
            inject: InjectConfig::default(),
        }
    }
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

/// Biometric protection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiometricConfig {
    /// What to do when a biometric access policy cannot be honored.
    #[serde(default)]
    pub fallback: BiometricFallback,
}

/// Behavior when biometric protection is requested but unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiometricFallback {
    /// Store the secret with standard protection and report the downgrade.
    #[default]
    Degrade,
    /// Refuse to store the secret.
    Require,
}

/// Injection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectConfig {
    /// How long one authentication may be reused across a batch, in seconds.
    #[serde(default = "default_reuse_seconds")]
    pub reuse_seconds: u64,
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            reuse_seconds: default_reuse_seconds(),
        }
    }
}

fn default_reuse_seconds() -> u64 {
    10
}

//! Error types for vault operations.

use secret_wallet_core::ConfigError;
use thiserror::Error;

use crate::backend::StorageStatus;

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Key '{0}' not found")]
    NotFound(String),

    #[error("Secret value cannot be stored: it must not contain NUL bytes")]
    EncodingFailed,

    #[error("Could not set up biometric protection")]
    AccessControlUnavailable,

    #[error("Authentication was cancelled")]
    AuthenticationCancelled,

    #[error("{0}")]
    Storage(StorageStatus),

    #[error("Metadata index is corrupted: {0}")]
    IndexCorrupted(String),

    #[error("Command exited with status {0}")]
    ChildProcessFailed(i32),

    #[error("Invalid secret name: {0}")]
    InvalidName(String),

    #[error("Invalid environment variable name: {0:?}")]
    InvalidEnvName(String),

    #[error("No command specified")]
    EmptyCommand,

    #[error("Failed to execute '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Secure storage self-test failed: value read back did not match")]
    SelfTestFailed,

    #[error("Secret '{name}' was only partly updated: {state}")]
    PartialWrite {
        name: String,
        state: &'static str,
        #[source]
        source: Box<VaultError>,
    },

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl VaultError {
    /// Whether the user dismissed an authentication prompt.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, VaultError::AuthenticationCancelled)
    }
}

/// Convenience result alias for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

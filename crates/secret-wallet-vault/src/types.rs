//! Core types for the vault.

use chrono::{DateTime, Utc};
use secret_wallet_core::SecretString;
use serde::{Deserialize, Serialize};

/// What the vault knows about a stored secret, without its value.
///
/// `name` joins the entry to its secure storage record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretMetadata {
    /// Unique secret name.
    pub name: String,

    /// Environment variable the value is injected as.
    pub env_name: String,

    /// Whether the stored record actually carries biometric protection.
    pub biometric_required: bool,

    /// Provider the secret belongs to (e.g. "openai").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl SecretMetadata {
    pub fn new(name: impl Into<String>, env_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            env_name: env_name.into(),
            biometric_required: false,
            service_tag: None,
            created_at: None,
        }
    }

    pub fn biometric(mut self, required: bool) -> Self {
        self.biometric_required = required;
        self
    }
}

/// A secret to be added to the vault.
#[derive(Debug)]
pub struct NewSecret {
    pub name: String,
    pub value: SecretString,
    /// Defaults to the provider's conventional variable, then to the name.
    pub env_name: Option<String>,
    pub biometric: bool,
    pub service_tag: Option<String>,
}

impl NewSecret {
    pub fn new(name: impl Into<String>, value: impl Into<SecretString>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            env_name: None,
            biometric: false,
            service_tag: None,
        }
    }

    pub fn env_name(mut self, env_name: impl Into<String>) -> Self {
        self.env_name = Some(env_name.into());
        self
    }

    pub fn biometric(mut self, biometric: bool) -> Self {
        self.biometric = biometric;
        self
    }

    pub fn service_tag(mut self, tag: impl Into<String>) -> Self {
        self.service_tag = Some(tag.into());
        self
    }

    /// The variable this secret will be injected as.
    pub fn resolved_env_name(&self) -> String {
        if let Some(env_name) = &self.env_name {
            return env_name.clone();
        }
        self.service_tag
            .as_deref()
            .and_then(provider_env_name)
            .map(str::to_string)
            .unwrap_or_else(|| secret_wallet_core::env::derive_var_name(&self.name))
    }
}

/// Providers with a conventional API key variable.
pub const KNOWN_PROVIDERS: &[(&str, &str)] = &[
    ("openai", "OPENAI_API_KEY"),
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("google", "GOOGLE_API_KEY"),
    ("openrouter", "OPENROUTER_API_KEY"),
];

/// Conventional environment variable for a provider tag.
pub fn provider_env_name(tag: &str) -> Option<&'static str> {
    KNOWN_PROVIDERS
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(tag))
        .map(|(_, env)| *env)
}

/// Vault status for integrations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStatus {
    pub version: String,
    pub service: String,
    pub backend: String,
    pub metadata_path: String,
    pub biometric: BiometricStatus,
    pub secrets: SecretCounts,
    pub secret_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricStatus {
    pub available: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretCounts {
    pub total: usize,
    pub biometric_protected: usize,
    pub standard: usize,
}

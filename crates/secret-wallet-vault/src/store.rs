//! Credential store.
//!
//! [`CredentialStore`] is the one place that talks to secure storage. It owns
//! the fallback rules (biometric downgrade, entitlement retry, context-less
//! retry) and keeps the metadata index in step with what is actually stored.
//!
//! `put`, `get` and `delete` touch secure storage only. `add`, `reveal` and
//! `remove` are the vault-level operations: they also maintain the index, and
//! `add` rolls the stored record back if the index cannot be written.

use std::sync::Arc;

use chrono::Utc;
use secret_wallet_core::config::BiometricFallback;
use secret_wallet_core::{env, Config, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::{self, AuthContext, Authenticator};
use crate::backend::{
    AccessControlPolicy, Accessibility, SecureStorage, StorageStatus, WriteRequest,
};
use crate::error::{Result, VaultError};
use crate::fallback::{self, Attempt, FallbackRule};
use crate::index::MetadataIndex;
use crate::types::{BiometricStatus, NewSecret, SecretCounts, SecretMetadata, VaultStatus};

/// Maximum allowed length for a secret name.
const MAX_NAME_LEN: usize = 128;

/// Name of the throwaway record written by [`CredentialStore::verify`].
const SELF_TEST_NAME: &str = "secret-wallet-selftest";

/// Outcome of a single storage write.
struct Written {
    biometric: bool,
    /// An existing record was deleted to make room.
    replaced: bool,
}

/// Secure storage plus the metadata index, with the policy that ties them.
pub struct CredentialStore {
    storage: Arc<dyn SecureStorage>,
    authenticator: Arc<dyn Authenticator>,
    index: MetadataIndex,
    service: String,
    fallback: BiometricFallback,
}

impl CredentialStore {
    /// Create a store over `storage`, filing records under `service`.
    pub fn new(
        storage: Arc<dyn SecureStorage>,
        authenticator: Arc<dyn Authenticator>,
        index: MetadataIndex,
        service: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            authenticator,
            index,
            service: service.into(),
            fallback: BiometricFallback::default(),
        }
    }

    /// Create a store from loaded configuration.
    pub fn from_config(
        config: &Config,
        storage: Arc<dyn SecureStorage>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self> {
        let index = MetadataIndex::new(config.metadata_path()?);
        Ok(Self::new(storage, authenticator, index, config.service.clone())
            .with_fallback(config.biometric.fallback))
    }

    /// Choose what happens when biometric protection cannot be applied.
    pub fn with_fallback(mut self, fallback: BiometricFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Store `value` under `name`, replacing any existing record.
    ///
    /// Returns whether biometric protection was actually applied, which can
    /// be `false` even when `require_biometric` was set: the hardware may be
    /// missing, or the binary may lack the entitlement for protected records.
    /// Persist the returned value, not the request.
    pub fn put(&self, name: &str, value: &SecretString, require_biometric: bool) -> Result<bool> {
        self.write(name, value, require_biometric)
            .map(|written| written.biometric)
    }

    fn write(&self, name: &str, value: &SecretString, require_biometric: bool) -> Result<Written> {
        validate_name(name)?;
        if value.as_bytes().contains(&0) {
            return Err(VaultError::EncodingFailed);
        }

        // No auth context here: replacing a protected record must not prompt.
        let mut replaced = false;
        let mut stale = None;
        match self.storage.delete(&self.service, name, None) {
            Ok(()) => {
                debug!(name, "removed existing record before write");
                replaced = true;
            }
            Err(StorageStatus::ItemNotFound) => {}
            Err(status) => {
                warn!(name, %status, "could not remove existing record before write");
                stale = Some(status);
            }
        }

        let access_control = if require_biometric {
            match self
                .storage
                .access_control(AccessControlPolicy::BiometryCurrentSet)
            {
                Ok(acl) => Some(acl),
                Err(status) => match self.fallback {
                    BiometricFallback::Degrade => {
                        warn!(name, %status, "biometric protection unavailable, storing with standard protection");
                        None
                    }
                    BiometricFallback::Require => {
                        debug!(name, %status, "biometric protection required but unavailable");
                        return Err(VaultError::AccessControlUnavailable);
                    }
                },
            }
        } else {
            None
        };

        let mut request = WriteRequest {
            namespace: &self.service,
            name,
            data: value.as_bytes(),
            accessibility: Accessibility::WhenUnlockedThisDeviceOnly,
            access_control,
        };
        let rule = FallbackRule::for_write(access_control.is_some(), self.fallback);

        let resolved = fallback::run(rule, |attempt| {
            if attempt == Attempt::Fallback {
                request.access_control = None;
            }
            self.storage.add(&request)
        })
        .map_err(|status| match (status, stale) {
            // The add only collided because the old record could not be removed.
            (StorageStatus::DuplicateItem, Some(cause)) => self.storage_error(name, cause),
            _ => self.storage_error(name, status),
        })?;

        if resolved.fell_back() {
            warn!(name, "binary lacks the entitlement for biometric records, stored with standard protection");
        }

        let applied = access_control.is_some() && !resolved.fell_back();
        debug!(name, biometric = applied, "secret stored");
        Ok(Written {
            biometric: applied,
            replaced,
        })
    }

    /// Read the secret called `name`.
    ///
    /// With `require_auth`, `shared` is presented to storage if given;
    /// otherwise a fresh authentication is run with `prompt` as its reason.
    /// A dismissed prompt fails before storage is touched.
    pub fn get(
        &self,
        name: &str,
        prompt: &str,
        require_auth: bool,
        shared: Option<&AuthContext>,
    ) -> Result<SecretString> {
        validate_name(name)?;
        let mut fresh = None;
        let context = self.auth_context(prompt, require_auth, shared, &mut fresh)?;

        let resolved = fallback::run(FallbackRule::for_access(require_auth), |attempt| {
            let auth = match attempt {
                Attempt::Primary => context,
                Attempt::Fallback => None,
            };
            self.storage.copy(&self.service, name, auth)
        })
        .map_err(|status| self.storage_error(name, status))?;

        if resolved.fell_back() {
            debug!(name, "record has no access control, read without auth context");
        }

        SecretString::from_utf8(resolved.value).ok_or(VaultError::Storage(StorageStatus::Decode))
    }

    /// Delete the secret called `name`. Deleting an absent secret succeeds.
    pub fn delete(
        &self,
        name: &str,
        prompt: &str,
        require_auth: bool,
        shared: Option<&AuthContext>,
    ) -> Result<()> {
        validate_name(name)?;
        let mut fresh = None;
        let context = self.auth_context(prompt, require_auth, shared, &mut fresh)?;

        fallback::run(FallbackRule::for_access(require_auth), |attempt| {
            let auth = match attempt {
                Attempt::Primary => context,
                Attempt::Fallback => None,
            };
            match self.storage.delete(&self.service, name, auth) {
                Err(StorageStatus::ItemNotFound) => Ok(()),
                other => other,
            }
        })
        .map_err(|status| self.storage_error(name, status))?;

        debug!(name, "secret deleted");
        Ok(())
    }

    /// Async form of [`CredentialStore::get`] for event-driven front ends.
    ///
    /// Authentication and the storage read run on the blocking pool; the
    /// calling task only awaits. Cancelling `cancel` while the prompt is up
    /// yields [`VaultError::AuthenticationCancelled`].
    pub async fn get_async(
        self: Arc<Self>,
        name: String,
        prompt: String,
        require_auth: bool,
        shared: Option<AuthContext>,
        cancel: CancellationToken,
    ) -> Result<SecretString> {
        let context = match (require_auth, shared) {
            (false, _) => None,
            (true, Some(ctx)) => Some(ctx),
            (true, None) => Some(
                auth::authenticate_async(
                    Arc::clone(&self.authenticator),
                    prompt.clone(),
                    AuthContext::new(),
                    cancel,
                )
                .await?,
            ),
        };

        tokio::task::spawn_blocking(move || self.get(&name, &prompt, require_auth, context.as_ref()))
            .await
            .map_err(|e| VaultError::Task(e.to_string()))?
    }

    /// Store a new secret and record it in the index.
    ///
    /// The index records the protection actually applied. If the index
    /// cannot be written, a brand-new record is removed again. A record that
    /// replaced an indexed one is kept under the old entry instead, since the
    /// previous value is already gone; the error says so.
    pub fn add(&self, secret: NewSecret) -> Result<SecretMetadata> {
        let env_name = secret.resolved_env_name();
        if !env::is_valid_var_name(&env_name) {
            return Err(VaultError::InvalidEnvName(env_name));
        }

        let previous = self.index.find(&secret.name);
        let written = self.write(&secret.name, &secret.value, secret.biometric)?;

        let metadata = SecretMetadata {
            name: secret.name,
            env_name,
            biometric_required: written.biometric,
            service_tag: secret.service_tag,
            created_at: Some(Utc::now()),
        };

        if let Err(e) = self.index.upsert(metadata.clone()) {
            return Err(self.undo_add(&metadata.name, previous.is_some(), written.replaced, e));
        }

        info!(name = %metadata.name, env = %metadata.env_name, biometric = written.biometric, "secret added");
        Ok(metadata)
    }

    fn undo_add(&self, name: &str, indexed: bool, replaced: bool, cause: VaultError) -> VaultError {
        if indexed {
            warn!(name, error = %cause, "metadata write failed, keeping new value under the old entry");
            return VaultError::PartialWrite {
                name: name.to_string(),
                state: "new value stored but its metadata was not updated",
                source: Box::new(cause),
            };
        }

        warn!(name, error = %cause, "metadata write failed, rolling back stored secret");
        if let Err(status) = self.storage.delete(&self.service, name, None) {
            warn!(name, %status, "rollback failed, record left in secure storage");
            return VaultError::PartialWrite {
                name: name.to_string(),
                state: "stored in secure storage but missing from the index",
                source: Box::new(cause),
            };
        }
        if replaced {
            return VaultError::PartialWrite {
                name: name.to_string(),
                state: "previous unindexed value was overwritten and the new one rolled back",
                source: Box::new(cause),
            };
        }
        cause
    }

    /// Read a secret, authenticating if its metadata says it is protected.
    pub fn reveal(&self, name: &str) -> Result<SecretString> {
        let require_auth = self.requires_auth(name);
        self.get(
            name,
            &format!("Authenticate to access '{name}'"),
            require_auth,
            None,
        )
    }

    /// Delete a secret and its index entry.
    pub fn remove(&self, name: &str) -> Result<()> {
        let require_auth = self.requires_auth(name);
        self.delete(
            name,
            &format!("Authenticate to delete '{name}'"),
            require_auth,
            None,
        )?;
        if let Err(e) = self.index.remove(name) {
            warn!(name, error = %e, "record deleted but metadata entry could not be removed");
            return Err(VaultError::PartialWrite {
                name: name.to_string(),
                state: "deleted from secure storage but still listed in the index",
                source: Box::new(e),
            });
        }
        info!(name, "secret removed");
        Ok(())
    }

    /// Check that secure storage works end to end with a throwaway record.
    pub fn verify(&self) -> Result<()> {
        let probe = SecretString::new(format!("init-test-{}", uuid::Uuid::new_v4()));
        self.put(SELF_TEST_NAME, &probe, false)?;
        let read = self.get(SELF_TEST_NAME, "", false, None);
        let cleanup = self.delete(SELF_TEST_NAME, "", false, None);
        let read = read?;
        cleanup?;
        if read != probe {
            return Err(VaultError::SelfTestFailed);
        }
        Ok(())
    }

    /// Summarize the vault for integrations.
    pub fn status(&self) -> VaultStatus {
        let secrets = self.index.list();
        let protected = secrets.iter().filter(|m| m.biometric_required).count();
        VaultStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            service: self.service.clone(),
            backend: self.storage.name().to_string(),
            metadata_path: self.index.path().display().to_string(),
            biometric: BiometricStatus {
                available: self.authenticator.is_available(),
                kind: self.authenticator.kind().to_string(),
            },
            secrets: SecretCounts {
                total: secrets.len(),
                biometric_protected: protected,
                standard: secrets.len() - protected,
            },
            secret_names: secrets.into_iter().map(|m| m.name).collect(),
        }
    }

    fn requires_auth(&self, name: &str) -> bool {
        self.index
            .find(name)
            .map(|m| m.biometric_required)
            .unwrap_or(false)
    }

    /// Pick the context to present: none, the caller's, or a freshly
    /// evaluated one parked in `fresh`.
    fn auth_context<'a>(
        &self,
        prompt: &str,
        require_auth: bool,
        shared: Option<&'a AuthContext>,
        fresh: &'a mut Option<AuthContext>,
    ) -> Result<Option<&'a AuthContext>> {
        if !require_auth {
            return Ok(None);
        }
        if let Some(ctx) = shared {
            return Ok(Some(ctx));
        }
        let ctx = auth::authenticate(self.authenticator.as_ref(), prompt, AuthContext::new())?;
        Ok(Some(&*fresh.insert(ctx)))
    }

    fn storage_error(&self, name: &str, status: StorageStatus) -> VaultError {
        match status {
            StorageStatus::ItemNotFound => VaultError::NotFound(name.to_string()),
            StorageStatus::UserCanceled => VaultError::AuthenticationCancelled,
            other => VaultError::Storage(other),
        }
    }
}

/// Validate a secret name: non-empty, bounded, no control characters.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VaultError::InvalidName("name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(VaultError::InvalidName(format!(
            "name exceeds maximum length of {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(VaultError::InvalidName(format!(
            "name contains control characters: {name:?}"
        )));
    }
    Ok(())
}

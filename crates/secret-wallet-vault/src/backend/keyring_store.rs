//! Platform credential store backend for Linux, Windows and the BSDs.
//!
//! Goes through the `keyring` crate (Secret Service or kernel keyutils on
//! Linux, Credential Manager on Windows). None of these can bind a record to
//! biometric enrollment, so access-control construction always fails and
//! biometric requests degrade.

use keyring::Entry;
use tracing::debug;

use super::{AccessControl, AccessControlPolicy, SecureStorage, StorageStatus, WriteRequest};
use crate::auth::AuthContext;

/// Secure storage backed by the OS credential store.
#[derive(Debug, Default)]
pub struct KeyringStorage;

impl KeyringStorage {
    pub fn new() -> Self {
        Self
    }

    fn entry(&self, namespace: &str, name: &str) -> Result<Entry, StorageStatus> {
        Entry::new(namespace, name).map_err(status)
    }
}

fn status(e: keyring::Error) -> StorageStatus {
    match e {
        keyring::Error::NoEntry => StorageStatus::ItemNotFound,
        keyring::Error::NoStorageAccess(_) => StorageStatus::InteractionNotAllowed,
        keyring::Error::PlatformFailure(_) => StorageStatus::Io,
        keyring::Error::BadEncoding(_) => StorageStatus::Decode,
        keyring::Error::TooLong(_, _) | keyring::Error::Invalid(_, _) => StorageStatus::Param,
        keyring::Error::Ambiguous(_) => StorageStatus::DuplicateItem,
        other => {
            debug!(error = %other, "unmapped keyring error");
            StorageStatus::Other(-1)
        }
    }
}

impl SecureStorage for KeyringStorage {
    fn name(&self) -> &'static str {
        "os-keyring"
    }

    fn access_control(&self, _policy: AccessControlPolicy) -> Result<AccessControl, StorageStatus> {
        Err(StorageStatus::Unimplemented)
    }

    fn add(&self, request: &WriteRequest<'_>) -> Result<(), StorageStatus> {
        if request.access_control.is_some() {
            return Err(StorageStatus::Unimplemented);
        }
        let entry = self.entry(request.namespace, request.name)?;
        // The credential store has no add-only call, so check for a
        // conflicting record first to keep add semantics.
        match entry.get_password() {
            Ok(_) => return Err(StorageStatus::DuplicateItem),
            Err(keyring::Error::NoEntry) => {}
            Err(e) => return Err(status(e)),
        }
        let value = std::str::from_utf8(request.data).map_err(|_| StorageStatus::Param)?;
        entry.set_password(value).map_err(status)
    }

    fn copy(
        &self,
        namespace: &str,
        name: &str,
        auth: Option<&AuthContext>,
    ) -> Result<Vec<u8>, StorageStatus> {
        if auth.is_some() {
            // Records here never carry access control; a context has nothing
            // to unlock.
            return Err(StorageStatus::InteractionNotAllowed);
        }
        let password = self.entry(namespace, name)?.get_password().map_err(status)?;
        Ok(password.into_bytes())
    }

    fn delete(
        &self,
        namespace: &str,
        name: &str,
        auth: Option<&AuthContext>,
    ) -> Result<(), StorageStatus> {
        if auth.is_some() {
            return Err(StorageStatus::InteractionNotAllowed);
        }
        self.entry(namespace, name)?.delete_password().map_err(status)
    }
}

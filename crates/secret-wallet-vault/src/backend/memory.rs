//! In-process secure storage.
//!
//! Behaves like the platform facility closely enough to exercise every
//! fallback path: it can lack biometric hardware, lack the entitlement for
//! protected records, and it refuses protected reads without a live
//! authentication context.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use super::{
    AccessControl, AccessControlPolicy, Accessibility, SecureStorage, StorageStatus, WriteRequest,
};
use crate::auth::AuthContext;

#[derive(Debug)]
struct Record {
    data: Vec<u8>,
    protected: bool,
}

/// Secure storage held in memory for the lifetime of the value.
///
/// The default instance has no biometric hardware, like a CI machine.
#[derive(Debug)]
pub struct MemoryStorage {
    records: Mutex<HashMap<(String, String), Record>>,
    biometrics: bool,
    entitled: bool,
    delete_failure: Option<StorageStatus>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            biometrics: false,
            entitled: true,
            delete_failure: None,
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept biometric access-control policies.
    pub fn with_biometrics(mut self) -> Self {
        self.biometrics = true;
        self
    }

    /// Act like an unsigned binary: protected writes are rejected with
    /// [`StorageStatus::MissingEntitlement`], and so is presenting an
    /// authentication context for an unprotected record.
    pub fn without_entitlement(mut self) -> Self {
        self.entitled = false;
        self
    }

    /// Refuse to delete existing records with `status`, like a locked keychain.
    pub fn refusing_deletes(mut self, status: StorageStatus) -> Self {
        self.delete_failure = Some(status);
        self
    }

    /// Whether a record exists.
    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.records.lock().contains_key(&key(namespace, name))
    }

    /// Whether a record carries an access-control policy, if it exists.
    pub fn is_protected(&self, namespace: &str, name: &str) -> Option<bool> {
        self.records
            .lock()
            .get(&key(namespace, name))
            .map(|r| r.protected)
    }

    /// Number of records across all namespaces.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn check_access(&self, record: &Record, auth: Option<&AuthContext>) -> Result<(), StorageStatus> {
        match (record.protected, auth) {
            (true, None) => Err(StorageStatus::InteractionNotAllowed),
            (true, Some(ctx)) if !ctx.permits_access() => Err(StorageStatus::AuthFailed),
            (false, Some(_)) if !self.entitled => Err(StorageStatus::MissingEntitlement),
            _ => Ok(()),
        }
    }
}

fn key(namespace: &str, name: &str) -> (String, String) {
    (namespace.to_string(), name.to_string())
}

impl SecureStorage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn access_control(&self, policy: AccessControlPolicy) -> Result<AccessControl, StorageStatus> {
        if !self.biometrics {
            return Err(StorageStatus::Unimplemented);
        }
        Ok(AccessControl::new(policy, Accessibility::WhenUnlockedThisDeviceOnly))
    }

    fn add(&self, request: &WriteRequest<'_>) -> Result<(), StorageStatus> {
        let mut records = self.records.lock();
        let k = key(request.namespace, request.name);
        if records.contains_key(&k) {
            return Err(StorageStatus::DuplicateItem);
        }
        let protected = request.access_control.is_some();
        if protected && !self.entitled {
            return Err(StorageStatus::MissingEntitlement);
        }
        debug!(name = request.name, protected, "memory storage add");
        records.insert(
            k,
            Record {
                data: request.data.to_vec(),
                protected,
            },
        );
        Ok(())
    }

    fn copy(
        &self,
        namespace: &str,
        name: &str,
        auth: Option<&AuthContext>,
    ) -> Result<Vec<u8>, StorageStatus> {
        let records = self.records.lock();
        let record = records
            .get(&key(namespace, name))
            .ok_or(StorageStatus::ItemNotFound)?;
        self.check_access(record, auth)?;
        Ok(record.data.clone())
    }

    fn delete(
        &self,
        namespace: &str,
        name: &str,
        auth: Option<&AuthContext>,
    ) -> Result<(), StorageStatus> {
        let mut records = self.records.lock();
        let k = key(namespace, name);
        let record = records.get(&k).ok_or(StorageStatus::ItemNotFound)?;
        if let Some(status) = self.delete_failure {
            return Err(status);
        }
        // Removal never needs a prompt; only a stray context can trip it up.
        if auth.is_some() && !record.protected && !self.entitled {
            return Err(StorageStatus::MissingEntitlement);
        }
        records.remove(&k);
        Ok(())
    }
}

//! Secure storage backends.
//!
//! Defines the [`SecureStorage`] contract the credential store is written
//! against, the closed [`StorageStatus`] space every backend reports in, and
//! the platform implementations:
//!
//! - [`MemoryStorage`]: in-process, used by tests and embedders
//! - `KeychainStorage` (macOS): Keychain generic passwords via Security.framework,
//!   paired with the LocalAuthentication-backed `LocalAuthenticator`
//! - `KeyringStorage` (elsewhere): the platform credential store via `keyring`

use std::fmt;
use std::sync::Arc;

use crate::auth::AuthContext;

mod memory;
pub use memory::MemoryStorage;

#[cfg(target_os = "macos")]
mod keychain;
#[cfg(target_os = "macos")]
pub use keychain::KeychainStorage;
#[cfg(target_os = "macos")]
mod local_auth;
#[cfg(target_os = "macos")]
pub use local_auth::LocalAuthenticator;

#[cfg(not(target_os = "macos"))]
mod keyring_store;
#[cfg(not(target_os = "macos"))]
pub use keyring_store::KeyringStorage;

/// Non-success outcome of a secure storage call.
///
/// Known codes get their own variant; anything else is carried raw in
/// [`StorageStatus::Other`] for diagnostics. Numeric values follow the
/// Security.framework `OSStatus` codes so every backend reports in one space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageStatus {
    ItemNotFound,
    DuplicateItem,
    AuthFailed,
    UserCanceled,
    InteractionNotAllowed,
    MissingEntitlement,
    Unimplemented,
    Io,
    Decode,
    Param,
    Other(i32),
}

impl StorageStatus {
    /// Map a raw status code. `0` (success) is not a status and maps to `Other(0)`.
    pub fn from_code(code: i32) -> Self {
        match code {
            -25300 => Self::ItemNotFound,
            -25299 => Self::DuplicateItem,
            -25293 => Self::AuthFailed,
            -128 => Self::UserCanceled,
            -25308 => Self::InteractionNotAllowed,
            -34018 => Self::MissingEntitlement,
            -4 => Self::Unimplemented,
            -61 => Self::Io,
            -26275 => Self::Decode,
            -50 => Self::Param,
            other => Self::Other(other),
        }
    }

    /// The raw status code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ItemNotFound => -25300,
            Self::DuplicateItem => -25299,
            Self::AuthFailed => -25293,
            Self::UserCanceled => -128,
            Self::InteractionNotAllowed => -25308,
            Self::MissingEntitlement => -34018,
            Self::Unimplemented => -4,
            Self::Io => -61,
            Self::Decode => -26275,
            Self::Param => -50,
            Self::Other(code) => *code,
        }
    }
}

impl fmt::Display for StorageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemNotFound => f.write_str("Key not found in secure storage"),
            Self::DuplicateItem => f.write_str("A key with this name already exists in secure storage"),
            Self::AuthFailed => {
                f.write_str("Authentication failed -- check your fingerprint or password")
            }
            Self::UserCanceled => f.write_str("Authentication was cancelled"),
            Self::InteractionNotAllowed => f.write_str("Authentication is not available right now"),
            Self::MissingEntitlement => {
                f.write_str("Binary needs code signing for biometric protection")
            }
            Self::Unimplemented => {
                f.write_str("Secure storage does not support this operation on this platform")
            }
            Self::Io => f.write_str("Secure storage database error -- try again after a restart"),
            Self::Decode => f.write_str("Stored data is corrupted"),
            Self::Param => f.write_str("Internal error: invalid secure storage parameters"),
            Self::Other(code) => write!(f, "Secure storage error (status {code})"),
        }
    }
}

impl std::error::Error for StorageStatus {}

/// When a stored record may be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accessibility {
    /// Only while the device is unlocked, never migrated off this device.
    #[default]
    WhenUnlockedThisDeviceOnly,
}

/// Authentication gate that can be attached to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessControlPolicy {
    /// Biometric check bound to the currently enrolled set; re-enrolling
    /// invalidates the record.
    BiometryCurrentSet,
}

/// A constructed access-control policy, ready to attach to a write.
///
/// Only backends hand these out, so holding one means the platform accepted
/// the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessControl {
    policy: AccessControlPolicy,
    accessibility: Accessibility,
}

impl AccessControl {
    pub(crate) fn new(policy: AccessControlPolicy, accessibility: Accessibility) -> Self {
        Self {
            policy,
            accessibility,
        }
    }

    pub fn policy(&self) -> AccessControlPolicy {
        self.policy
    }

    pub fn accessibility(&self) -> Accessibility {
        self.accessibility
    }
}

/// One add request against a backend.
#[derive(Debug, Clone)]
pub struct WriteRequest<'a> {
    pub namespace: &'a str,
    pub name: &'a str,
    pub data: &'a [u8],
    pub accessibility: Accessibility,
    pub access_control: Option<AccessControl>,
}

/// Contract for the platform secure storage facility.
///
/// Records are addressed by `(namespace, name)`. Backends do not enumerate
/// records; the metadata index is the only listing.
pub trait SecureStorage: Send + Sync {
    /// Short backend name for status reports.
    fn name(&self) -> &'static str;

    /// Construct an access-control policy for a later [`SecureStorage::add`].
    fn access_control(&self, policy: AccessControlPolicy) -> Result<AccessControl, StorageStatus>;

    /// Add a new record. Fails with [`StorageStatus::DuplicateItem`] if one exists.
    fn add(&self, request: &WriteRequest<'_>) -> Result<(), StorageStatus>;

    /// Read a record's bytes, presenting `auth` to the platform when given.
    fn copy(
        &self,
        namespace: &str,
        name: &str,
        auth: Option<&AuthContext>,
    ) -> Result<Vec<u8>, StorageStatus>;

    /// Delete a record, presenting `auth` to the platform when given.
    fn delete(
        &self,
        namespace: &str,
        name: &str,
        auth: Option<&AuthContext>,
    ) -> Result<(), StorageStatus>;
}

/// The secure storage backend for the platform this binary was built for.
pub fn platform_storage() -> Arc<dyn SecureStorage> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(KeychainStorage::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Arc::new(KeyringStorage::new())
    }
}

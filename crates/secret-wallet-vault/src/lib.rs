//! Biometric-gated credential vault.
//!
//! Secrets live in the platform's secure storage, optionally bound to the
//! current biometric enrollment. A metadata index beside them records what
//! was stored and which environment variable each secret is injected as.

pub mod auth;
pub mod backend;
pub mod error;
pub mod fallback;
pub mod index;
pub mod inject;
pub mod store;
pub mod types;

pub use auth::{AuthContext, Authenticator, BiometryKind, StaticAuthenticator};
pub use backend::{platform_storage, MemoryStorage, SecureStorage, StorageStatus};
pub use error::{Result, VaultError};
pub use index::MetadataIndex;
pub use inject::{Injection, Injector};
pub use store::CredentialStore;
pub use types::{NewSecret, SecretMetadata, VaultStatus};

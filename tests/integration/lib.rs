//! Shared fixtures for the integration tests.

use std::sync::Arc;

use secret_wallet_vault::{CredentialStore, MemoryStorage, MetadataIndex, StaticAuthenticator};
use tempfile::TempDir;

pub const SERVICE: &str = "test.secret-wallet.integration";

/// A credential store on in-memory storage with its index in a temp dir.
pub struct Vault {
    pub store: CredentialStore,
    pub storage: Arc<MemoryStorage>,
    pub auth: Arc<StaticAuthenticator>,
    pub dir: TempDir,
}

impl Vault {
    /// Storage without biometric hardware, user always confirms.
    pub fn plain() -> Self {
        Self::build(MemoryStorage::new(), StaticAuthenticator::allowing())
    }

    /// Storage and authenticator with biometric hardware.
    pub fn biometric() -> Self {
        Self::build(
            MemoryStorage::new().with_biometrics(),
            StaticAuthenticator::allowing().with_biometrics(),
        )
    }

    pub fn build(storage: MemoryStorage, auth: StaticAuthenticator) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let storage = Arc::new(storage);
        let auth = Arc::new(auth);
        let store = CredentialStore::new(
            storage.clone(),
            auth.clone(),
            MetadataIndex::new(dir.path().join("metadata.json")),
            SERVICE,
        );
        Self {
            store,
            storage,
            auth,
            dir,
        }
    }

    /// A second store over the same index, as another process would see it.
    pub fn reopen(&self, storage: MemoryStorage, auth: StaticAuthenticator) -> CredentialStore {
        CredentialStore::new(
            Arc::new(storage),
            Arc::new(auth),
            MetadataIndex::new(self.dir.path().join("metadata.json")),
            SERVICE,
        )
    }
}

/// `sh -c <script>` as an argv vector.
pub fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

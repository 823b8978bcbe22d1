//! Async read path with caller-driven cancellation.

use std::sync::Arc;
use std::time::Duration;

use secret_wallet_integration_tests::Vault;
use secret_wallet_vault::{MemoryStorage, NewSecret, StaticAuthenticator, VaultError};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_get_async_reads_protected_secret() {
    let vault = Vault::biometric();
    vault
        .store
        .add(NewSecret::new("api", "v").biometric(true))
        .unwrap();
    let auth = vault.auth.clone();
    let store = Arc::new(vault.store);

    let value = store
        .get_async(
            "api".to_string(),
            "Authenticate to access 'api'".to_string(),
            true,
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(value.expose_secret(), "v");
    assert_eq!(auth.prompts(), 1);
}

#[tokio::test]
async fn test_get_async_cancel_during_prompt() {
    let vault = Vault::build(
        MemoryStorage::new().with_biometrics(),
        StaticAuthenticator::allowing()
            .with_biometrics()
            .with_delay(Duration::from_millis(500)),
    );
    vault
        .store
        .put("api", &"v".into(), true)
        .unwrap();
    let store = Arc::new(vault.store);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = store
        .get_async("api".to_string(), "r".to_string(), true, None, cancel)
        .await;
    assert!(matches!(result, Err(VaultError::AuthenticationCancelled)));
}

//! End-to-end vault scenarios: store, index and injector together.

use secret_wallet_core::SecretString;
use secret_wallet_integration_tests::{sh, Vault};
use secret_wallet_vault::{
    Injector, MemoryStorage, NewSecret, SecretMetadata, StaticAuthenticator, VaultError,
};

#[test]
fn test_add_without_biometric_hardware_degrades() {
    let vault = Vault::plain();

    let meta = vault
        .store
        .add(
            NewSecret::new("openai-key", "sk-test-123")
                .env_name("OPENAI_API_KEY")
                .biometric(true),
        )
        .unwrap();
    assert!(!meta.biometric_required);

    let stored = vault.store.index().find("openai-key").unwrap();
    assert_eq!(stored.env_name, "OPENAI_API_KEY");
    assert!(!stored.biometric_required);

    let value = vault.store.reveal("openai-key").unwrap();
    assert_eq!(value.expose_secret(), "sk-test-123");
    assert_eq!(vault.auth.prompts(), 0);
}

#[test]
fn test_inject_passes_values_to_child() {
    let vault = Vault::plain();
    vault
        .store
        .add(NewSecret::new("a", "1").env_name("A_KEY"))
        .unwrap();
    vault
        .store
        .add(NewSecret::new("b", "2").env_name("B_KEY"))
        .unwrap();

    let code = Injector::new(&vault.store)
        .inject(&sh(r#"test "$A_KEY" = 1 && test "$B_KEY" = 2"#))
        .unwrap();
    assert_eq!(code, 0);
}

#[test]
fn test_inject_batches_protected_entries_behind_one_prompt() {
    let vault = Vault::biometric();
    for name in ["bio-1", "bio-2"] {
        vault
            .store
            .add(NewSecret::new(name, "b").biometric(true))
            .unwrap();
    }
    for name in ["plain-1", "plain-2", "plain-3"] {
        vault.store.add(NewSecret::new(name, "p")).unwrap();
    }

    let injection = Injector::new(&vault.store).resolve().unwrap();
    assert_eq!(injection.vars.len(), 5);
    assert_eq!(vault.auth.prompts(), 1);
}

#[test]
fn test_inject_cancelled_runs_nothing() {
    let vault = Vault::biometric();
    vault
        .store
        .add(NewSecret::new("bio", "b").biometric(true))
        .unwrap();

    let cancelling = vault.reopen(
        MemoryStorage::new().with_biometrics(),
        StaticAuthenticator::cancelling().with_biometrics(),
    );
    let marker = vault.dir.path().join("ran");
    let result = Injector::new(&cancelling).inject(&sh(&format!("touch '{}'", marker.display())));

    assert!(matches!(result, Err(VaultError::AuthenticationCancelled)));
    assert!(!marker.exists());
}

#[test]
fn test_inject_skips_unreadable_entry() {
    let vault = Vault::plain();
    for i in 0..4 {
        vault
            .store
            .add(NewSecret::new(format!("k{i}"), "v").env_name(format!("K{i}")))
            .unwrap();
    }
    vault
        .store
        .index()
        .upsert(SecretMetadata::new("orphan", "ORPHAN"))
        .unwrap();

    let code = Injector::new(&vault.store)
        .inject(&sh(r#"test -z "$ORPHAN" && test "$K3" = v"#))
        .unwrap();
    assert_eq!(code, 0);
}

#[test]
fn test_inject_forwards_exit_code() {
    let vault = Vault::plain();
    let result = Injector::new(&vault.store).inject(&sh("exit 42"));
    assert!(matches!(result, Err(VaultError::ChildProcessFailed(42))));
}

#[test]
fn test_remove_keeps_storage_and_index_in_step() {
    let vault = Vault::plain();
    vault.store.add(NewSecret::new("a", "1")).unwrap();
    vault.store.add(NewSecret::new("b", "2")).unwrap();

    vault.store.remove("a").unwrap();

    let names: Vec<_> = vault
        .store
        .index()
        .list()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["b"]);
    assert!(!vault.storage.contains(secret_wallet_integration_tests::SERVICE, "a"));
    assert!(matches!(
        vault.store.reveal("a"),
        Err(VaultError::NotFound(_))
    ));
}

#[test]
fn test_readd_replaces_value_and_metadata() {
    let vault = Vault::biometric();
    vault
        .store
        .add(NewSecret::new("api", "old").biometric(true))
        .unwrap();
    vault.store.add(NewSecret::new("api", "new")).unwrap();

    assert_eq!(vault.store.index().list().len(), 1);
    assert!(!vault.store.index().find("api").unwrap().biometric_required);
    assert_eq!(vault.store.reveal("api").unwrap().expose_secret(), "new");
    assert_eq!(vault.storage.len(), 1);
}

#[test]
fn test_index_survives_corruption() {
    let vault = Vault::plain();
    std::fs::write(vault.store.index().path(), b"]]not json").unwrap();

    assert!(vault.store.index().list().is_empty());
    vault.store.add(NewSecret::new("a", "1")).unwrap();
    assert_eq!(vault.store.index().list().len(), 1);
    assert!(vault.dir.path().join("metadata.json.corrupt").exists());
}

#[test]
fn test_index_file_format() {
    let vault = Vault::plain();
    vault
        .store
        .add(NewSecret::new("work", "v").service_tag("anthropic"))
        .unwrap();

    let raw = std::fs::read_to_string(vault.store.index().path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &json[0];
    assert_eq!(entry["name"], "work");
    assert_eq!(entry["envName"], "ANTHROPIC_API_KEY");
    assert_eq!(entry["biometricRequired"], false);
    assert_eq!(entry["serviceTag"], "anthropic");
    assert!(entry["createdAt"].as_str().unwrap().ends_with('Z'));
    assert!(!raw.contains("\"v\""), "index must not contain values");
}

#[test]
fn test_status_report() {
    let vault = Vault::biometric();
    vault
        .store
        .add(NewSecret::new("a", "1").biometric(true))
        .unwrap();
    vault.store.add(NewSecret::new("b", "2")).unwrap();

    let json = serde_json::to_value(vault.store.status()).unwrap();
    assert_eq!(json["secrets"]["total"], 2);
    assert_eq!(json["secrets"]["biometricProtected"], 1);
    assert_eq!(json["secrets"]["standard"], 1);
    assert_eq!(json["biometric"]["available"], true);
    assert_eq!(json["biometric"]["type"], "Touch ID");
    assert_eq!(json["secretNames"], serde_json::json!(["a", "b"]));
}

#[test]
fn test_verify_leaves_nothing_behind() {
    let vault = Vault::plain();
    vault.store.verify().unwrap();
    assert!(vault.storage.is_empty());
    assert!(vault.store.index().list().is_empty());
}

#[test]
fn test_put_rejects_nul() {
    let vault = Vault::plain();
    let result = vault
        .store
        .put("api", &SecretString::new("a\0b"), false);
    assert!(matches!(result, Err(VaultError::EncodingFailed)));
}

//! CLI command implementations.

pub mod add;
pub mod get;
pub mod init;
pub mod inject;
pub mod list;
pub mod remove;
pub mod status;

use anyhow::Context;
use secret_wallet_core::Config;
use secret_wallet_vault::{platform_storage, CredentialStore};

use crate::auth::platform_authenticator;

/// Open the credential store on the platform backend.
pub(crate) fn open_store(config: &Config) -> anyhow::Result<CredentialStore> {
    let store = CredentialStore::from_config(config, platform_storage(), platform_authenticator())
        .context("failed to open credential store")?;
    Ok(store)
}

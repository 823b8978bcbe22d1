//! `secret-wallet status`

use secret_wallet_core::Config;

use super::open_store;

/// Print vault status as pretty JSON.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    println!("{}", serde_json::to_string_pretty(&store.status())?);
    Ok(())
}

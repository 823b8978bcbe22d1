//! `secret-wallet remove`

use clap::Args;
use secret_wallet_core::Config;

use super::open_store;

/// Remove command arguments.
#[derive(Args)]
pub struct RemoveArgs {
    /// Secret name
    pub name: String,
}

/// Run the remove command.
pub async fn run(args: RemoveArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    store.remove(&args.name)?;
    println!("Secret '{}' removed.", args.name);
    Ok(())
}

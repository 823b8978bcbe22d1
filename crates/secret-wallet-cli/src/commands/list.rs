//! `secret-wallet list`

use clap::Args;
use secret_wallet_core::Config;

use super::open_store;

/// List command arguments.
#[derive(Args)]
pub struct ListArgs {
    /// Print the metadata as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the list command. Never prints secret values.
pub async fn run(args: ListArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let entries = store.index().list();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No secrets stored.");
        return Ok(());
    }

    println!("{:<32} {:<32} {:<10} CREATED", "NAME", "ENV", "BIOMETRIC");
    println!("{}", "-".repeat(96));
    for entry in &entries {
        let created = entry
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<32} {:<32} {:<10} {}",
            entry.name,
            entry.env_name,
            if entry.biometric_required { "yes" } else { "no" },
            created
        );
    }
    println!("\n{} secret(s) total.", entries.len());
    Ok(())
}

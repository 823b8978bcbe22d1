//! `secret-wallet init`

use std::path::PathBuf;

use clap::Args;
use console::{style, Emoji};
use secret_wallet_core::config::BiometricFallback;
use secret_wallet_core::{paths, Config};
use tracing::debug;

use super::open_store;
use crate::load_config;

static CHECK: Emoji = Emoji("✓", "+");
static WARN: Emoji = Emoji("⚠", "!");

/// Init command arguments.
#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration file with defaults
    #[arg(long)]
    pub force: bool,
}

/// Write a default configuration if needed, then self-test secure storage.
pub async fn run(args: InitArgs, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    println!("secret-wallet init\n");

    let path = match config_path {
        Some(path) => path.clone(),
        None => paths::config_file()?,
    };

    if args.force || !path.exists() {
        Config::default().save(&path)?;
        println!("  {} Wrote configuration: {}", style(CHECK).green(), path.display());
    } else {
        println!("  {} Configuration exists: {}", style(CHECK).green(), path.display());
    }

    let config = load_config(Some(&path))?;
    let store = open_store(&config)?;
    let status = store.status();
    debug!(backend = %status.backend, "running storage self-test");

    println!("  {} Secure storage: {}", style(CHECK).green(), status.backend);
    store.verify()?;
    println!("  {} Self-test passed", style(CHECK).green());

    if status.biometric.available {
        println!("  {} Biometrics: {}", style(CHECK).green(), status.biometric.kind);
    } else {
        let outcome = match config.biometric.fallback {
            BiometricFallback::Degrade => "stored with standard protection",
            BiometricFallback::Require => "refused",
        };
        println!(
            "  {} Biometrics unavailable; --biometric secrets will be {}",
            style(WARN).yellow(),
            outcome
        );
    }
    println!("  {} Metadata index: {}", style(CHECK).green(), status.metadata_path);

    println!("\nReady. Add a secret with 'secret-wallet add <name>'.");
    Ok(())
}

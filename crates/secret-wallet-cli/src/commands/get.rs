//! `secret-wallet get`

use std::io::Write;
use std::sync::Arc;

use clap::Args;
use secret_wallet_core::Config;
use tokio_util::sync::CancellationToken;

use super::open_store;

/// Get command arguments.
#[derive(Args)]
pub struct GetArgs {
    /// Secret name
    pub name: String,
}

/// Print the secret to stdout, without a trailing newline.
pub async fn run(args: GetArgs, config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(open_store(config)?);
    let require_auth = store
        .index()
        .find(&args.name)
        .map(|m| m.biometric_required)
        .unwrap_or(false);

    // Ctrl-C while the prompt is up cancels cleanly.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let prompt = format!("Authenticate to access '{}'", args.name);
    let value = store
        .get_async(args.name, prompt, require_auth, None, cancel)
        .await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(value.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

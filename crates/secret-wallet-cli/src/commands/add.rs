//! `secret-wallet add`

use std::io::{IsTerminal, Read};

use anyhow::Context;
use clap::Args;
use console::style;
use secret_wallet_core::{Config, SecretString};
use secret_wallet_vault::NewSecret;

use super::open_store;

/// Add command arguments.
#[derive(Args)]
pub struct AddArgs {
    /// Secret name
    pub name: String,

    /// Environment variable to inject the secret as
    #[arg(long)]
    pub env_name: Option<String>,

    /// Require biometric authentication to read the secret
    #[arg(long)]
    pub biometric: bool,

    /// Provider this key belongs to (openai, anthropic, google, openrouter)
    #[arg(long)]
    pub service: Option<String>,
}

/// Run the add command. The value comes from a hidden prompt, or from
/// stdin when it is not a terminal.
pub async fn run(args: AddArgs, config: &Config) -> anyhow::Result<()> {
    let value = read_value(&args.name)?;
    if value.is_empty() {
        anyhow::bail!("Secret value must not be empty");
    }

    let mut secret = NewSecret::new(&args.name, value).biometric(args.biometric);
    if let Some(env_name) = args.env_name {
        secret = secret.env_name(env_name);
    }
    if let Some(tag) = args.service {
        secret = secret.service_tag(tag);
    }

    let store = open_store(config)?;
    let metadata = store.add(secret)?;

    if args.biometric && !metadata.biometric_required {
        eprintln!(
            "{} biometric protection is not available here; stored with standard protection",
            style("warning:").yellow().bold()
        );
    }
    println!(
        "Secret '{}' stored as ${}{}.",
        metadata.name,
        metadata.env_name,
        if metadata.biometric_required {
            " (biometric)"
        } else {
            ""
        }
    );
    Ok(())
}

fn read_value(name: &str) -> anyhow::Result<SecretString> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        let value = rpassword::prompt_password(format!("Enter value for '{name}': "))
            .map_err(|e| anyhow::anyhow!("Failed to read secret: {}", e))?;
        return Ok(SecretString::new(value));
    }

    let mut value = String::new();
    stdin
        .lock()
        .read_to_string(&mut value)
        .context("failed to read secret from stdin")?;
    let trimmed = value.trim_end_matches(['\r', '\n']).len();
    value.truncate(trimmed);
    Ok(SecretString::new(value))
}

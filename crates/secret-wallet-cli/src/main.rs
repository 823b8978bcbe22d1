//! secret-wallet CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use console::style;
use secret_wallet_cli::{run, Cli};
use secret_wallet_vault::VaultError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so `get` output stays pipeable.
    let default_filter = match cli.verbose {
        0 => "secret_wallet=warn",
        1 => "secret_wallet=debug",
        _ => "secret_wallet=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(code) => exit_code(code),
        Err(err) => match err.downcast_ref::<VaultError>() {
            // The child already reported its own failure.
            Some(VaultError::ChildProcessFailed(code)) => exit_code(*code),
            _ => {
                eprintln!("{} {:#}", style("Error:").red().bold(), err);
                ExitCode::FAILURE
            }
        },
    }
}

fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}

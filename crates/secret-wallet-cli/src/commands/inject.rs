//! `secret-wallet inject`

use std::time::Duration;

use clap::Args;
use console::style;
use secret_wallet_core::Config;
use secret_wallet_vault::Injector;

use super::open_store;

/// Inject command arguments.
#[derive(Args)]
pub struct InjectArgs {
    /// Command to run, with its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Run the command with every stored secret in its environment.
pub async fn run(args: InjectArgs, config: &Config) -> anyhow::Result<i32> {
    let store = open_store(config)?;
    let injector = Injector::new(&store)
        .with_reuse_window(Duration::from_secs(config.inject.reuse_seconds));

    let injection = injector.resolve()?;
    for failure in &injection.failures {
        eprintln!(
            "{} could not load '{}': {}",
            style("warning:").yellow().bold(),
            failure.name,
            failure.error
        );
    }

    Ok(injector.launch(&args.command, &injection)?)
}

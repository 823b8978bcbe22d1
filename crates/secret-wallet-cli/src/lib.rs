//! secret-wallet command-line interface.

pub mod auth;
pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use secret_wallet_core::Config;

/// secret-wallet - biometric-gated secrets for your shell
#[derive(Parser)]
#[command(name = "secret-wallet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "SECRET_WALLET_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Set up configuration and check that secure storage works
    Init(commands::init::InitArgs),

    /// Store a secret (prompts for the value)
    Add(commands::add::AddArgs),

    /// Print a secret's value
    Get(commands::get::GetArgs),

    /// List stored secrets (names only)
    List(commands::list::ListArgs),

    /// Delete a secret
    Remove(commands::remove::RemoveArgs),

    /// Run a command with every secret in its environment
    Inject(commands::inject::InjectArgs),

    /// Print vault status as JSON
    Status,
}

/// Load configuration from `--config` or the default location.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_or_default(path)?,
        None => Config::load_default()?,
    };
    config.validate()?;
    Ok(config)
}

/// Run the CLI with the given arguments, returning the process exit code.
pub async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config_path = cli.config.as_ref();
    let config = || load_config(config_path);

    match cli.command {
        Commands::Init(args) => commands::init::run(args, config_path).await?,
        Commands::Add(args) => commands::add::run(args, &config()?).await?,
        Commands::Get(args) => commands::get::run(args, &config()?).await?,
        Commands::List(args) => commands::list::run(args, &config()?).await?,
        Commands::Remove(args) => commands::remove::run(args, &config()?).await?,
        Commands::Inject(args) => return commands::inject::run(args, &config()?).await,
        Commands::Status => commands::status::run(&config()?).await?,
    }
    Ok(0)
}

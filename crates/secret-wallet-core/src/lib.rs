//! # secret-wallet-core
//!
//! Shared plumbing for the secret-wallet crates:
//!
//! - **Configuration**: the json5 config file and its environment overrides
//! - **Paths**: where the config and metadata index live on disk
//! - **Secrets**: [`SecretString`], a zeroize-on-drop string that never prints

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod secret;

pub use config::Config;
pub use error::{ConfigError, Result};
pub use secret::SecretString;

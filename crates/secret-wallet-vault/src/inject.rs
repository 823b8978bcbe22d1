//! Environment injection.
//!
//! Resolves every indexed secret into an environment variable and runs a
//! command with them. Protected entries share one authentication that is
//! reusable for a short window, so a batch costs one prompt rather than one
//! per secret.

use std::collections::BTreeMap;
use std::process::{Command, ExitStatus};
use std::time::Duration;

use secret_wallet_core::{env, SecretString};
use tracing::{debug, info, warn};

use crate::auth::{self, AuthContext};
use crate::error::{Result, VaultError};
use crate::store::CredentialStore;

/// Default reuse window for the shared authentication.
pub const DEFAULT_REUSE_WINDOW: Duration = Duration::from_secs(10);

/// An index entry that could not be resolved.
#[derive(Debug)]
pub struct InjectFailure {
    pub name: String,
    pub env_name: String,
    pub error: VaultError,
}

/// Resolved variables plus the entries that were skipped.
#[derive(Debug, Default)]
pub struct Injection {
    pub vars: BTreeMap<String, SecretString>,
    pub failures: Vec<InjectFailure>,
}

impl Injection {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs commands with the vault's secrets in their environment.
pub struct Injector<'a> {
    store: &'a CredentialStore,
    reuse: Duration,
}

impl<'a> Injector<'a> {
    pub fn new(store: &'a CredentialStore) -> Self {
        Self {
            store,
            reuse: DEFAULT_REUSE_WINDOW,
        }
    }

    /// How long the shared authentication stays valid.
    pub fn with_reuse_window(mut self, window: Duration) -> Self {
        self.reuse = window;
        self
    }

    /// Resolve the whole index into environment variables.
    ///
    /// Fails only if the up-front authentication is dismissed; individual
    /// entries that cannot be read are logged and reported in
    /// [`Injection::failures`].
    pub fn resolve(&self) -> Result<Injection> {
        let entries = self.store.index().list();

        let shared = if entries.iter().any(|m| m.biometric_required) {
            let context = auth::authenticate(
                self.store.authenticator().as_ref(),
                "Authenticate to inject secrets",
                AuthContext::new().with_reuse(self.reuse),
            )?;
            Some(context)
        } else {
            None
        };

        let mut injection = Injection::default();
        for entry in entries {
            if !env::is_valid_var_name(&entry.env_name) {
                warn!(name = %entry.name, env = %entry.env_name, "skipping entry with invalid variable name");
                injection.failures.push(InjectFailure {
                    error: VaultError::InvalidEnvName(entry.env_name.clone()),
                    name: entry.name,
                    env_name: entry.env_name,
                });
                continue;
            }

            let context = if entry.biometric_required {
                shared.as_ref()
            } else {
                None
            };
            let prompt = format!("Authenticate to inject '{}'", entry.name);

            match self
                .store
                .get(&entry.name, &prompt, entry.biometric_required, context)
            {
                Ok(value) => {
                    debug!(name = %entry.name, env = %entry.env_name, "resolved secret");
                    injection.vars.insert(entry.env_name, value);
                }
                Err(error) => {
                    warn!(name = %entry.name, error = %error, "failed to load secret, skipping");
                    injection.failures.push(InjectFailure {
                        name: entry.name,
                        env_name: entry.env_name,
                        error,
                    });
                }
            }
        }

        Ok(injection)
    }

    /// Run `command` with `injection` layered over the current environment.
    ///
    /// Stdio is inherited. Returns `Ok(0)` on success; any other exit is
    /// [`VaultError::ChildProcessFailed`] carrying the child's code.
    pub fn launch(&self, command: &[String], injection: &Injection) -> Result<i32> {
        let (program, args) = command.split_first().ok_or(VaultError::EmptyCommand)?;

        info!(program = %program, vars = injection.vars.len(), "launching command");
        let status = Command::new(program)
            .args(args)
            .envs(
                injection
                    .vars
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.expose_secret())),
            )
            .status()
            .map_err(|source| VaultError::Spawn {
                program: program.clone(),
                source,
            })?;

        match exit_code(status) {
            0 => Ok(0),
            code => {
                debug!(program = %program, code, "command exited unsuccessfully");
                Err(VaultError::ChildProcessFailed(code))
            }
        }
    }

    /// Resolve, then launch. The command is not run if authentication is
    /// dismissed.
    pub fn inject(&self, command: &[String]) -> Result<i32> {
        if command.is_empty() {
            return Err(VaultError::EmptyCommand);
        }
        let injection = self.resolve()?;
        self.launch(command, &injection)
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

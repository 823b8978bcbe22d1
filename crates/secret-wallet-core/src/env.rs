//! Environment variable handling.

use std::env;

/// Overrides the base directory (`~/.secret-wallet`).
pub const HOME_VAR: &str = "SECRET_WALLET_HOME";

/// Overrides the config file location.
pub const CONFIG_VAR: &str = "SECRET_WALLET_CONFIG";

/// Overrides the storage namespace from the config file.
pub const SERVICE_VAR: &str = "SECRET_WALLET_SERVICE";

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Check that `name` can be used as an environment variable name.
///
/// Rejects empty names and names containing `=` or NUL, which the
/// process environment cannot represent.
pub fn is_valid_var_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('=') && !name.contains('\0')
}

/// Derive an environment variable name from a secret name.
///
/// `openai-key` becomes `OPENAI_KEY`; separators that shells reject in
/// variable names are mapped to `_`.
pub fn derive_var_name(secret_name: &str) -> String {
    secret_name
        .chars()
        .map(|c| match c {
            '-' | '.' | '/' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

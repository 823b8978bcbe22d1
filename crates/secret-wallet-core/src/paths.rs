//! Path resolution utilities.

use crate::env;
use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the secret-wallet base directory.
///
/// `SECRET_WALLET_HOME` wins when set, otherwise `~/.secret-wallet`.
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = env::get_var(env::HOME_VAR) {
        return Ok(expand_tilde(&dir));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".secret-wallet"))
}

/// Get the config file path (`SECRET_WALLET_CONFIG` or `<base>/config.json5`).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    if let Some(path) = env::get_var(env::CONFIG_VAR) {
        return Ok(expand_tilde(&path));
    }
    Ok(base_dir()?.join("config.json5"))
}

/// Get the metadata index path (`<base>/metadata.json`).
pub fn metadata_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("metadata.json"))
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/test");
        assert!(!expanded.to_string_lossy().contains('~'));
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn test_metadata_file_under_base() {
        let base = base_dir().unwrap();
        let meta = metadata_file().unwrap();
        assert!(meta.starts_with(&base));
        assert!(meta.ends_with("metadata.json"));
    }
}

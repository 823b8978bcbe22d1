//! Terminal confirmation as the authentication ceremony.
//!
//! Used where LocalAuthentication does not exist. On macOS the CLI uses
//! [`secret_wallet_vault::backend::LocalAuthenticator`] instead.

use std::sync::Arc;

use console::{style, Term};
use secret_wallet_vault::auth::{
    AuthContext, AuthError, AuthPolicy, Authenticator, BiometryKind,
};

/// Asks the user on the controlling terminal to confirm each access.
pub struct TerminalAuthenticator {
    term: Term,
}

impl TerminalAuthenticator {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for TerminalAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator for TerminalAuthenticator {
    fn is_available(&self) -> bool {
        false
    }

    fn kind(&self) -> BiometryKind {
        BiometryKind::None
    }

    fn evaluate(
        &self,
        _policy: AuthPolicy,
        reason: &str,
        _context: &mut AuthContext,
    ) -> Result<(), AuthError> {
        if !self.term.is_term() {
            return Err(AuthError::Unavailable(
                "no terminal to confirm access on".to_string(),
            ));
        }

        self.term
            .write_str(&format!("{} [y/N] ", style(reason).bold()))
            .map_err(|e| AuthError::Failed(e.to_string()))?;
        let answer = self
            .term
            .read_line()
            .map_err(|e| AuthError::Failed(e.to_string()))?;

        if is_yes(&answer) {
            Ok(())
        } else {
            Err(AuthError::Cancelled)
        }
    }
}

/// The authenticator the CLI uses on this platform.
pub fn platform_authenticator() -> Arc<dyn Authenticator> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(secret_wallet_vault::backend::LocalAuthenticator::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Arc::new(TerminalAuthenticator::new())
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

//! Fallback state machine for storage operations.
//!
//! Every storage call the credential store makes goes through [`run`]:
//!
//! ```text
//! Primary --ok--------------------------> Resolved(Primary)
//!    |--err, rule applies--> Fallback --ok--> Resolved(Fallback)
//!    |                          `--err-----> Failed
//!    `--err, rule does not apply--------> Failed
//! ```
//!
//! The operation closure is told which [`Attempt`] it is on and adjusts its
//! request (drop the access-control policy, drop the auth context). Which
//! failures trigger the second attempt is decided by a [`FallbackRule`].

use tracing::debug;

use crate::backend::StorageStatus;
use secret_wallet_core::config::BiometricFallback;

/// Which attempt an operation is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Primary,
    Fallback,
}

/// When a failed primary attempt earns a second try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackRule {
    /// Never retry.
    Never,
    /// Write rejected because the binary lacks the entitlement for protected
    /// records: retry without the access-control policy.
    StripAccessControl,
    /// Authenticated access rejected because the record carries no access
    /// control: retry without the auth context.
    DropAuthContext,
}

impl FallbackRule {
    /// Rule for an add. Only a write that attached access control can be
    /// downgraded, and only when the policy allows downgrades.
    pub fn for_write(access_control_attached: bool, policy: BiometricFallback) -> Self {
        match (access_control_attached, policy) {
            (true, BiometricFallback::Degrade) => FallbackRule::StripAccessControl,
            _ => FallbackRule::Never,
        }
    }

    /// Rule for a read or delete.
    pub fn for_access(require_auth: bool) -> Self {
        if require_auth {
            FallbackRule::DropAuthContext
        } else {
            FallbackRule::Never
        }
    }

    /// Whether `status` from the primary attempt moves to the fallback.
    pub fn applies(&self, status: StorageStatus) -> bool {
        match self {
            FallbackRule::Never => false,
            FallbackRule::StripAccessControl => status == StorageStatus::MissingEntitlement,
            FallbackRule::DropAuthContext => matches!(
                status,
                StorageStatus::MissingEntitlement | StorageStatus::InteractionNotAllowed
            ),
        }
    }
}

/// Successful outcome, tagged with the attempt that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub attempt: Attempt,
}

impl<T> Resolved<T> {
    pub fn fell_back(&self) -> bool {
        self.attempt == Attempt::Fallback
    }
}

enum State<T> {
    Attempting(Attempt),
    Resolved(Resolved<T>),
    Failed(StorageStatus),
}

/// Drive `op` through the primary and (if `rule` allows) fallback attempts.
pub fn run<T, F>(rule: FallbackRule, mut op: F) -> Result<Resolved<T>, StorageStatus>
where
    F: FnMut(Attempt) -> Result<T, StorageStatus>,
{
    let mut state = State::Attempting(Attempt::Primary);
    loop {
        state = match state {
            State::Attempting(attempt) => match op(attempt) {
                Ok(value) => State::Resolved(Resolved { value, attempt }),
                Err(status) if attempt == Attempt::Primary && rule.applies(status) => {
                    debug!(?rule, %status, "primary attempt rejected, falling back");
                    State::Attempting(Attempt::Fallback)
                }
                Err(status) => State::Failed(status),
            },
            State::Resolved(resolved) => return Ok(resolved),
            State::Failed(status) => return Err(status),
        };
    }
}

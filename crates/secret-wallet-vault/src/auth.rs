//! Device-owner / biometric authentication.
//!
//! An [`AuthContext`] stands for one authentication ceremony. Once evaluated
//! it can be handed to several storage calls, so a batch of reads costs the
//! user a single prompt as long as the reuse window has not run out.
//!
//! The ceremony itself is behind the [`Authenticator`] trait. Command-line
//! front ends call [`authenticate`] and block; event-driven front ends call
//! [`authenticate_async`], which runs the same ceremony on the blocking pool
//! and can be cancelled.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, VaultError};

/// Which ceremony to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Biometrics only.
    Biometrics,
    /// Biometrics, or the device owner's password when biometrics are absent.
    DeviceOwner,
}

/// Biometric hardware reported by an [`Authenticator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometryKind {
    TouchId,
    FaceId,
    OpticId,
    /// No biometrics; the device owner's password (or a confirmation) stands in.
    None,
}

impl fmt::Display for BiometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BiometryKind::TouchId => "Touch ID",
            BiometryKind::FaceId => "Face ID",
            BiometryKind::OpticId => "Optic ID",
            BiometryKind::None => "Password",
        })
    }
}

/// Why a ceremony did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The user dismissed the prompt.
    Cancelled,
    /// No way to prompt right now (no terminal, no hardware).
    Unavailable(String),
    /// The user tried and failed.
    Failed(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Cancelled => f.write_str("cancelled by user"),
            AuthError::Unavailable(reason) => write!(f, "unavailable: {reason}"),
            AuthError::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// The platform authentication facility.
pub trait Authenticator: Send + Sync {
    /// Whether biometric hardware is present and enrolled.
    fn is_available(&self) -> bool;

    /// The kind of biometry on offer.
    fn kind(&self) -> BiometryKind;

    /// Run one ceremony, blocking until the user finishes or dismisses it.
    ///
    /// Platform authenticators attach the object that proves the ceremony
    /// (see [`AuthContext::attach_platform`]) so storage can accept it
    /// without prompting again inside the reuse window.
    fn evaluate(
        &self,
        policy: AuthPolicy,
        reason: &str,
        context: &mut AuthContext,
    ) -> std::result::Result<(), AuthError>;
}

/// Platform object backing an evaluated context, such as an `LAContext`.
#[derive(Clone)]
struct PlatformHandle(Arc<dyn Any + Send + Sync>);

impl fmt::Debug for PlatformHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlatformHandle(..)")
    }
}

/// One (possibly not yet evaluated) authentication ceremony.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    reuse: Option<Duration>,
    evaluated_at: Option<Instant>,
    platform: Option<PlatformHandle>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow this authentication to be reused for `window` after it succeeds.
    pub fn with_reuse(mut self, window: Duration) -> Self {
        self.reuse = Some(window);
        self
    }

    pub fn reuse_window(&self) -> Option<Duration> {
        self.reuse
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated_at.is_some()
    }

    /// Whether storage may accept this context right now.
    ///
    /// Without a reuse window the context is good for as long as the caller
    /// holds it; with one, it lapses once the window has elapsed.
    pub fn permits_access(&self) -> bool {
        match (self.evaluated_at, self.reuse) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(at), Some(window)) => at.elapsed() <= window,
        }
    }

    /// Attach the platform object that carries this ceremony to storage.
    pub fn attach_platform<T: Any + Send + Sync>(&mut self, handle: T) {
        self.platform = Some(PlatformHandle(Arc::new(handle)));
    }

    /// The attached platform object, if it is a `T`.
    pub fn platform<T: Any>(&self) -> Option<&T> {
        self.platform.as_ref()?.0.downcast_ref::<T>()
    }

    fn mark_evaluated(&mut self) {
        self.evaluated_at = Some(Instant::now());
    }
}

/// Run a ceremony for `context`, choosing biometrics when the hardware is
/// there and the device-owner fallback otherwise.
///
/// Any failure, including the user dismissing the prompt, is reported as
/// [`VaultError::AuthenticationCancelled`].
pub fn authenticate(
    authenticator: &dyn Authenticator,
    reason: &str,
    mut context: AuthContext,
) -> Result<AuthContext> {
    let policy = if authenticator.is_available() {
        AuthPolicy::Biometrics
    } else {
        AuthPolicy::DeviceOwner
    };

    match authenticator.evaluate(policy, reason, &mut context) {
        Ok(()) => {
            debug!(?policy, reuse = ?context.reuse_window(), "authentication succeeded");
            context.mark_evaluated();
            Ok(context)
        }
        Err(e) => {
            debug!(?policy, error = %e, "authentication did not complete");
            Err(VaultError::AuthenticationCancelled)
        }
    }
}

/// Run [`authenticate`] off the calling task.
///
/// Cancelling `cancel` resolves to [`VaultError::AuthenticationCancelled`]
/// immediately; the abandoned ceremony finishes on the blocking pool and its
/// result is discarded.
pub async fn authenticate_async(
    authenticator: Arc<dyn Authenticator>,
    reason: String,
    context: AuthContext,
    cancel: CancellationToken,
) -> Result<AuthContext> {
    let ceremony =
        tokio::task::spawn_blocking(move || authenticate(authenticator.as_ref(), &reason, context));

    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("authentication cancelled by caller");
            Err(VaultError::AuthenticationCancelled)
        }
        joined = ceremony => joined.map_err(|e| VaultError::Task(e.to_string()))?,
    }
}

/// Scripted [`Authenticator`] that counts prompts.
///
/// Stands in for the platform facility where no user is present.
pub struct StaticAuthenticator {
    allow: bool,
    biometrics: bool,
    delay: Option<Duration>,
    prompts: AtomicUsize,
    reasons: Mutex<Vec<String>>,
    reuse_windows: Mutex<Vec<Option<Duration>>>,
}

impl StaticAuthenticator {
    /// Every ceremony succeeds.
    pub fn allowing() -> Self {
        Self::with_outcome(true)
    }

    /// Every ceremony is dismissed.
    pub fn cancelling() -> Self {
        Self::with_outcome(false)
    }

    fn with_outcome(allow: bool) -> Self {
        Self {
            allow,
            biometrics: false,
            delay: None,
            prompts: AtomicUsize::new(0),
            reasons: Mutex::new(Vec::new()),
            reuse_windows: Mutex::new(Vec::new()),
        }
    }

    /// Report biometric hardware as present.
    pub fn with_biometrics(mut self) -> Self {
        self.biometrics = true;
        self
    }

    /// Make each ceremony take `delay`, like a user reaching for the sensor.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of ceremonies run so far.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Reasons shown, in order.
    pub fn reasons(&self) -> Vec<String> {
        self.reasons.lock().clone()
    }

    /// Reuse window requested by each ceremony, in order.
    pub fn reuse_windows(&self) -> Vec<Option<Duration>> {
        self.reuse_windows.lock().clone()
    }
}

impl Authenticator for StaticAuthenticator {
    fn is_available(&self) -> bool {
        self.biometrics
    }

    fn kind(&self) -> BiometryKind {
        if self.biometrics {
            BiometryKind::TouchId
        } else {
            BiometryKind::None
        }
    }

    fn evaluate(
        &self,
        _policy: AuthPolicy,
        reason: &str,
        context: &mut AuthContext,
    ) -> std::result::Result<(), AuthError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.reasons.lock().push(reason.to_string());
        self.reuse_windows.lock().push(context.reuse_window());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.allow {
            Ok(())
        } else {
            Err(AuthError::Cancelled)
        }
    }
}

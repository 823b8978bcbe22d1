//! LocalAuthentication-backed [`Authenticator`] for macOS.
//!
//! Each ceremony evaluates a fresh `LAContext` and attaches it to the
//! [`AuthContext`]. The keychain backend hands that same `LAContext` to
//! Security.framework as `kSecUseAuthenticationContext`, so protected items
//! read within the reuse window do not prompt again.

use std::sync::mpsc;

use block2::RcBlock;
use objc2::rc::Retained;
use objc2::runtime::Bool;
use objc2_foundation::{NSError, NSString};
use objc2_local_authentication::{LABiometryType, LAContext, LAPolicy};
use tracing::debug;

use crate::auth::{AuthContext, AuthError, AuthPolicy, Authenticator, BiometryKind};

// LAError codes for a dismissed prompt: userCancel, systemCancel, appCancel.
const LA_ERROR_USER_CANCEL: isize = -2;
const LA_ERROR_SYSTEM_CANCEL: isize = -4;
const LA_ERROR_APP_CANCEL: isize = -9;

/// An evaluated `LAContext`, carried inside an [`AuthContext`].
pub(crate) struct LaHandle(Retained<LAContext>);

// LAContext may be messaged from any thread; it is only read after
// evaluation completes.
unsafe impl Send for LaHandle {}
unsafe impl Sync for LaHandle {}

impl LaHandle {
    pub(crate) fn as_ptr(&self) -> *const LAContext {
        Retained::as_ptr(&self.0)
    }
}

/// Touch ID / Face ID through LocalAuthentication, falling back to the
/// login password when the device has no biometrics.
#[derive(Debug, Default)]
pub struct LocalAuthenticator;

impl LocalAuthenticator {
    pub fn new() -> Self {
        Self
    }

    fn biometric_context(&self) -> Option<Retained<LAContext>> {
        let context = unsafe { LAContext::new() };
        let usable = unsafe {
            context.canEvaluatePolicy_error(LAPolicy::DeviceOwnerAuthenticationWithBiometrics)
        };
        usable.ok().map(|()| context)
    }
}

fn la_policy(policy: AuthPolicy) -> LAPolicy {
    match policy {
        AuthPolicy::Biometrics => LAPolicy::DeviceOwnerAuthenticationWithBiometrics,
        AuthPolicy::DeviceOwner => LAPolicy::DeviceOwnerAuthentication,
    }
}

impl Authenticator for LocalAuthenticator {
    fn is_available(&self) -> bool {
        self.biometric_context().is_some()
    }

    fn kind(&self) -> BiometryKind {
        let Some(context) = self.biometric_context() else {
            return BiometryKind::None;
        };
        let kind = unsafe { context.biometryType() };
        if kind == LABiometryType::TouchID {
            BiometryKind::TouchId
        } else if kind == LABiometryType::FaceID {
            BiometryKind::FaceId
        } else if kind == LABiometryType::OpticID {
            BiometryKind::OpticId
        } else {
            BiometryKind::None
        }
    }

    fn evaluate(
        &self,
        policy: AuthPolicy,
        reason: &str,
        context: &mut AuthContext,
    ) -> Result<(), AuthError> {
        let la = unsafe { LAContext::new() };
        if let Some(window) = context.reuse_window() {
            unsafe { la.setTouchIDAuthenticationAllowableReuseDuration(window.as_secs_f64()) };
        }

        let (tx, rx) = mpsc::channel::<Result<(), AuthError>>();
        let reply = RcBlock::new(move |success: Bool, error: *mut NSError| {
            let outcome = if success.as_bool() {
                Ok(())
            } else {
                // SAFETY: LocalAuthentication passes a valid NSError or nil.
                let code = unsafe { error.as_ref() }.map(|e| e.code());
                match code {
                    Some(LA_ERROR_USER_CANCEL | LA_ERROR_SYSTEM_CANCEL | LA_ERROR_APP_CANCEL) => {
                        Err(AuthError::Cancelled)
                    }
                    Some(code) => Err(AuthError::Failed(format!("LAError {code}"))),
                    None => Err(AuthError::Failed("no error reported".to_string())),
                }
            };
            let _ = tx.send(outcome);
        });

        let reason = NSString::from_str(reason);
        unsafe { la.evaluatePolicy_localizedReason_reply(la_policy(policy), &reason, &reply) };

        let outcome = rx
            .recv()
            .map_err(|_| AuthError::Failed("LocalAuthentication dropped the reply".to_string()))?;
        debug!(?policy, ok = outcome.is_ok(), "LocalAuthentication finished");
        outcome?;

        context.attach_platform(LaHandle(la));
        Ok(())
    }
}

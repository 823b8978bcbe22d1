//! macOS Keychain backend (Security.framework generic passwords).
//!
//! Items are written with an explicit `kSecAttrAccessible`, either directly
//! or through the protection of their access-control object. Reads and
//! deletes of protected items present the `LAContext` evaluated by
//! [`LocalAuthenticator`](super::LocalAuthenticator) through
//! `kSecUseAuthenticationContext`, so one ceremony covers many items.

use core_foundation::base::{CFType, CFTypeRef, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::data::CFData;
use core_foundation::dictionary::CFDictionary;
use core_foundation::string::{CFString, CFStringRef};
use core_foundation_sys::dictionary::CFDictionaryRef;
use security_framework::access_control::{ProtectionMode, SecAccessControl};
use security_framework::passwords::AccessControlOptions;
use tracing::debug;

use super::local_auth::LaHandle;
use super::{
    AccessControl, AccessControlPolicy, Accessibility, SecureStorage, StorageStatus, WriteRequest,
};
use crate::auth::AuthContext;

type OSStatus = i32;

#[link(name = "Security", kind = "framework")]
extern "C" {
    static kSecClass: CFStringRef;
    static kSecClassGenericPassword: CFStringRef;
    static kSecAttrService: CFStringRef;
    static kSecAttrAccount: CFStringRef;
    static kSecAttrAccessible: CFStringRef;
    static kSecAttrAccessibleWhenUnlockedThisDeviceOnly: CFStringRef;
    static kSecAttrAccessControl: CFStringRef;
    static kSecValueData: CFStringRef;
    static kSecReturnData: CFStringRef;
    static kSecUseAuthenticationContext: CFStringRef;

    fn SecItemAdd(attributes: CFDictionaryRef, result: *mut CFTypeRef) -> OSStatus;
    fn SecItemCopyMatching(query: CFDictionaryRef, result: *mut CFTypeRef) -> OSStatus;
    fn SecItemDelete(query: CFDictionaryRef) -> OSStatus;
}

/// Keychain-backed secure storage.
#[derive(Debug, Default)]
pub struct KeychainStorage;

impl KeychainStorage {
    pub fn new() -> Self {
        Self
    }
}

fn key(constant: CFStringRef) -> CFString {
    // SAFETY: Security.framework constants are valid for the process lifetime.
    unsafe { CFString::wrap_under_get_rule(constant) }
}

fn check(code: OSStatus) -> Result<(), StorageStatus> {
    if code == 0 {
        Ok(())
    } else {
        Err(StorageStatus::from_code(code))
    }
}

fn flags(policy: AccessControlPolicy) -> AccessControlOptions {
    match policy {
        AccessControlPolicy::BiometryCurrentSet => AccessControlOptions::BIOMETRY_CURRENT_SET,
    }
}

fn protection(accessibility: Accessibility) -> ProtectionMode {
    match accessibility {
        Accessibility::WhenUnlockedThisDeviceOnly => {
            ProtectionMode::AccessibleWhenUnlockedThisDeviceOnly
        }
    }
}

fn accessible_value(accessibility: Accessibility) -> CFString {
    match accessibility {
        Accessibility::WhenUnlockedThisDeviceOnly => {
            key(unsafe { kSecAttrAccessibleWhenUnlockedThisDeviceOnly })
        }
    }
}

fn create_access_control(
    policy: AccessControlPolicy,
    accessibility: Accessibility,
) -> Result<SecAccessControl, StorageStatus> {
    SecAccessControl::create_with_protection(Some(protection(accessibility)), flags(policy).bits())
        .map_err(|e| StorageStatus::from_code(e.code()))
}

/// Attribute pairs shared by every query: class, service and account.
fn item_query(namespace: &str, name: &str) -> Vec<(CFString, CFType)> {
    unsafe {
        vec![
            (key(kSecClass), key(kSecClassGenericPassword).as_CFType()),
            (key(kSecAttrService), CFString::new(namespace).as_CFType()),
            (key(kSecAttrAccount), CFString::new(name).as_CFType()),
        ]
    }
}

/// Add `kSecUseAuthenticationContext` when the ceremony left an `LAContext`.
fn with_auth(
    mut pairs: Vec<(CFString, CFType)>,
    auth: Option<&AuthContext>,
) -> Vec<(CFString, CFType)> {
    if let Some(handle) = auth.and_then(|ctx| ctx.platform::<LaHandle>()) {
        // SAFETY: the handle retains the LAContext for the lifetime of `auth`,
        // and the dictionary takes its own retain.
        let la = unsafe { CFType::wrap_under_get_rule(handle.as_ptr() as CFTypeRef) };
        pairs.push((key(unsafe { kSecUseAuthenticationContext }), la));
    }
    pairs
}

fn add_attributes(request: &WriteRequest<'_>) -> Result<Vec<(CFString, CFType)>, StorageStatus> {
    let mut pairs = item_query(request.namespace, request.name);
    pairs.push((
        key(unsafe { kSecValueData }),
        CFData::from_buffer(request.data).as_CFType(),
    ));
    match &request.access_control {
        // The access-control object carries the accessibility itself;
        // Security.framework rejects an add that sets both.
        Some(acl) => {
            let access = create_access_control(acl.policy(), acl.accessibility())?;
            pairs.push((key(unsafe { kSecAttrAccessControl }), access.as_CFType()));
        }
        None => {
            pairs.push((
                key(unsafe { kSecAttrAccessible }),
                accessible_value(request.accessibility).as_CFType(),
            ));
        }
    }
    Ok(pairs)
}

impl SecureStorage for KeychainStorage {
    fn name(&self) -> &'static str {
        "macos-keychain"
    }

    fn access_control(&self, policy: AccessControlPolicy) -> Result<AccessControl, StorageStatus> {
        let accessibility = Accessibility::WhenUnlockedThisDeviceOnly;
        create_access_control(policy, accessibility)?;
        Ok(AccessControl::new(policy, accessibility))
    }

    fn add(&self, request: &WriteRequest<'_>) -> Result<(), StorageStatus> {
        let attributes = CFDictionary::from_CFType_pairs(&add_attributes(request)?);
        debug!(
            name = request.name,
            protected = request.access_control.is_some(),
            accessibility = ?request.accessibility,
            "keychain add"
        );
        check(unsafe { SecItemAdd(attributes.as_concrete_TypeRef(), std::ptr::null_mut()) })
    }

    fn copy(
        &self,
        namespace: &str,
        name: &str,
        auth: Option<&AuthContext>,
    ) -> Result<Vec<u8>, StorageStatus> {
        if let Some(ctx) = auth {
            if !ctx.permits_access() {
                return Err(StorageStatus::AuthFailed);
            }
        }
        let mut pairs = with_auth(item_query(namespace, name), auth);
        pairs.push((
            key(unsafe { kSecReturnData }),
            CFBoolean::true_value().as_CFType(),
        ));
        let query = CFDictionary::from_CFType_pairs(&pairs);

        let mut result: CFTypeRef = std::ptr::null();
        check(unsafe { SecItemCopyMatching(query.as_concrete_TypeRef(), &mut result) })?;
        if result.is_null() {
            return Err(StorageStatus::Decode);
        }
        // SAFETY: copy-matching with kSecReturnData returns an owned CFData.
        let data = unsafe { CFType::wrap_under_create_rule(result) };
        data.downcast_into::<CFData>()
            .map(|data| data.bytes().to_vec())
            .ok_or(StorageStatus::Decode)
    }

    fn delete(
        &self,
        namespace: &str,
        name: &str,
        auth: Option<&AuthContext>,
    ) -> Result<(), StorageStatus> {
        let query = CFDictionary::from_CFType_pairs(&with_auth(item_query(namespace, name), auth));
        check(unsafe { SecItemDelete(query.as_concrete_TypeRef()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_key(pairs: &[(CFString, CFType)], constant: CFStringRef) -> bool {
        let wanted = key(constant);
        pairs.iter().any(|(k, _)| *k == wanted)
    }

    #[test]
    fn test_plain_add_sets_accessibility() {
        let request = WriteRequest {
            namespace: "test.secret-wallet",
            name: "plain",
            data: b"v",
            accessibility: Accessibility::WhenUnlockedThisDeviceOnly,
            access_control: None,
        };
        let pairs = add_attributes(&request).unwrap();
        unsafe {
            assert!(has_key(&pairs, kSecAttrAccessible));
            assert!(!has_key(&pairs, kSecAttrAccessControl));
        }
    }

    #[test]
    fn test_protected_add_carries_access_control_only() {
        let storage = KeychainStorage::new();
        let Ok(acl) = storage.access_control(AccessControlPolicy::BiometryCurrentSet) else {
            return;
        };
        assert_eq!(acl.accessibility(), Accessibility::WhenUnlockedThisDeviceOnly);
        let request = WriteRequest {
            namespace: "test.secret-wallet",
            name: "protected",
            data: b"v",
            accessibility: Accessibility::WhenUnlockedThisDeviceOnly,
            access_control: Some(acl),
        };
        let pairs = add_attributes(&request).unwrap();
        unsafe {
            assert!(has_key(&pairs, kSecAttrAccessControl));
            assert!(!has_key(&pairs, kSecAttrAccessible));
        }
    }

    #[test]
    fn test_query_omits_context_without_ceremony() {
        let pairs = with_auth(item_query("ns", "a"), Some(&AuthContext::new()));
        assert!(!has_key(&pairs, unsafe { kSecUseAuthenticationContext }));
        assert_eq!(pairs.len(), 3);
    }
}

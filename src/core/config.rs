/*!
Registry configuration.

This module selects which built-in key types and wrappers a [`Registry`]
is populated with, and whether it is restricted to FIPS compatible key
managers.
*/

use tracing::debug;

use crate::core::{
    crypto::{
        AeadWrapper, ChaCha20Poly1305KeyManager, Dilithium3PrivateKeyManager, Dilithium3PublicKeyManager,
        HmacSha256KeyManager, MacWrapper, PublicKeySignWrapper, PublicKeyVerifyWrapper,
    },
    error::{Error, Result},
    registry::{KeyTypeManager, Registry, allowed_in_fips_mode},
};

/// Which primitive families to register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// ChaCha20-Poly1305 and the AEAD wrapper
    pub aead: bool,
    /// HMAC-SHA256 and the MAC wrapper
    pub mac: bool,
    /// Dilithium3 and both signature wrappers
    pub signature: bool,
    /// Whether the registered key types may create new keys
    pub new_key_allowed: bool,
    /// Restrict the registry to FIPS compatible key managers first
    pub fips_only: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            aead: true,
            mac: true,
            signature: true,
            new_key_allowed: true,
            fips_only: false,
        }
    }
}

impl RegistryConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// All families, restricted to FIPS compatible key managers.
    ///
    /// Key managers that need a validated backend are skipped when none is
    /// available; the wrappers are registered regardless.
    pub fn fips_only() -> Self {
        Self {
            fips_only: true,
            ..Self::default()
        }
    }

    /// Signature keys only, usable with existing keys but not for new ones
    pub fn verify_only() -> Self {
        Self {
            aead: false,
            mac: false,
            signature: true,
            new_key_allowed: false,
            fips_only: false,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.aead || self.mac || self.signature) {
            return Err(Error::invalid_argument("configuration enables no primitive family"));
        }
        Ok(())
    }

    /// Populate `registry` according to this configuration
    pub fn apply(&self, registry: &Registry) -> Result<()> {
        self.validate()?;
        if self.fips_only {
            registry.restrict_to_fips_if_empty()?;
        }
        if self.aead {
            register_aead_with(registry, self.new_key_allowed)?;
        }
        if self.mac {
            register_mac_with(registry, self.new_key_allowed)?;
        }
        if self.signature {
            register_signature_with(registry, self.new_key_allowed)?;
        }
        Ok(())
    }
}

/// Whether `manager` may go into `registry` in its current mode
fn eligible(registry: &Registry, manager: &dyn KeyTypeManager) -> bool {
    if !registry.is_fips_mode_enabled() || allowed_in_fips_mode(manager.fips_status()) {
        return true;
    }
    debug!(key_type = manager.key_type(), "skipping key manager in FIPS-only mode");
    false
}

fn register_aead_with(registry: &Registry, new_key_allowed: bool) -> Result<()> {
    registry.register_primitive_wrapper(AeadWrapper)?;
    if eligible(registry, &ChaCha20Poly1305KeyManager) {
        registry.register_key_type_manager(ChaCha20Poly1305KeyManager, new_key_allowed)?;
    }
    Ok(())
}

fn register_mac_with(registry: &Registry, new_key_allowed: bool) -> Result<()> {
    registry.register_primitive_wrapper(MacWrapper)?;
    if eligible(registry, &HmacSha256KeyManager) {
        registry.register_key_type_manager(HmacSha256KeyManager, new_key_allowed)?;
    }
    Ok(())
}

fn register_signature_with(registry: &Registry, new_key_allowed: bool) -> Result<()> {
    registry.register_primitive_wrapper(PublicKeySignWrapper)?;
    registry.register_primitive_wrapper(PublicKeyVerifyWrapper)?;
    if eligible(registry, &Dilithium3PrivateKeyManager) && eligible(registry, &Dilithium3PublicKeyManager) {
        registry.register_asymmetric_key_managers(
            Dilithium3PrivateKeyManager,
            Dilithium3PublicKeyManager,
            new_key_allowed,
        )?;
    }
    Ok(())
}

/// Register the AEAD wrapper and, where allowed, the ChaCha20-Poly1305 key type
pub fn register_aead(registry: &Registry) -> Result<()> {
    register_aead_with(registry, true)
}

/// Register the MAC wrapper and, where allowed, the HMAC-SHA256 key type
pub fn register_mac(registry: &Registry) -> Result<()> {
    register_mac_with(registry, true)
}

/// Register both signature wrappers and, where allowed, the Dilithium3 key pair
pub fn register_signature(registry: &Registry) -> Result<()> {
    register_signature_with(registry, true)
}

/// Register every built-in family
pub fn register_all(registry: &Registry) -> Result<()> {
    RegistryConfig::default().apply(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::type_urls;
    use crate::core::crypto::{Aead, Mac, PublicKeySign, PublicKeyVerify};
    use crate::core::error::ErrorKind;
    use crate::core::registry::fips_mode_compiled_in;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert!(config.aead && config.mac && config.signature);
        assert!(config.new_key_allowed);
        assert!(!config.fips_only);
        assert!(config.validate().is_ok());
        assert!(RegistryConfig::fips_only().fips_only);
    }

    #[test]
    fn test_empty_config_is_rejected() {
        let config = RegistryConfig {
            aead: false,
            mac: false,
            signature: false,
            ..RegistryConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidArgument);

        let registry = Registry::new();
        assert!(config.apply(&registry).is_err());
        assert!(registry.registered_key_types().is_empty());
    }

    #[test]
    fn test_register_all() {
        if fips_mode_compiled_in() {
            return;
        }
        let registry = Registry::new();
        register_all(&registry).unwrap();
        assert_eq!(
            registry.registered_key_types(),
            vec![
                type_urls::CHACHA20_POLY1305.to_string(),
                type_urls::DILITHIUM_PRIVATE.to_string(),
                type_urls::DILITHIUM_PUBLIC.to_string(),
                type_urls::HMAC_SHA256.to_string(),
            ]
        );
        assert!(registry.legacy_wrapper::<dyn Aead>().is_ok());
        assert!(registry.legacy_wrapper::<dyn Mac>().is_ok());
        assert!(registry.keyset_wrapper::<dyn PublicKeySign>().is_ok());
        assert!(registry.keyset_wrapper::<dyn PublicKeyVerify>().is_ok());

        // Registering again is a no-op
        register_all(&registry).unwrap();
        register_signature(&registry).unwrap();
    }

    #[test]
    fn test_verify_only_disallows_new_keys() {
        if fips_mode_compiled_in() {
            return;
        }
        let registry = Registry::new();
        RegistryConfig::verify_only().apply(&registry).unwrap();
        let entry = registry.key_type_entry(type_urls::DILITHIUM_PRIVATE).unwrap();
        assert!(!entry.new_key_allowed());
        assert!(registry.key_type_entry(type_urls::HMAC_SHA256).is_err());
    }

    #[test]
    fn test_fips_only_skips_non_compliant_managers() {
        let registry = Registry::new();
        RegistryConfig::fips_only().apply(&registry).unwrap();
        assert!(registry.is_fips_mode_enabled());

        // ChaCha20-Poly1305 and Dilithium3 are never FIPS compatible
        assert!(registry.key_type_entry(type_urls::CHACHA20_POLY1305).is_err());
        assert!(registry.key_type_entry(type_urls::DILITHIUM_PRIVATE).is_err());
        assert_eq!(
            registry.key_type_entry(type_urls::HMAC_SHA256).is_ok(),
            allowed_in_fips_mode(HmacSha256KeyManager.fips_status())
        );
        assert!(registry.legacy_wrapper::<dyn Aead>().is_ok());
    }

    #[test]
    fn test_fips_only_requires_empty_registry() {
        if fips_mode_compiled_in() {
            return;
        }
        let registry = Registry::new();
        register_aead(&registry).unwrap();
        let err = RegistryConfig::fips_only().apply(&registry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}

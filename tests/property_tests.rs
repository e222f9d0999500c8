use std::collections::BTreeSet;

use pqc_registry::{
    KeyData, KeyMaterialType, KeyTypeManager, OutputPrefixType, Registry, register_aead, register_mac,
    register_signature,
    core::keyset::output_prefix,
    core::registry::fips_mode_compiled_in,
    crypto::{Aead, ChaCha20Poly1305KeyManager, HmacSha256KeyManager, Mac, hmac_sha256_template},
    type_urls,
};

use proptest::prelude::*;

// Strategy for generating output prefix types
fn prefix_types() -> impl Strategy<Value = OutputPrefixType> {
    prop_oneof![
        Just(OutputPrefixType::Tink),
        Just(OutputPrefixType::Legacy),
        Just(OutputPrefixType::Raw),
        Just(OutputPrefixType::Crunchy),
    ]
}

// Strategy for generating small data buffers
fn small_data() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

// Strategy for generating registration orders
fn registration_steps() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..3, 1..12)
}

proptest! {
    #[test]
    fn test_output_prefix_layout(prefix_type in prefix_types(), key_id in any::<u32>()) {
        let prefix = output_prefix(prefix_type, key_id);
        match prefix_type {
            OutputPrefixType::Raw => prop_assert!(prefix.is_empty()),
            OutputPrefixType::Tink => {
                prop_assert_eq!(prefix[0], 0x01);
                prop_assert_eq!(&prefix[1..], &key_id.to_be_bytes()[..]);
            }
            OutputPrefixType::Legacy | OutputPrefixType::Crunchy => {
                prop_assert_eq!(prefix[0], 0x00);
                prop_assert_eq!(&prefix[1..], &key_id.to_be_bytes()[..]);
            }
        }
    }

    #[test]
    fn test_arbitrary_keys_are_rejected_without_panic(bytes in small_data()) {
        // Anything but a well-formed key must fail validation
        let chacha_ok = ChaCha20Poly1305KeyManager.validate_key(&bytes).is_ok();
        prop_assert!(!chacha_ok || bytes.len() == 1 + 4 + 32);
        let hmac_ok = HmacSha256KeyManager.validate_key(&bytes).is_ok();
        prop_assert!(!hmac_ok || bytes.len() >= 1 + 4 + 4 + 16);
    }

    #[test]
    fn test_registration_is_order_independent(steps in registration_steps()) {
        if fips_mode_compiled_in() {
            return Ok(());
        }
        let registry = Registry::new();
        let mut expected = BTreeSet::new();
        for step in steps {
            match step {
                0 => {
                    register_aead(&registry).unwrap();
                    expected.insert(type_urls::CHACHA20_POLY1305.to_string());
                }
                1 => {
                    register_mac(&registry).unwrap();
                    expected.insert(type_urls::HMAC_SHA256.to_string());
                }
                _ => {
                    register_signature(&registry).unwrap();
                    expected.insert(type_urls::DILITHIUM_PRIVATE.to_string());
                    expected.insert(type_urls::DILITHIUM_PUBLIC.to_string());
                }
            }
        }
        let registered: Vec<String> = expected.into_iter().collect();
        prop_assert_eq!(registry.registered_key_types(), registered);
    }

    #[test]
    fn test_wrapped_mac_detects_tampering(data in small_data(), flip in any::<prop::sample::Index>()) {
        if fips_mode_compiled_in() {
            return Ok(());
        }
        let registry = Registry::new();
        register_mac(&registry).unwrap();
        let key_data = registry.new_key_data(&hmac_sha256_template()).unwrap();
        let mac = registry.primitive::<dyn Mac>(&key_data).unwrap();

        let mut tag = mac.compute_mac(&data).unwrap();
        prop_assert!(mac.verify_mac(&tag, &data).is_ok());
        let index = flip.index(tag.len());
        tag[index] ^= 0x01;
        prop_assert!(mac.verify_mac(&tag, &data).is_err());
    }

    #[test]
    fn test_foreign_key_data_never_builds_a_primitive(value in small_data()) {
        if fips_mode_compiled_in() {
            return Ok(());
        }
        let registry = Registry::new();
        register_aead(&registry).unwrap();
        let key_data = KeyData::new(type_urls::CHACHA20_POLY1305, value.clone(), KeyMaterialType::Symmetric);
        let built = registry.primitive::<dyn Aead>(&key_data);
        prop_assert!(built.is_err() || value.len() == 1 + 4 + 32);
    }
}

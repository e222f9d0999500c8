//! Managers, primitives and wrappers shared by the registry unit tests.

use std::io::Read;

use crate::core::{
    error::{CryptoError, Error, Result},
    keyset::{KeyData, KeyMaterialType, KeyStatus, Keyset, KeysetKey, OutputPrefixType},
    primitive_set::PrimitiveSet,
    registry::{
        fips::FipsCompatibility,
        manager::{KeyFactory, KeyManager, KeyTypeManager, PrimitiveFactories, PrivateKeyTypeManager},
        monitoring::ApiMonitor,
        wrapper::PrimitiveWrapper,
    },
};

pub(crate) const TAGGER_TYPE: &str = "type.A";
pub(crate) const MULTI_TYPE: &str = "type.Multi";
pub(crate) const SIGNER_TYPE: &str = "type.Priv";
pub(crate) const VERIFIER_TYPE: &str = "type.Pub";
pub(crate) const LEGACY_TYPE: &str = "type.Legacy";
pub(crate) const FIPS_TYPE: &str = "type.Fips";

pub(crate) trait Tagger: Send + Sync {
    fn tag(&self, data: &[u8]) -> Vec<u8>;
}

pub(crate) trait Sealer: Send + Sync {
    fn seal(&self, data: &[u8]) -> Vec<u8>;
}

pub(crate) trait Signer: Send + Sync {
    fn sign(&self, data: &[u8]) -> Vec<u8>;
}

pub(crate) trait Verifier: Send + Sync {
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()>;
}

/// Signs with every key of a keyset
pub(crate) trait BatchSigner: Send + Sync {
    fn sign_all(&self, data: &[u8]) -> Vec<Vec<u8>>;
}

/// `key || data`
struct Prepend(Vec<u8>);

impl Tagger for Prepend {
    fn tag(&self, data: &[u8]) -> Vec<u8> {
        [self.0.as_slice(), data].concat()
    }
}

impl Signer for Prepend {
    fn sign(&self, data: &[u8]) -> Vec<u8> {
        [self.0.as_slice(), data].concat()
    }
}

impl Verifier for Prepend {
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()> {
        if signature == [self.0.as_slice(), data].concat().as_slice() {
            Ok(())
        } else {
            Err(CryptoError::SignatureVerificationFailed.into())
        }
    }
}

/// `data || key`
struct Append(Vec<u8>);

impl Sealer for Append {
    fn seal(&self, data: &[u8]) -> Vec<u8> {
        [data, self.0.as_slice()].concat()
    }
}

fn non_empty(serialized_key: &[u8]) -> Result<()> {
    if serialized_key.is_empty() {
        return Err(Error::invalid_argument("empty key"));
    }
    Ok(())
}

/// Key formats are a single length byte
fn key_length(serialized_key_format: &[u8]) -> Result<usize> {
    match serialized_key_format {
        [len] if *len > 0 => Ok(*len as usize),
        _ => Err(Error::invalid_argument("malformed key format")),
    }
}

fn tagger_primitives() -> PrimitiveFactories {
    PrimitiveFactories::new().with::<dyn Tagger>(|key| Ok(Box::new(Prepend(key.to_vec()))))
}

macro_rules! tagger_manager {
    ($name:ident) => {
        #[derive(Default)]
        pub(crate) struct $name;

        impl KeyTypeManager for $name {
            fn key_type(&self) -> &str {
                TAGGER_TYPE
            }

            fn key_material_type(&self) -> KeyMaterialType {
                KeyMaterialType::Symmetric
            }

            fn validate_key(&self, serialized_key: &[u8]) -> Result<()> {
                non_empty(serialized_key)
            }

            fn validate_key_format(&self, serialized_key_format: &[u8]) -> Result<()> {
                key_length(serialized_key_format).map(|_| ())
            }

            fn create_key(&self, serialized_key_format: &[u8]) -> Result<Vec<u8>> {
                Ok(vec![0x42; key_length(serialized_key_format)?])
            }

            fn supports_key_derivation(&self) -> bool {
                true
            }

            fn derive_key(&self, serialized_key_format: &[u8], randomness: &mut dyn Read) -> Result<Vec<u8>> {
                let mut key = vec![0u8; key_length(serialized_key_format)?];
                randomness.read_exact(&mut key)?;
                Ok(key)
            }

            fn primitives(&self) -> PrimitiveFactories {
                tagger_primitives()
            }
        }
    };
}

tagger_manager!(TaggerManagerA);
tagger_manager!(TaggerManagerB);

/// Symmetric key type backing two primitives
pub(crate) struct MultiManager;

impl KeyTypeManager for MultiManager {
    fn key_type(&self) -> &str {
        MULTI_TYPE
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn validate_key(&self, serialized_key: &[u8]) -> Result<()> {
        non_empty(serialized_key)
    }

    fn validate_key_format(&self, serialized_key_format: &[u8]) -> Result<()> {
        key_length(serialized_key_format).map(|_| ())
    }

    fn create_key(&self, serialized_key_format: &[u8]) -> Result<Vec<u8>> {
        Ok(vec![0x24; key_length(serialized_key_format)?])
    }

    fn primitives(&self) -> PrimitiveFactories {
        PrimitiveFactories::new()
            .with::<dyn Tagger>(|key| Ok(Box::new(Prepend(key.to_vec()))))
            .with::<dyn Sealer>(|key| Ok(Box::new(Append(key.to_vec()))))
    }
}

/// Claims a type URL it does not support
pub(crate) struct ConfusedManager;

impl KeyTypeManager for ConfusedManager {
    fn key_type(&self) -> &str {
        "type.Confused"
    }

    fn does_support(&self, _type_url: &str) -> bool {
        false
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn validate_key(&self, serialized_key: &[u8]) -> Result<()> {
        non_empty(serialized_key)
    }

    fn validate_key_format(&self, _serialized_key_format: &[u8]) -> Result<()> {
        Ok(())
    }

    fn create_key(&self, _serialized_key_format: &[u8]) -> Result<Vec<u8>> {
        Ok(vec![1])
    }

    fn primitives(&self) -> PrimitiveFactories {
        tagger_primitives()
    }
}

/// FIPS compatible tagger
pub(crate) struct CompliantTaggerManager;

impl KeyTypeManager for CompliantTaggerManager {
    fn key_type(&self) -> &str {
        FIPS_TYPE
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn fips_status(&self) -> FipsCompatibility {
        FipsCompatibility::Compatible
    }

    fn validate_key(&self, serialized_key: &[u8]) -> Result<()> {
        non_empty(serialized_key)
    }

    fn validate_key_format(&self, serialized_key_format: &[u8]) -> Result<()> {
        key_length(serialized_key_format).map(|_| ())
    }

    fn create_key(&self, serialized_key_format: &[u8]) -> Result<Vec<u8>> {
        Ok(vec![0x66; key_length(serialized_key_format)?])
    }

    fn primitives(&self) -> PrimitiveFactories {
        tagger_primitives()
    }
}

fn flip(key: &[u8]) -> Vec<u8> {
    key.iter().map(|byte| byte ^ 0xFF).collect()
}

/// Private key type; the public key is the bitwise complement
pub(crate) struct SignerManager;

impl KeyTypeManager for SignerManager {
    fn key_type(&self) -> &str {
        SIGNER_TYPE
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPrivate
    }

    fn validate_key(&self, serialized_key: &[u8]) -> Result<()> {
        non_empty(serialized_key)
    }

    fn validate_key_format(&self, serialized_key_format: &[u8]) -> Result<()> {
        key_length(serialized_key_format).map(|_| ())
    }

    fn create_key(&self, serialized_key_format: &[u8]) -> Result<Vec<u8>> {
        Ok(vec![0x11; key_length(serialized_key_format)?])
    }

    fn primitives(&self) -> PrimitiveFactories {
        PrimitiveFactories::new().with::<dyn Signer>(|key| Ok(Box::new(Prepend(flip(key)))))
    }
}

impl PrivateKeyTypeManager for SignerManager {
    fn public_key(&self, serialized_private_key: &[u8]) -> Result<Vec<u8>> {
        Ok(flip(serialized_private_key))
    }
}

macro_rules! verifier_manager {
    ($name:ident) => {
        pub(crate) struct $name;

        impl KeyTypeManager for $name {
            fn key_type(&self) -> &str {
                VERIFIER_TYPE
            }

            fn key_material_type(&self) -> KeyMaterialType {
                KeyMaterialType::AsymmetricPublic
            }

            fn validate_key(&self, serialized_key: &[u8]) -> Result<()> {
                non_empty(serialized_key)
            }

            fn validate_key_format(&self, _serialized_key_format: &[u8]) -> Result<()> {
                Err(Error::unimplemented("public keys are derived from private keys"))
            }

            fn create_key(&self, _serialized_key_format: &[u8]) -> Result<Vec<u8>> {
                Err(Error::unimplemented("public keys are derived from private keys"))
            }

            fn primitives(&self) -> PrimitiveFactories {
                PrimitiveFactories::new().with::<dyn Verifier>(|key| Ok(Box::new(Prepend(key.to_vec()))))
            }
        }
    };
}

verifier_manager!(VerifierManagerA);
verifier_manager!(VerifierManagerB);

struct LegacyTaggerFactory;

impl KeyFactory for LegacyTaggerFactory {
    fn new_key_data(&self, serialized_key_format: &[u8]) -> Result<KeyData> {
        Ok(KeyData::new(
            LEGACY_TYPE,
            vec![0x33; key_length(serialized_key_format)?],
            KeyMaterialType::Symmetric,
        ))
    }
}

/// Single-primitive manager implemented directly
pub(crate) struct LegacyTaggerManager;

impl KeyManager<dyn Tagger> for LegacyTaggerManager {
    fn primitive(&self, key_data: &KeyData) -> Result<Box<dyn Tagger>> {
        if key_data.type_url() != LEGACY_TYPE {
            return Err(Error::invalid_argument("wrong key type"));
        }
        non_empty(key_data.value())?;
        Ok(Box::new(Prepend(key_data.value().to_vec())))
    }

    fn key_type(&self) -> &str {
        LEGACY_TYPE
    }

    fn key_factory(&self) -> &dyn KeyFactory {
        &LegacyTaggerFactory
    }
}

/// Tags with the primary key and prefixes its output prefix
pub(crate) struct WrappedTagger {
    primitives: PrimitiveSet<dyn Tagger>,
    monitor: ApiMonitor,
}

impl Tagger for WrappedTagger {
    fn tag(&self, data: &[u8]) -> Vec<u8> {
        let Some(primary) = self.primitives.primary() else {
            self.monitor.log_failure();
            return Vec::new();
        };
        self.monitor.log(primary.key_id(), data.len());
        [primary.identifier(), primary.primitive().tag(data).as_slice()].concat()
    }
}

pub(crate) struct TaggerWrapper;

impl PrimitiveWrapper for TaggerWrapper {
    type Input = dyn Tagger;
    type Output = dyn Tagger;

    fn wrap(&self, primitive_set: PrimitiveSet<dyn Tagger>) -> Result<Box<dyn Tagger>> {
        let monitor = ApiMonitor::for_api(&primitive_set, "tagger", "tag")?;
        Ok(Box::new(WrappedTagger {
            primitives: primitive_set,
            monitor,
        }))
    }
}

/// Same output type as [`TaggerWrapper`], different implementation
pub(crate) struct OtherTaggerWrapper;

impl PrimitiveWrapper for OtherTaggerWrapper {
    type Input = dyn Tagger;
    type Output = dyn Tagger;

    fn wrap(&self, primitive_set: PrimitiveSet<dyn Tagger>) -> Result<Box<dyn Tagger>> {
        Ok(Box::new(WrappedTagger {
            primitives: primitive_set,
            monitor: ApiMonitor::default(),
        }))
    }
}

struct AllSigners(PrimitiveSet<dyn Signer>);

impl BatchSigner for AllSigners {
    fn sign_all(&self, data: &[u8]) -> Vec<Vec<u8>> {
        self.0
            .entries()
            .iter()
            .map(|entry| [entry.identifier(), entry.primitive().sign(data).as_slice()].concat())
            .collect()
    }
}

/// Wraps `Signer` primitives into a different output type
pub(crate) struct BatchSignerWrapper;

impl PrimitiveWrapper for BatchSignerWrapper {
    type Input = dyn Signer;
    type Output = dyn BatchSigner;

    fn wrap(&self, primitive_set: PrimitiveSet<dyn Signer>) -> Result<Box<dyn BatchSigner>> {
        Ok(Box::new(AllSigners(primitive_set)))
    }
}

pub(crate) fn tagger_key_data(value: &[u8]) -> KeyData {
    KeyData::new(TAGGER_TYPE, value.to_vec(), KeyMaterialType::Symmetric)
}

/// Keyset of TINK-prefixed keys, the first one primary
pub(crate) fn keyset_of(keys: Vec<(u32, KeyData)>) -> Keyset {
    let primary = keys.first().map(|(id, _)| *id).unwrap_or_default();
    let keys = keys
        .into_iter()
        .map(|(id, data)| KeysetKey::new(data, id, KeyStatus::Enabled, OutputPrefixType::Tink))
        .collect();
    Keyset::new(primary, keys)
}

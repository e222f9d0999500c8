/*!
CRYSTALS-Dilithium3 key types and the signature wrappers.

Dilithium3 is an asymmetric key type, so it comes as a pair of managers:
[`Dilithium3PrivateKeyManager`] builds [`PublicKeySign`] primitives and
extracts public keys, [`Dilithium3PublicKeyManager`] builds
[`PublicKeyVerify`] primitives. Register them together with
`Registry::register_asymmetric_key_managers`.
*/

use pqcrypto_dilithium::dilithium3::{
    self, DetachedSignature as Dilithium3Signature, PublicKey as Dilithium3PublicKey,
    SecretKey as Dilithium3SecretKey,
};
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};
use zeroize::Zeroizing;

use crate::core::{
    constants::{sizes, type_urls},
    crypto::{
        encoding::{KeyReader, KeyWriter},
        primitives::{PublicKeySign, PublicKeyVerify},
    },
    error::{CryptoError, Error, Result},
    keyset::{KeyMaterialType, KeyTemplate, OutputPrefixType},
    primitive_set::PrimitiveSet,
    registry::{ApiMonitor, KeyTypeManager, PrimitiveFactories, PrimitiveWrapper, PrivateKeyTypeManager},
};
use crate::crypto_err;

/// Signs with a Dilithium3 secret key
pub struct Dilithium3Signer {
    secret_key: Dilithium3SecretKey,
}

impl Dilithium3Signer {
    pub fn new(secret_key: &[u8]) -> Result<Self> {
        let secret_key = Dilithium3SecretKey::from_bytes(secret_key)
            .map_err(|_e| Error::Crypto(CryptoError::InvalidKeyFormat))?;
        Ok(Self { secret_key })
    }
}

impl PublicKeySign for Dilithium3Signer {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signature = dilithium3::detached_sign(data, &self.secret_key);
        Ok(signature.as_bytes().to_vec())
    }
}

/// Verifies Dilithium3 signatures
pub struct Dilithium3Verifier {
    public_key: Dilithium3PublicKey,
}

impl Dilithium3Verifier {
    pub fn new(public_key: &[u8]) -> Result<Self> {
        let public_key = Dilithium3PublicKey::from_bytes(public_key)
            .map_err(|_e| Error::Crypto(CryptoError::InvalidKeyFormat))?;
        Ok(Self { public_key })
    }
}

impl PublicKeyVerify for Dilithium3Verifier {
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()> {
        if signature.len() != dilithium3::signature_bytes() {
            return crypto_err!(CryptoError::SignatureVerificationFailed);
        }
        let signature = Dilithium3Signature::from_bytes(signature)
            .map_err(|_e| Error::Crypto(CryptoError::SignatureVerificationFailed))?;
        dilithium3::verify_detached_signature(&signature, data, &self.public_key)
            .map_err(|_e| Error::Crypto(CryptoError::SignatureVerificationFailed))
    }
}

/// Parsed private key: `(public, secret)`
fn parse_private_key(serialized_key: &[u8]) -> Result<(&[u8], &[u8])> {
    let mut reader = KeyReader::new(serialized_key)?;
    let public = reader.field()?;
    let secret = reader.field()?;
    reader.finish()?;
    if public.len() != dilithium3::public_key_bytes() || secret.len() != dilithium3::secret_key_bytes() {
        return crypto_err!(CryptoError::InvalidKeyFormat);
    }
    Ok((public, secret))
}

fn parse_public_key(serialized_key: &[u8]) -> Result<&[u8]> {
    let mut reader = KeyReader::new(serialized_key)?;
    let public = reader.field()?;
    reader.finish()?;
    if public.len() != dilithium3::public_key_bytes() {
        return crypto_err!(CryptoError::InvalidKeyFormat);
    }
    Ok(public)
}

fn check_empty_format(serialized_key_format: &[u8]) -> Result<()> {
    if !serialized_key_format.is_empty() {
        return Err(Error::invalid_argument("Dilithium3 key format must be empty"));
    }
    Ok(())
}

/// Key manager for [`type_urls::DILITHIUM_PRIVATE`]
pub struct Dilithium3PrivateKeyManager;

impl KeyTypeManager for Dilithium3PrivateKeyManager {
    fn key_type(&self) -> &str {
        type_urls::DILITHIUM_PRIVATE
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPrivate
    }

    fn validate_key(&self, serialized_key: &[u8]) -> Result<()> {
        parse_private_key(serialized_key).map(|_| ())
    }

    fn validate_key_format(&self, serialized_key_format: &[u8]) -> Result<()> {
        check_empty_format(serialized_key_format)
    }

    fn create_key(&self, _serialized_key_format: &[u8]) -> Result<Vec<u8>> {
        let (public_key, secret_key) = dilithium3::keypair();
        let secret = Zeroizing::new(secret_key.as_bytes().to_vec());
        Ok(KeyWriter::new().field(public_key.as_bytes()).field(&secret).finish())
    }

    fn primitives(&self) -> PrimitiveFactories {
        PrimitiveFactories::new().with::<dyn PublicKeySign>(|serialized_key| {
            let (_, secret) = parse_private_key(serialized_key)?;
            Ok(Box::new(Dilithium3Signer::new(secret)?))
        })
    }
}

impl PrivateKeyTypeManager for Dilithium3PrivateKeyManager {
    fn public_key(&self, serialized_private_key: &[u8]) -> Result<Vec<u8>> {
        let (public, _) = parse_private_key(serialized_private_key)?;
        Ok(KeyWriter::new().field(public).finish())
    }
}

/// Key manager for [`type_urls::DILITHIUM_PUBLIC`].
///
/// Public keys are only ever extracted from private keys, never created.
pub struct Dilithium3PublicKeyManager;

impl KeyTypeManager for Dilithium3PublicKeyManager {
    fn key_type(&self) -> &str {
        type_urls::DILITHIUM_PUBLIC
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPublic
    }

    fn validate_key(&self, serialized_key: &[u8]) -> Result<()> {
        parse_public_key(serialized_key).map(|_| ())
    }

    fn validate_key_format(&self, _serialized_key_format: &[u8]) -> Result<()> {
        Err(Error::unimplemented("Dilithium3 public keys are derived from private keys"))
    }

    fn create_key(&self, _serialized_key_format: &[u8]) -> Result<Vec<u8>> {
        Err(Error::unimplemented("Dilithium3 public keys are derived from private keys"))
    }

    fn primitives(&self) -> PrimitiveFactories {
        PrimitiveFactories::new().with::<dyn PublicKeyVerify>(|serialized_key| {
            Ok(Box::new(Dilithium3Verifier::new(parse_public_key(serialized_key)?)?))
        })
    }
}

/// Template for TINK-prefixed Dilithium3 key pairs
pub fn dilithium3_key_template() -> KeyTemplate {
    KeyTemplate::new(type_urls::DILITHIUM_PRIVATE, Vec::new(), OutputPrefixType::Tink)
}

/// Template for Dilithium3 key pairs without output prefix
pub fn raw_dilithium3_key_template() -> KeyTemplate {
    KeyTemplate::new(type_urls::DILITHIUM_PRIVATE, Vec::new(), OutputPrefixType::Raw)
}

/// LEGACY keys sign `data || 0x00`
fn formatted_input(prefix_type: OutputPrefixType, data: &[u8]) -> Vec<u8> {
    let mut input = data.to_vec();
    if prefix_type == OutputPrefixType::Legacy {
        input.push(0x00);
    }
    input
}

/// Combines the signers of a private keyset
pub struct PublicKeySignWrapper;

impl PrimitiveWrapper for PublicKeySignWrapper {
    type Input = dyn PublicKeySign;
    type Output = dyn PublicKeySign;

    fn wrap(&self, primitive_set: PrimitiveSet<dyn PublicKeySign>) -> Result<Box<dyn PublicKeySign>> {
        if primitive_set.primary().is_none() {
            return Err(Error::invalid_argument("PublicKeySign primitive set has no primary"));
        }
        Ok(Box::new(SignerSet {
            monitor: ApiMonitor::for_api(&primitive_set, "public_key_sign", "sign")?,
            primitives: primitive_set,
        }))
    }
}

struct SignerSet {
    primitives: PrimitiveSet<dyn PublicKeySign>,
    monitor: ApiMonitor,
}

impl PublicKeySign for SignerSet {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let Some(primary) = self.primitives.primary() else {
            self.monitor.log_failure();
            return Err(Error::failed_precondition("PublicKeySign primitive set has no primary"));
        };
        let input = formatted_input(primary.output_prefix_type(), data);
        match primary.primitive().sign(&input) {
            Ok(signature) => {
                self.monitor.log(primary.key_id(), data.len());
                Ok([primary.identifier(), signature.as_slice()].concat())
            }
            Err(err) => {
                self.monitor.log_failure();
                Err(err)
            }
        }
    }
}

/// Combines the verifiers of a public keyset. No primary is required.
pub struct PublicKeyVerifyWrapper;

impl PrimitiveWrapper for PublicKeyVerifyWrapper {
    type Input = dyn PublicKeyVerify;
    type Output = dyn PublicKeyVerify;

    fn wrap(&self, primitive_set: PrimitiveSet<dyn PublicKeyVerify>) -> Result<Box<dyn PublicKeyVerify>> {
        Ok(Box::new(VerifierSet {
            monitor: ApiMonitor::for_api(&primitive_set, "public_key_verify", "verify")?,
            primitives: primitive_set,
        }))
    }
}

struct VerifierSet {
    primitives: PrimitiveSet<dyn PublicKeyVerify>,
    monitor: ApiMonitor,
}

impl PublicKeyVerify for VerifierSet {
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()> {
        let prefix_size = sizes::prefix::NON_RAW_PREFIX_SIZE;
        if signature.len() > prefix_size {
            let (prefix, body) = signature.split_at(prefix_size);
            for entry in self.primitives.entries_with_prefix(prefix) {
                let input = formatted_input(entry.output_prefix_type(), data);
                if entry.primitive().verify(body, &input).is_ok() {
                    self.monitor.log(entry.key_id(), data.len());
                    return Ok(());
                }
            }
        }

        for entry in self.primitives.raw_entries() {
            if entry.primitive().verify(signature, data).is_ok() {
                self.monitor.log(entry.key_id(), data.len());
                return Ok(());
            }
        }

        self.monitor.log_failure();
        crypto_err!(CryptoError::SignatureVerificationFailed)
    }
}

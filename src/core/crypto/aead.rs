/*!
ChaCha20-Poly1305 AEAD key type and the AEAD wrapper.

Ciphertexts produced by a single key are `nonce || ciphertext || tag`
with a random 96-bit nonce. The wrapper prefixes the output prefix of the
primary key and, on decryption, tries every key whose prefix matches
before falling back to RAW keys.
*/

use std::io::Read;

use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead as _, KeyInit, Payload},
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::core::{
    constants::{sizes, type_urls},
    crypto::{
        encoding::{KeyReader, KeyWriter},
        primitives::Aead,
    },
    error::{CryptoError, Error, Result},
    keyset::{KeyMaterialType, KeyTemplate, OutputPrefixType},
    primitive_set::PrimitiveSet,
    registry::{ApiMonitor, KeyTypeManager, PrimitiveFactories, PrimitiveWrapper},
};
use crate::crypto_err;

/// ChaCha20-Poly1305 with a random nonce per message
pub struct ChaCha20Poly1305Cipher {
    /// The ChaCha20-Poly1305 cipher instance
    cipher: ChaCha20Poly1305,
}

impl ChaCha20Poly1305Cipher {
    /// Create a new cipher from a raw 256-bit key
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != sizes::chacha::KEY_SIZE {
            return crypto_err!(CryptoError::InvalidKeyFormat);
        }
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        })
    }
}

impl Aead for ChaCha20Poly1305Cipher {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; sizes::chacha::NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad: associated_data })
            .map_err(|_e| Error::Crypto(CryptoError::EncryptionFailed))?;

        let mut out = Vec::with_capacity(nonce.len() + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < sizes::chacha::NONCE_SIZE + sizes::chacha::TAG_SIZE {
            return crypto_err!(CryptoError::DecryptionFailed);
        }
        let (nonce, sealed) = ciphertext.split_at(sizes::chacha::NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad: associated_data })
            .map_err(|_e| Error::Crypto(CryptoError::DecryptionFailed))
    }
}

fn serialize_key(key: &[u8]) -> Vec<u8> {
    KeyWriter::new().field(key).finish()
}

fn parse_key(serialized_key: &[u8]) -> Result<&[u8]> {
    let mut reader = KeyReader::new(serialized_key)?;
    let key = reader.field()?;
    reader.finish()?;
    if key.len() != sizes::chacha::KEY_SIZE {
        return crypto_err!(CryptoError::InvalidKeyFormat);
    }
    Ok(key)
}

/// Key manager for [`type_urls::CHACHA20_POLY1305`]. The key format is empty.
pub struct ChaCha20Poly1305KeyManager;

impl KeyTypeManager for ChaCha20Poly1305KeyManager {
    fn key_type(&self) -> &str {
        type_urls::CHACHA20_POLY1305
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn validate_key(&self, serialized_key: &[u8]) -> Result<()> {
        parse_key(serialized_key).map(|_| ())
    }

    fn validate_key_format(&self, serialized_key_format: &[u8]) -> Result<()> {
        if !serialized_key_format.is_empty() {
            return Err(Error::invalid_argument("ChaCha20-Poly1305 key format must be empty"));
        }
        Ok(())
    }

    fn create_key(&self, _serialized_key_format: &[u8]) -> Result<Vec<u8>> {
        let mut key = Zeroizing::new([0u8; sizes::chacha::KEY_SIZE]);
        rand::rng().fill_bytes(key.as_mut());
        Ok(serialize_key(key.as_ref()))
    }

    fn supports_key_derivation(&self) -> bool {
        true
    }

    fn derive_key(&self, _serialized_key_format: &[u8], randomness: &mut dyn Read) -> Result<Vec<u8>> {
        let mut key = Zeroizing::new([0u8; sizes::chacha::KEY_SIZE]);
        randomness
            .read_exact(key.as_mut())
            .map_err(|_e| Error::Crypto(CryptoError::KeyDerivationFailed))?;
        Ok(serialize_key(key.as_ref()))
    }

    fn primitives(&self) -> PrimitiveFactories {
        PrimitiveFactories::new().with::<dyn Aead>(|serialized_key| {
            Ok(Box::new(ChaCha20Poly1305Cipher::new(parse_key(serialized_key)?)?))
        })
    }
}

/// Template for TINK-prefixed ChaCha20-Poly1305 keys
pub fn chacha20_poly1305_key_template() -> KeyTemplate {
    KeyTemplate::new(type_urls::CHACHA20_POLY1305, Vec::new(), OutputPrefixType::Tink)
}

/// Template for ChaCha20-Poly1305 keys without output prefix
pub fn raw_chacha20_poly1305_key_template() -> KeyTemplate {
    KeyTemplate::new(type_urls::CHACHA20_POLY1305, Vec::new(), OutputPrefixType::Raw)
}

/// Combines the AEAD primitives of a keyset
pub struct AeadWrapper;

impl PrimitiveWrapper for AeadWrapper {
    type Input = dyn Aead;
    type Output = dyn Aead;

    fn wrap(&self, primitive_set: PrimitiveSet<dyn Aead>) -> Result<Box<dyn Aead>> {
        if primitive_set.primary().is_none() {
            return Err(Error::invalid_argument("AEAD primitive set has no primary"));
        }
        Ok(Box::new(AeadSet {
            encrypt_monitor: ApiMonitor::for_api(&primitive_set, "aead", "encrypt")?,
            decrypt_monitor: ApiMonitor::for_api(&primitive_set, "aead", "decrypt")?,
            primitives: primitive_set,
        }))
    }
}

struct AeadSet {
    primitives: PrimitiveSet<dyn Aead>,
    encrypt_monitor: ApiMonitor,
    decrypt_monitor: ApiMonitor,
}

impl Aead for AeadSet {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let Some(primary) = self.primitives.primary() else {
            self.encrypt_monitor.log_failure();
            return Err(Error::failed_precondition("AEAD primitive set has no primary"));
        };
        match primary.primitive().encrypt(plaintext, associated_data) {
            Ok(ciphertext) => {
                self.encrypt_monitor.log(primary.key_id(), plaintext.len());
                Ok([primary.identifier(), ciphertext.as_slice()].concat())
            }
            Err(err) => {
                self.encrypt_monitor.log_failure();
                Err(err)
            }
        }
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let prefix_size = sizes::prefix::NON_RAW_PREFIX_SIZE;
        if ciphertext.len() > prefix_size {
            let (prefix, body) = ciphertext.split_at(prefix_size);
            for entry in self.primitives.entries_with_prefix(prefix) {
                if let Ok(plaintext) = entry.primitive().decrypt(body, associated_data) {
                    self.decrypt_monitor.log(entry.key_id(), body.len());
                    return Ok(plaintext);
                }
            }
        }

        for entry in self.primitives.raw_entries() {
            if let Ok(plaintext) = entry.primitive().decrypt(ciphertext, associated_data) {
                self.decrypt_monitor.log(entry.key_id(), ciphertext.len());
                return Ok(plaintext);
            }
        }

        self.decrypt_monitor.log_failure();
        crypto_err!(CryptoError::DecryptionFailed)
    }
}

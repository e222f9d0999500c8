/*!
HMAC-SHA256 key type and the MAC wrapper.

The key format is eight bytes: the key size and the tag size, both
big-endian `u32`. Keys hold between [`sizes::hmac::MIN_KEY_SIZE`] and
[`sizes::hmac::MAX_KEY_SIZE`] bytes. Tags may be truncated down to
[`sizes::hmac::MIN_TAG_SIZE`] bytes.
*/

use std::io::Read;

use byteorder::{BigEndian, ByteOrder};
use hmac::{Hmac, Mac as _};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::core::{
    constants::{sizes, type_urls},
    crypto::{
        encoding::{KeyReader, KeyWriter},
        primitives::Mac,
    },
    error::{CryptoError, Error, Result},
    keyset::{KeyMaterialType, KeyTemplate, OutputPrefixType},
    primitive_set::PrimitiveSet,
    registry::{ApiMonitor, FipsCompatibility, KeyTypeManager, PrimitiveFactories, PrimitiveWrapper},
};
use crate::{crypto_err, status_err};

type HmacSha256Inner = Hmac<Sha256>;

/// HMAC-SHA256 with a truncated tag
pub struct HmacSha256 {
    key: Zeroizing<Vec<u8>>,
    tag_size: usize,
}

impl HmacSha256 {
    pub fn new(key: &[u8], tag_size: usize) -> Result<Self> {
        check_sizes(key.len(), tag_size)?;
        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
            tag_size,
        })
    }

    fn full_tag(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha256Inner::new_from_slice(&self.key)
            .map_err(|_e| Error::internal("HMAC initialization failed"))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl Mac for HmacSha256 {
    fn compute_mac(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut tag = self.full_tag(data)?;
        tag.truncate(self.tag_size);
        Ok(tag)
    }

    fn verify_mac(&self, mac: &[u8], data: &[u8]) -> Result<()> {
        if mac.len() != self.tag_size {
            return crypto_err!(CryptoError::InvalidMac);
        }
        let expected = self.compute_mac(data)?;
        if bool::from(expected.ct_eq(mac)) {
            Ok(())
        } else {
            crypto_err!(CryptoError::InvalidMac)
        }
    }
}

fn check_sizes(key_size: usize, tag_size: usize) -> Result<()> {
    if !(sizes::hmac::MIN_KEY_SIZE..=sizes::hmac::MAX_KEY_SIZE).contains(&key_size) {
        return status_err!(
            InvalidArgument,
            "HMAC key size must be between {} and {} bytes, got {}",
            sizes::hmac::MIN_KEY_SIZE,
            sizes::hmac::MAX_KEY_SIZE,
            key_size
        );
    }
    if !(sizes::hmac::MIN_TAG_SIZE..=sizes::hmac::MAX_TAG_SIZE).contains(&tag_size) {
        return status_err!(
            InvalidArgument,
            "HMAC-SHA256 tag size must be between {} and {}, got {}",
            sizes::hmac::MIN_TAG_SIZE,
            sizes::hmac::MAX_TAG_SIZE,
            tag_size
        );
    }
    Ok(())
}

/// Serialize an HMAC key format
pub fn hmac_key_format(key_size: u32, tag_size: u32) -> Vec<u8> {
    let mut format = vec![0u8; 8];
    BigEndian::write_u32(&mut format[..4], key_size);
    BigEndian::write_u32(&mut format[4..], tag_size);
    format
}

/// Returns `(key_size, tag_size)`
fn parse_key_format(serialized_key_format: &[u8]) -> Result<(usize, usize)> {
    if serialized_key_format.len() != 8 {
        return Err(Error::invalid_argument("HMAC key format must be 8 bytes"));
    }
    let key_size = BigEndian::read_u32(&serialized_key_format[..4]) as usize;
    let tag_size = BigEndian::read_u32(&serialized_key_format[4..]) as usize;
    check_sizes(key_size, tag_size)?;
    Ok((key_size, tag_size))
}

fn serialize_key(tag_size: usize, key: &[u8]) -> Vec<u8> {
    KeyWriter::new().param(tag_size as u32).field(key).finish()
}

fn parse_key(serialized_key: &[u8]) -> Result<HmacSha256> {
    let mut reader = KeyReader::new(serialized_key)?;
    let tag_size = reader.param()? as usize;
    let key = reader.field()?;
    reader.finish()?;
    HmacSha256::new(key, tag_size)
}

/// Key manager for [`type_urls::HMAC_SHA256`]
pub struct HmacSha256KeyManager;

impl KeyTypeManager for HmacSha256KeyManager {
    fn key_type(&self) -> &str {
        type_urls::HMAC_SHA256
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn fips_status(&self) -> FipsCompatibility {
        FipsCompatibility::RequiresValidatedBackend
    }

    fn validate_key(&self, serialized_key: &[u8]) -> Result<()> {
        parse_key(serialized_key).map(|_| ())
    }

    fn validate_key_format(&self, serialized_key_format: &[u8]) -> Result<()> {
        parse_key_format(serialized_key_format).map(|_| ())
    }

    fn create_key(&self, serialized_key_format: &[u8]) -> Result<Vec<u8>> {
        let (key_size, tag_size) = parse_key_format(serialized_key_format)?;
        let mut key = Zeroizing::new(vec![0u8; key_size]);
        rand::rng().fill_bytes(key.as_mut_slice());
        Ok(serialize_key(tag_size, &key))
    }

    fn supports_key_derivation(&self) -> bool {
        true
    }

    fn derive_key(&self, serialized_key_format: &[u8], randomness: &mut dyn Read) -> Result<Vec<u8>> {
        let (key_size, tag_size) = parse_key_format(serialized_key_format)?;
        let mut key = Zeroizing::new(vec![0u8; key_size]);
        randomness
            .read_exact(key.as_mut_slice())
            .map_err(|_e| Error::Crypto(CryptoError::KeyDerivationFailed))?;
        Ok(serialize_key(tag_size, &key))
    }

    fn primitives(&self) -> PrimitiveFactories {
        PrimitiveFactories::new().with::<dyn Mac>(|serialized_key| Ok(Box::new(parse_key(serialized_key)?)))
    }
}

/// 32-byte key with a 16-byte tag
pub fn hmac_sha256_half_size_tag_template() -> KeyTemplate {
    KeyTemplate::new(type_urls::HMAC_SHA256, hmac_key_format(32, 16), OutputPrefixType::Tink)
}

/// 32-byte key with a full 32-byte tag
pub fn hmac_sha256_template() -> KeyTemplate {
    KeyTemplate::new(type_urls::HMAC_SHA256, hmac_key_format(32, 32), OutputPrefixType::Tink)
}

/// Combines the MAC primitives of a keyset
pub struct MacWrapper;

impl PrimitiveWrapper for MacWrapper {
    type Input = dyn Mac;
    type Output = dyn Mac;

    fn wrap(&self, primitive_set: PrimitiveSet<dyn Mac>) -> Result<Box<dyn Mac>> {
        if primitive_set.primary().is_none() {
            return Err(Error::invalid_argument("MAC primitive set has no primary"));
        }
        Ok(Box::new(MacSet {
            compute_monitor: ApiMonitor::for_api(&primitive_set, "mac", "compute")?,
            verify_monitor: ApiMonitor::for_api(&primitive_set, "mac", "verify")?,
            primitives: primitive_set,
        }))
    }
}

struct MacSet {
    primitives: PrimitiveSet<dyn Mac>,
    compute_monitor: ApiMonitor,
    verify_monitor: ApiMonitor,
}

/// LEGACY keys authenticate `data || 0x00`
fn formatted_input(prefix_type: OutputPrefixType, data: &[u8]) -> Vec<u8> {
    let mut input = data.to_vec();
    if prefix_type == OutputPrefixType::Legacy {
        input.push(0x00);
    }
    input
}

impl Mac for MacSet {
    fn compute_mac(&self, data: &[u8]) -> Result<Vec<u8>> {
        let Some(primary) = self.primitives.primary() else {
            self.compute_monitor.log_failure();
            return Err(Error::failed_precondition("MAC primitive set has no primary"));
        };
        let input = formatted_input(primary.output_prefix_type(), data);
        match primary.primitive().compute_mac(&input) {
            Ok(tag) => {
                self.compute_monitor.log(primary.key_id(), data.len());
                Ok([primary.identifier(), tag.as_slice()].concat())
            }
            Err(err) => {
                self.compute_monitor.log_failure();
                Err(err)
            }
        }
    }

    fn verify_mac(&self, mac: &[u8], data: &[u8]) -> Result<()> {
        let prefix_size = sizes::prefix::NON_RAW_PREFIX_SIZE;
        if mac.len() > prefix_size {
            let (prefix, tag) = mac.split_at(prefix_size);
            for entry in self.primitives.entries_with_prefix(prefix) {
                let input = formatted_input(entry.output_prefix_type(), data);
                if entry.primitive().verify_mac(tag, &input).is_ok() {
                    self.verify_monitor.log(entry.key_id(), data.len());
                    return Ok(());
                }
            }
        }

        for entry in self.primitives.raw_entries() {
            if entry.primitive().verify_mac(mac, data).is_ok() {
                self.verify_monitor.log(entry.key_id(), data.len());
                return Ok(());
            }
        }

        self.verify_monitor.log_failure();
        crypto_err!(CryptoError::InvalidMac)
    }
}

/*!
Key and keyset data model.

These are the values the registry routes by type URL. Their serialized
form belongs to the key managers; the registry only reads the type URL,
status, key id and output prefix type.
*/

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::{
    constants::sizes::prefix,
    error::{Error, Result},
};

/// What kind of secret a [`KeyData`] carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyMaterialType {
    /// Secret symmetric key
    Symmetric,
    /// Private half of an asymmetric key pair
    AsymmetricPrivate,
    /// Public half of an asymmetric key pair
    AsymmetricPublic,
    /// Key held by an external service
    Remote,
}

/// Status of a key inside a keyset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyStatus {
    /// Usable for all operations
    Enabled,
    /// Kept in the keyset but never turned into a primitive
    Disabled,
    /// Key material has been removed
    Destroyed,
}

/// How ciphertexts, tags and signatures produced with a key are prefixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputPrefixType {
    /// `0x01 || key_id`
    #[default]
    Tink,
    /// `0x00 || key_id`, with legacy message formatting
    Legacy,
    /// No prefix
    Raw,
    /// `0x00 || key_id`
    Crunchy,
}

/// Compute the output prefix for a key id
pub fn output_prefix(prefix_type: OutputPrefixType, key_id: u32) -> Vec<u8> {
    let start = match prefix_type {
        OutputPrefixType::Raw => return Vec::new(),
        OutputPrefixType::Tink => prefix::TINK_START_BYTE,
        OutputPrefixType::Legacy | OutputPrefixType::Crunchy => prefix::LEGACY_START_BYTE,
    };

    let mut out = vec![0u8; prefix::NON_RAW_PREFIX_SIZE];
    out[0] = start;
    BigEndian::write_u32(&mut out[1..], key_id);
    out
}

/// Serialized key material tagged with its type URL
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyData {
    type_url: String,
    value: Vec<u8>,
    #[zeroize(skip)]
    key_material_type: KeyMaterialType,
}

impl KeyData {
    /// Create key data for the given type URL
    pub fn new(type_url: impl Into<String>, value: Vec<u8>, key_material_type: KeyMaterialType) -> Self {
        Self {
            type_url: type_url.into(),
            value,
            key_material_type,
        }
    }

    /// Type URL naming the key manager for this key
    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    /// Serialized key
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn key_material_type(&self) -> KeyMaterialType {
        self.key_material_type
    }
}

impl fmt::Debug for KeyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyData")
            .field("type_url", &self.type_url)
            .field("value", &"<redacted>")
            .field("key_material_type", &self.key_material_type)
            .finish()
    }
}

/// Description of a key to generate
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyTemplate {
    /// Type URL of the key manager that creates the key
    pub type_url: String,
    /// Serialized key format understood by that manager
    pub value: Vec<u8>,
    /// Prefix type for keys created from this template
    pub output_prefix_type: OutputPrefixType,
}

impl KeyTemplate {
    pub fn new(type_url: impl Into<String>, value: Vec<u8>, output_prefix_type: OutputPrefixType) -> Self {
        Self {
            type_url: type_url.into(),
            value,
            output_prefix_type,
        }
    }
}

/// One key of a keyset
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct KeysetKey {
    /// Key material
    pub key_data: KeyData,
    /// Current status
    pub status: KeyStatus,
    /// Identifier, unique within the keyset
    pub key_id: u32,
    /// Prefix applied to outputs of this key
    pub output_prefix_type: OutputPrefixType,
}

impl KeysetKey {
    pub fn new(key_data: KeyData, key_id: u32, status: KeyStatus, output_prefix_type: OutputPrefixType) -> Self {
        Self {
            key_data,
            status,
            key_id,
            output_prefix_type,
        }
    }

    /// Output prefix of this key
    pub fn output_prefix(&self) -> Vec<u8> {
        output_prefix(self.output_prefix_type, self.key_id)
    }
}

/// Ordered collection of keys with a designated primary
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyset {
    /// Key id of the key used for new outputs
    pub primary_key_id: u32,
    /// Keys in insertion order
    pub keys: Vec<KeysetKey>,
}

impl Keyset {
    pub fn new(primary_key_id: u32, keys: Vec<KeysetKey>) -> Self {
        Self { primary_key_id, keys }
    }

    /// Check that the keyset has exactly one enabled primary key.
    ///
    /// Public-only keysets may lack a primary as long as some key is enabled.
    pub fn validate(&self) -> Result<()> {
        if self.keys.is_empty() {
            return Err(Error::invalid_argument("keyset must contain at least one key"));
        }

        let mut enabled = 0usize;
        let mut primaries = 0usize;
        let mut only_public = true;
        for key in &self.keys {
            if key.status != KeyStatus::Enabled {
                continue;
            }
            enabled += 1;
            if key.key_id == self.primary_key_id {
                primaries += 1;
            }
            if key.key_data.key_material_type() != KeyMaterialType::AsymmetricPublic {
                only_public = false;
            }
        }

        if enabled == 0 {
            return Err(Error::invalid_argument("keyset must contain at least one ENABLED key"));
        }
        if primaries > 1 {
            return Err(Error::invalid_argument("keyset contains multiple primary keys"));
        }
        if primaries == 0 && !only_public {
            return Err(Error::invalid_argument("keyset doesn't contain a valid primary key"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: u32, status: KeyStatus) -> KeysetKey {
        KeysetKey::new(
            KeyData::new("type.A", vec![1, 2, 3], KeyMaterialType::Symmetric),
            id,
            status,
            OutputPrefixType::Tink,
        )
    }

    #[test]
    fn test_output_prefix_layout() {
        assert_eq!(output_prefix(OutputPrefixType::Tink, 0x01020304), vec![0x01, 1, 2, 3, 4]);
        assert_eq!(output_prefix(OutputPrefixType::Legacy, 7), vec![0x00, 0, 0, 0, 7]);
        assert_eq!(output_prefix(OutputPrefixType::Crunchy, 7), vec![0x00, 0, 0, 0, 7]);
        assert!(output_prefix(OutputPrefixType::Raw, 7).is_empty());
    }

    #[test]
    fn test_key_data_debug_is_redacted() {
        let data = KeyData::new("type.A", vec![0xAA; 8], KeyMaterialType::Symmetric);
        let printed = format!("{:?}", data);
        assert!(printed.contains("type.A"));
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("170"));
    }

    #[test]
    fn test_keyset_validation() {
        assert!(Keyset::new(1, vec![]).validate().is_err());
        assert!(Keyset::new(1, vec![key(1, KeyStatus::Enabled)]).validate().is_ok());
        assert!(Keyset::new(1, vec![key(1, KeyStatus::Disabled)]).validate().is_err());
        assert!(Keyset::new(2, vec![key(1, KeyStatus::Enabled)]).validate().is_err());
        assert!(
            Keyset::new(1, vec![key(1, KeyStatus::Enabled), key(1, KeyStatus::Enabled)])
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_public_keyset_without_primary_is_valid() {
        let public = KeysetKey::new(
            KeyData::new("type.Pub", vec![9], KeyMaterialType::AsymmetricPublic),
            5,
            KeyStatus::Enabled,
            OutputPrefixType::Raw,
        );
        assert!(Keyset::new(0, vec![public]).validate().is_ok());
    }
}

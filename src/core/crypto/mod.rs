/*!
Built-in key types and wrappers.

This module provides the primitives the registry ships with:
ChaCha20-Poly1305 for authenticated encryption, HMAC-SHA256 for message
authentication and CRYSTALS-Dilithium3 for digital signatures.
*/

// Serialized key layout
pub(crate) mod encoding;

// Primitive interfaces
pub mod primitives;

// Authenticated encryption
pub mod aead;

// Message authentication
pub mod mac;

// Digital signatures
pub mod signature;

pub use aead::{
    AeadWrapper, ChaCha20Poly1305Cipher, ChaCha20Poly1305KeyManager, chacha20_poly1305_key_template,
    raw_chacha20_poly1305_key_template,
};
pub use mac::{
    HmacSha256, HmacSha256KeyManager, MacWrapper, hmac_key_format, hmac_sha256_half_size_tag_template,
    hmac_sha256_template,
};
pub use primitives::{Aead, Mac, PublicKeySign, PublicKeyVerify};
pub use signature::{
    Dilithium3PrivateKeyManager, Dilithium3PublicKeyManager, Dilithium3Signer, Dilithium3Verifier,
    PublicKeySignWrapper, PublicKeyVerifyWrapper, dilithium3_key_template, raw_dilithium3_key_template,
};

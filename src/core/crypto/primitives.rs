/*!
Primitive interfaces produced by the built-in key managers.

Each trait is used as a trait object (`dyn Aead`, `dyn Mac`, ...) and is
also the type the registry keys wrappers and key managers by.
*/

use crate::core::error::Result;

/// Authenticated encryption with associated data
pub trait Aead: Send + Sync {
    /// Encrypt `plaintext`, authenticating `associated_data`
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt `ciphertext`, verifying `associated_data`
    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>>;
}

/// Message authentication code
pub trait Mac: Send + Sync {
    fn compute_mac(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Check `mac` in constant time
    fn verify_mac(&self, mac: &[u8], data: &[u8]) -> Result<()>;
}

/// Digital signature creation
pub trait PublicKeySign: Send + Sync {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Digital signature verification
pub trait PublicKeyVerify: Send + Sync {
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()>;
}

/*!
Constants for the registry and the built-in key managers.

This module contains type URLs, output prefix layout and key sizes.
*/

/// Version written into every serialized key produced by the built-in managers
pub const KEY_VERSION: u8 = 0x00;

/// Prefix shared by all built-in type URLs
pub const TYPE_URL_PREFIX: &str = "type.pqc-registry.dev/";

/// Type URLs of the built-in key managers
pub mod type_urls {
    /// ChaCha20-Poly1305 AEAD keys
    pub const CHACHA20_POLY1305: &str = "type.pqc-registry.dev/ChaCha20Poly1305Key";

    /// HMAC-SHA256 keys
    pub const HMAC_SHA256: &str = "type.pqc-registry.dev/HmacSha256Key";

    /// Dilithium3 signing keys
    pub const DILITHIUM_PRIVATE: &str = "type.pqc-registry.dev/Dilithium3PrivateKey";

    /// Dilithium3 verification keys
    pub const DILITHIUM_PUBLIC: &str = "type.pqc-registry.dev/Dilithium3PublicKey";
}

/// Size constants
pub mod sizes {
    /// Output prefix layout
    pub mod prefix {
        /// Size of a non-raw output prefix: one start byte plus a big-endian key id
        pub const NON_RAW_PREFIX_SIZE: usize = 5;

        /// First byte of a TINK-style prefix
        pub const TINK_START_BYTE: u8 = 0x01;

        /// First byte of a LEGACY or CRUNCHY prefix
        pub const LEGACY_START_BYTE: u8 = 0x00;
    }

    /// ChaCha20-Poly1305 constants
    pub mod chacha {
        /// Size of ChaCha20-Poly1305 authentication tag in bytes
        pub const TAG_SIZE: usize = 16;

        /// Size of ChaCha20-Poly1305 key in bytes
        pub const KEY_SIZE: usize = 32;

        /// Size of ChaCha20-Poly1305 nonce in bytes
        pub const NONCE_SIZE: usize = 12;
    }

    /// HMAC-SHA256 constants
    pub mod hmac {
        /// Smallest accepted key
        pub const MIN_KEY_SIZE: usize = 16;

        /// SHA-256 block size; longer keys would be hashed down anyway
        pub const MAX_KEY_SIZE: usize = 64;

        /// Smallest accepted truncated tag
        pub const MIN_TAG_SIZE: usize = 10;

        /// Full SHA-256 output
        pub const MAX_TAG_SIZE: usize = 32;
    }
}

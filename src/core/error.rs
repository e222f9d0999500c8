/*!
Error handling for the key-type registry.

Every registry operation returns a typed [`Result`]. The variants mirror
the status classes callers branch on (not found, already exists, ...),
while failures raised by key managers and wrappers travel through
unchanged as [`Error::Crypto`] or whatever variant the collaborator chose.
*/

use std::io;
use thiserror::Error;

/// Result type for registry and primitive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], convenient for matching in callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required input was missing or malformed
    InvalidArgument,
    /// A conflicting registration already exists
    AlreadyExists,
    /// The requested key type, primitive or wrapper is unknown
    NotFound,
    /// The call is not valid in the current registry state
    FailedPrecondition,
    /// Invariant violation or FIPS policy conflict
    Internal,
    /// The key type does not implement the requested capability
    Unimplemented,
    /// A cryptographic operation failed
    Crypto,
    /// Reading from a randomness stream failed
    Io,
}

/// Error type for the registry
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Re-registration under a different implementation
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Lookup of something that was never registered
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not applicable in the current state
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Capability not provided by the key type
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Cryptographic error (limited details for security)
    #[error("Cryptographic operation failed: {0}")]
    Crypto(#[from] CryptoError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::FailedPrecondition(_) => ErrorKind::FailedPrecondition,
            Error::Internal(_) => ErrorKind::Internal,
            Error::Unimplemented(_) => ErrorKind::Unimplemented,
            Error::Crypto(_) => ErrorKind::Crypto,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Error::AlreadyExists(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn failed_precondition(msg: impl Into<String>) -> Self {
        Error::FailedPrecondition(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    pub fn unimplemented(msg: impl Into<String>) -> Self {
        Error::Unimplemented(msg.into())
    }
}

/// Cryptographic errors with limited details to prevent leaking information
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Generic encryption error
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Generic decryption error
    #[error("Decryption failed")]
    DecryptionFailed,

    /// MAC computation or verification failed
    #[error("Invalid MAC")]
    InvalidMac,

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Key derivation error
    #[error("Key derivation failed")]
    KeyDerivationFailed,

    /// Invalid key format
    #[error("Invalid key format")]
    InvalidKeyFormat,

    /// Key material was produced by a newer, unknown serializer
    #[error("Unsupported key version {0}")]
    UnsupportedKeyVersion(u8),
}

/// Return an `Err` of the given status variant with a formatted message
#[macro_export]
macro_rules! status_err {
    ($kind:ident, $msg:expr) => {
        Err($crate::core::error::Error::$kind($msg.to_string()))
    };
    ($kind:ident, $fmt:expr, $($arg:tt)*) => {
        Err($crate::core::error::Error::$kind(format!($fmt, $($arg)*)))
    };
}

/// Create a crypto error
#[macro_export]
macro_rules! crypto_err {
    ($err:expr) => {
        Err($crate::core::error::Error::Crypto($err))
    };
}

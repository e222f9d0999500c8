//! Core components of the registry.
//!
//! This module contains the key-type registry itself, the keyset data
//! model it operates on, the built-in key types and error handling.

// Key-type and wrapper registry
pub mod registry;

// Keysets and key templates
pub mod keyset;

// Primitive sets handed to wrappers
pub mod primitive_set;

// Built-in key types and wrappers
pub mod crypto;

// Registry configuration
pub mod config;

// Type URLs and sizes
pub mod constants;

// Error handling
pub mod error;

// Re-exports for convenience
pub use self::config::RegistryConfig;
pub use self::error::{CryptoError, Error, ErrorKind, Result};
pub use self::keyset::{KeyData, KeyMaterialType, KeyStatus, KeyTemplate, Keyset, KeysetKey, OutputPrefixType};
pub use self::primitive_set::PrimitiveSet;
pub use self::registry::Registry;

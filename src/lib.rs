/*!
# PQC Registry

A type-safe registry of key types and primitive wrappers for a
post-quantum primitive library.

## Overview

Key types register themselves under a type URL; callers then turn key
material into primitives and whole keysets into a single wrapped
primitive, without naming the concrete key manager:

- [`KeyTypeManager`] implementations declare every primitive type they
  can build; the registry stores one typed handler per primitive
- Asymmetric key types are registered as a private/public pair that must
  stay consistent across re-registrations
- [`PrimitiveWrapper`] implementations combine one primitive per key into
  one primitive, honouring output prefixes and the primary key
- A FIPS-only mode rejects key managers that are not FIPS compatible
- A monitoring client factory receives per-call telemetry of wrapped
  keysets that carry annotations

## Built-in key types

- ChaCha20-Poly1305 for authenticated encryption
- HMAC-SHA256 for message authentication
- CRYSTALS-Dilithium3 for digital signatures

```ignore
use pqc_registry::{Registry, RegistryConfig};
use pqc_registry::crypto::{Aead, chacha20_poly1305_key_template};

let registry = Registry::new();
RegistryConfig::default().apply(&registry)?;
let key_data = registry.new_key_data(&chacha20_poly1305_key_template())?;
let aead = registry.primitive::<dyn Aead>(&key_data)?;
```
*/

// Core components
pub mod core;

// Re-export commonly used types for convenience
pub use crate::core::config::{RegistryConfig, register_aead, register_all, register_mac, register_signature};
pub use crate::core::constants::{KEY_VERSION, sizes, type_urls};
pub use crate::core::crypto;
pub use crate::core::error::{CryptoError, Error, ErrorKind, Result};
pub use crate::core::keyset::{KeyData, KeyMaterialType, KeyStatus, KeyTemplate, Keyset, KeysetKey, OutputPrefixType};
pub use crate::core::primitive_set::PrimitiveSet;

// Re-export the registry and the traits key types implement
pub use crate::core::registry::{
    FipsCompatibility, KeyFactory, KeyManager, KeyTypeManager, KeysetWrapper, MonitoringClient,
    MonitoringClientFactory, MonitoringContext, PrimitiveFactories, PrimitiveWrapper, PrivateKeyTypeManager,
    Registry, TypeKey, global,
};

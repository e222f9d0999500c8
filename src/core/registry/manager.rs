/*!
Key manager traits.

There are two ways to hand key handling to the registry:

- [`KeyTypeManager`]: the modern form. One manager validates and creates
  keys for a type URL and declares, through [`PrimitiveFactories`], every
  primitive type it can build. The registry turns each declaration into a
  typed [`KeyManager<P>`] handler.
- [`KeyManager<P>`]: the legacy form, one handler per primitive type,
  implemented directly.

Asymmetric key types implement [`PrivateKeyTypeManager`] on the private
side, which adds extraction of the matching public key.
*/

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use crate::core::{
    error::{Error, Result},
    keyset::{KeyData, KeyMaterialType},
    registry::{
        fips::FipsCompatibility,
        type_key::{Erased, TypeKey, erase},
    },
};

/// Creates key material for one key type
pub trait KeyFactory: Send + Sync {
    /// Generate a fresh key from a serialized key format
    fn new_key_data(&self, serialized_key_format: &[u8]) -> Result<KeyData>;

    /// Extract the public key from a serialized private key.
    ///
    /// Only factories of private key types support this.
    fn public_key_data(&self, _serialized_private_key: &[u8]) -> Result<KeyData> {
        Err(Error::invalid_argument("key factory does not produce public keys"))
    }
}

/// Handler producing primitives of type `P` from key data
pub trait KeyManager<P: ?Sized>: Send + Sync {
    /// Build a primitive from `key_data`
    fn primitive(&self, key_data: &KeyData) -> Result<Box<P>>;

    /// Type URL handled by this manager
    fn key_type(&self) -> &str;

    fn does_support(&self, type_url: &str) -> bool {
        type_url == self.key_type()
    }

    fn key_factory(&self) -> &dyn KeyFactory;
}

/// Manager for one key type that may back several primitive types
pub trait KeyTypeManager: Send + Sync + 'static {
    /// Type URL handled by this manager
    fn key_type(&self) -> &str;

    fn does_support(&self, type_url: &str) -> bool {
        type_url == self.key_type()
    }

    fn key_material_type(&self) -> KeyMaterialType;

    /// FIPS verdict consumed at registration
    fn fips_status(&self) -> FipsCompatibility {
        FipsCompatibility::NotFips
    }

    /// Check a serialized key, including its version
    fn validate_key(&self, serialized_key: &[u8]) -> Result<()>;

    /// Check a serialized key format
    fn validate_key_format(&self, serialized_key_format: &[u8]) -> Result<()>;

    /// Generate a serialized key for a validated format
    fn create_key(&self, serialized_key_format: &[u8]) -> Result<Vec<u8>>;

    /// Whether [`derive_key`](Self::derive_key) is implemented
    fn supports_key_derivation(&self) -> bool {
        false
    }

    /// Derive a serialized key deterministically from `randomness`
    fn derive_key(&self, _serialized_key_format: &[u8], _randomness: &mut dyn Read) -> Result<Vec<u8>> {
        Err(Error::unimplemented(format!(
            "key type '{}' does not support key derivation",
            self.key_type()
        )))
    }

    /// Primitive types this manager can build
    fn primitives(&self) -> PrimitiveFactories;
}

/// Private half of an asymmetric key type
pub trait PrivateKeyTypeManager: KeyTypeManager {
    /// Serialized public key matching a serialized private key
    fn public_key(&self, serialized_private_key: &[u8]) -> Result<Vec<u8>>;
}

/// Constructor of one primitive type from a serialized key
pub(crate) type PrimitiveFn<P> = Arc<dyn Fn(&[u8]) -> Result<Box<P>> + Send + Sync>;

/// Deterministic key derivation bound to one key type
pub(crate) type KeyDeriverFn = Arc<dyn Fn(&[u8], &mut dyn Read) -> Result<KeyData> + Send + Sync>;

/// What a declared primitive needs to become a [`KeyManager<P>`]
pub(crate) struct BindContext {
    pub(crate) manager: Arc<dyn KeyTypeManager>,
    pub(crate) key_factory: Arc<dyn KeyFactory>,
}

type Binder = Box<dyn FnOnce(&BindContext) -> Erased + Send>;

/// Declaration of the primitive types a [`KeyTypeManager`] supports.
///
/// ```ignore
/// PrimitiveFactories::new()
///     .with::<dyn Mac>(|key| Ok(Box::new(HmacSha256::from_key(key)?)))
/// ```
#[derive(Default)]
pub struct PrimitiveFactories {
    declared: Vec<(TypeKey, Binder)>,
}

impl PrimitiveFactories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that primitives of type `P` are built by `create`
    pub fn with<P: ?Sized + 'static>(
        mut self,
        create: impl Fn(&[u8]) -> Result<Box<P>> + Send + Sync + 'static,
    ) -> Self {
        let create: PrimitiveFn<P> = Arc::new(create);
        let bind = move |ctx: &BindContext| -> Erased {
            let manager: Arc<dyn KeyManager<P>> = Arc::new(KeyManagerImpl {
                manager: ctx.manager.clone(),
                key_factory: ctx.key_factory.clone(),
                create,
            });
            erase(manager)
        };
        self.declared.push((TypeKey::of::<P>(), Box::new(bind)));
        self
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// Build the handler map. The first declaration of a type wins.
    pub(crate) fn bind(self, ctx: &BindContext) -> HashMap<TypeKey, Erased> {
        let mut handlers = HashMap::with_capacity(self.declared.len());
        for (type_key, bind) in self.declared {
            handlers.entry(type_key).or_insert_with(|| bind(ctx));
        }
        handlers
    }
}

/// [`KeyManager<P>`] view of a [`KeyTypeManager`]
struct KeyManagerImpl<P: ?Sized> {
    manager: Arc<dyn KeyTypeManager>,
    key_factory: Arc<dyn KeyFactory>,
    create: PrimitiveFn<P>,
}

impl<P: ?Sized + 'static> KeyManager<P> for KeyManagerImpl<P> {
    fn primitive(&self, key_data: &KeyData) -> Result<Box<P>> {
        if !self.does_support(key_data.type_url()) {
            return Err(Error::invalid_argument(format!(
                "Key type '{}' is not supported by this manager.",
                key_data.type_url()
            )));
        }
        self.manager.validate_key(key_data.value())?;
        (self.create)(key_data.value())
    }

    fn key_type(&self) -> &str {
        self.manager.key_type()
    }

    fn does_support(&self, type_url: &str) -> bool {
        self.manager.does_support(type_url)
    }

    fn key_factory(&self) -> &dyn KeyFactory {
        self.key_factory.as_ref()
    }
}

fn new_key_data_with(manager: &dyn KeyTypeManager, serialized_key_format: &[u8]) -> Result<KeyData> {
    manager.validate_key_format(serialized_key_format)?;
    let key = manager.create_key(serialized_key_format)?;
    manager.validate_key(&key)?;
    Ok(KeyData::new(manager.key_type(), key, manager.key_material_type()))
}

/// Key factory of a symmetric or public key type
pub(crate) struct KeyFactoryImpl {
    pub(crate) manager: Arc<dyn KeyTypeManager>,
}

impl KeyFactory for KeyFactoryImpl {
    fn new_key_data(&self, serialized_key_format: &[u8]) -> Result<KeyData> {
        new_key_data_with(self.manager.as_ref(), serialized_key_format)
    }
}

/// Key factory of a private key type, aware of its public counterpart
pub(crate) struct PrivateKeyFactoryImpl {
    pub(crate) private: Arc<dyn PrivateKeyTypeManager>,
    pub(crate) public: Arc<dyn KeyTypeManager>,
}

impl KeyFactory for PrivateKeyFactoryImpl {
    fn new_key_data(&self, serialized_key_format: &[u8]) -> Result<KeyData> {
        self.private.validate_key_format(serialized_key_format)?;
        let key = self.private.create_key(serialized_key_format)?;
        self.private.validate_key(&key)?;
        Ok(KeyData::new(self.private.key_type(), key, self.private.key_material_type()))
    }

    fn public_key_data(&self, serialized_private_key: &[u8]) -> Result<KeyData> {
        self.private.validate_key(serialized_private_key)?;
        let public_key = self.private.public_key(serialized_private_key)?;
        self.public.validate_key(&public_key)?;
        Ok(KeyData::new(
            self.public.key_type(),
            public_key,
            KeyMaterialType::AsymmetricPublic,
        ))
    }
}

/// Key factory of a legacy [`KeyManager<P>`], which owns its own factory
pub(crate) struct LegacyKeyFactory<P: ?Sized> {
    pub(crate) manager: Arc<dyn KeyManager<P>>,
}

impl<P: ?Sized + 'static> KeyFactory for LegacyKeyFactory<P> {
    fn new_key_data(&self, serialized_key_format: &[u8]) -> Result<KeyData> {
        self.manager.key_factory().new_key_data(serialized_key_format)
    }

    fn public_key_data(&self, serialized_private_key: &[u8]) -> Result<KeyData> {
        self.manager.key_factory().public_key_data(serialized_private_key)
    }
}

/// Deriver for managers that support derivation, `None` otherwise
pub(crate) fn key_deriver_for(manager: Arc<dyn KeyTypeManager>) -> Option<KeyDeriverFn> {
    if !manager.supports_key_derivation() {
        return None;
    }
    let deriver = move |serialized_key_format: &[u8], randomness: &mut dyn Read| -> Result<KeyData> {
        manager.validate_key_format(serialized_key_format)?;
        let key = manager.derive_key(serialized_key_format, randomness)?;
        manager.validate_key(&key)?;
        Ok(KeyData::new(manager.key_type(), key, manager.key_material_type()))
    };
    Some(Arc::new(deriver))
}

/*!
Per-type-URL registry record.

A [`KeyTypeEntry`] is built once when a key type is first registered and
never changes afterwards, apart from its `new_key_allowed` flag. The
registry hands entries out behind an `Arc`, so a caller may keep using a
looked-up entry after the registry lock is released.
*/

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::{
    error::{Error, Result},
    keyset::KeyData,
    registry::{
        manager::{
            BindContext, KeyDeriverFn, KeyFactory, KeyFactoryImpl, KeyManager, KeyTypeManager,
            LegacyKeyFactory, PrivateKeyFactoryImpl, PrivateKeyTypeManager, key_deriver_for,
        },
        type_key::{Erased, TypeKey, downcast_erased, erase},
    },
};

/// Everything the registry knows about one key type
pub struct KeyTypeEntry {
    /// Type URL this entry is registered under
    key_type: String,

    /// Concrete manager type that created the entry
    implementation: TypeKey,

    /// Concrete public manager type, for private entries registered jointly
    public_implementation: Option<TypeKey>,

    /// Whether new keys of this type may be generated
    new_key_allowed: AtomicBool,

    /// `Arc<dyn KeyManager<P>>` per supported primitive type `P`
    primitive_managers: HashMap<TypeKey, Erased>,

    key_factory: Arc<dyn KeyFactory>,

    key_deriver: Option<KeyDeriverFn>,
}

impl KeyTypeEntry {
    /// Entry for a symmetric or public key type
    pub(crate) fn from_key_type_manager<M: KeyTypeManager>(manager: Arc<M>, new_key_allowed: bool) -> Self {
        let key_type = manager.key_type().to_string();
        let primitives = manager.primitives();
        let manager: Arc<dyn KeyTypeManager> = manager;
        let key_factory: Arc<dyn KeyFactory> = Arc::new(KeyFactoryImpl {
            manager: manager.clone(),
        });

        let ctx = BindContext {
            manager: manager.clone(),
            key_factory: key_factory.clone(),
        };

        Self {
            key_type,
            implementation: TypeKey::of::<M>(),
            public_implementation: None,
            new_key_allowed: AtomicBool::new(new_key_allowed),
            primitive_managers: primitives.bind(&ctx),
            key_factory,
            key_deriver: key_deriver_for(manager),
        }
    }

    /// Entry for the private half of an asymmetric pair, remembering which
    /// public manager it was paired with
    pub(crate) fn from_private_key_type_manager<Pr, Pu>(
        private: Arc<Pr>,
        public: Arc<Pu>,
        new_key_allowed: bool,
    ) -> Self
    where
        Pr: PrivateKeyTypeManager,
        Pu: KeyTypeManager,
    {
        let key_type = private.key_type().to_string();
        let primitives = private.primitives();
        let key_factory: Arc<dyn KeyFactory> = Arc::new(PrivateKeyFactoryImpl {
            private: private.clone(),
            public,
        });
        let manager: Arc<dyn KeyTypeManager> = private;

        let ctx = BindContext {
            manager: manager.clone(),
            key_factory: key_factory.clone(),
        };

        Self {
            key_type,
            implementation: TypeKey::of::<Pr>(),
            public_implementation: Some(TypeKey::of::<Pu>()),
            new_key_allowed: AtomicBool::new(new_key_allowed),
            primitive_managers: primitives.bind(&ctx),
            key_factory,
            key_deriver: key_deriver_for(manager),
        }
    }

    /// Entry for a legacy single-primitive manager
    pub(crate) fn from_key_manager<P, K>(manager: Arc<K>, new_key_allowed: bool) -> Self
    where
        P: ?Sized + 'static,
        K: KeyManager<P> + 'static,
    {
        let key_type = manager.key_type().to_string();
        let manager: Arc<dyn KeyManager<P>> = manager;
        let mut primitive_managers = HashMap::with_capacity(1);
        primitive_managers.insert(TypeKey::of::<P>(), erase(manager.clone()));

        Self {
            key_type,
            implementation: TypeKey::of::<K>(),
            public_implementation: None,
            new_key_allowed: AtomicBool::new(new_key_allowed),
            primitive_managers,
            key_factory: Arc::new(LegacyKeyFactory { manager }),
            key_deriver: None,
        }
    }

    /// Handler producing `P` primitives for this key type
    pub fn key_manager<P: ?Sized + 'static>(&self) -> Result<Arc<dyn KeyManager<P>>> {
        let requested = TypeKey::of::<P>();
        let erased = self.primitive_managers.get(&requested).ok_or_else(|| {
            Error::not_found(format!(
                "Primitive type {} not among supported primitives {} for type URL {}",
                requested,
                self.primitive_names().join(", "),
                self.key_type
            ))
        })?;
        downcast_erased::<Arc<dyn KeyManager<P>>>(erased, "KeyTypeEntry::key_manager").cloned()
    }

    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    pub fn implementation(&self) -> TypeKey {
        self.implementation
    }

    pub fn public_implementation(&self) -> Option<TypeKey> {
        self.public_implementation
    }

    pub fn new_key_allowed(&self) -> bool {
        self.new_key_allowed.load(Ordering::Acquire)
    }

    /// Only called with the registry write lock held
    pub(crate) fn set_new_key_allowed(&self, new_key_allowed: bool) {
        self.new_key_allowed.store(new_key_allowed, Ordering::Release);
    }

    pub fn key_factory(&self) -> &Arc<dyn KeyFactory> {
        &self.key_factory
    }

    pub fn supports_key_derivation(&self) -> bool {
        self.key_deriver.is_some()
    }

    /// Derive key data from `randomness` with the entry's deriver
    pub fn derive_key(&self, serialized_key_format: &[u8], randomness: &mut dyn Read) -> Result<KeyData> {
        match &self.key_deriver {
            Some(derive) => derive(serialized_key_format, randomness),
            None => Err(Error::unimplemented(format!(
                "Manager for type '{}' cannot derive keys.",
                self.key_type
            ))),
        }
    }

    /// Primitive types this key type can produce
    pub fn primitive_types(&self) -> Vec<TypeKey> {
        self.primitive_managers.keys().copied().collect()
    }

    fn primitive_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.primitive_managers.keys().map(TypeKey::name).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for KeyTypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyTypeEntry")
            .field("key_type", &self.key_type)
            .field("implementation", &self.implementation)
            .field("public_implementation", &self.public_implementation)
            .field("new_key_allowed", &self.new_key_allowed())
            .field("primitives", &self.primitive_names())
            .field("derivable", &self.supports_key_derivation())
            .finish()
    }
}

/*!
Type-safe registry of key managers and primitive wrappers.

The [`Registry`] maps type URLs to [`KeyTypeEntry`] records and output
primitive types to [`WrapperEntry`] records. Key managers register once,
usually at start-up through [`crate::core::config`]; afterwards any
number of threads resolve key data to primitives and wrap whole keysets.

A process-wide default instance is available through [`global`], and the
free functions in this module forward to it. Code that wants isolation
(tests, embedders with several policies) creates its own `Registry`.
*/

pub mod fips;
pub mod key_type_entry;
pub mod manager;
pub mod monitoring;
pub mod type_key;
pub mod wrapper;
pub mod wrapper_entry;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;
use tracing::{debug, info, trace, warn};

use crate::core::{
    error::{Error, Result},
    keyset::{KeyData, KeyTemplate, Keyset},
    primitive_set::PrimitiveSet,
};

pub use fips::{FipsCompatibility, allowed_in_fips_mode, fips_mode_compiled_in, validated_backend_available};
pub use key_type_entry::KeyTypeEntry;
pub use manager::{KeyFactory, KeyManager, KeyTypeManager, PrimitiveFactories, PrivateKeyTypeManager};
pub use monitoring::{
    ApiMonitor, MonitoringClient, MonitoringClientFactory, MonitoringContext, MonitoringKeyInfo, MonitoringKeysetInfo,
};
pub use type_key::TypeKey;
pub use wrapper::{KeysetWrapper, PrimitiveWrapper};
pub use wrapper_entry::WrapperEntry;

/// Both registry maps, guarded together
#[derive(Default)]
struct Maps {
    key_types: HashMap<String, Arc<KeyTypeEntry>>,
    wrappers: HashMap<TypeKey, Arc<WrapperEntry>>,
}

/// Registry of key managers and primitive wrappers
pub struct Registry {
    /// Key types and wrappers
    maps: RwLock<Maps>,

    /// Installed at most once, independent of `maps`
    monitoring_factory: Mutex<Option<Arc<dyn MonitoringClientFactory>>>,

    /// Set by [`Registry::restrict_to_fips_if_empty`]
    fips_restricted: AtomicBool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(Maps::default()),
            monitoring_factory: Mutex::new(None),
            fips_restricted: AtomicBool::new(false),
        }
    }

    // Registry state is only ever changed by single inserts and atomic
    // stores, so a poisoned lock still guards consistent maps.
    fn read_maps(&self) -> RwLockReadGuard<'_, Maps> {
        self.maps.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_maps(&self) -> RwLockWriteGuard<'_, Maps> {
        self.maps.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn monitoring_slot(&self) -> MutexGuard<'_, Option<Arc<dyn MonitoringClientFactory>>> {
        self.monitoring_factory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether only FIPS compatible key managers may be registered
    pub fn is_fips_mode_enabled(&self) -> bool {
        fips_mode_compiled_in() || self.fips_restricted.load(Ordering::Acquire)
    }

    fn check_fips(&self, implementation: TypeKey, verdict: FipsCompatibility) -> Result<()> {
        fips::check_fips_compatibility(verdict, self.is_fips_mode_enabled()).map_err(|err| {
            Error::internal(format!(
                "Failed registering the key manager for {} as it is not FIPS compatible: {}",
                implementation, err
            ))
        })
    }

    /// Whether `implementation` may be registered under `type_url`.
    ///
    /// A type URL stays bound to the implementation that registered it
    /// first; re-registering that same implementation is always allowed,
    /// whatever `new_key_allowed` says.
    pub fn check_insertable(&self, type_url: &str, implementation: TypeKey, new_key_allowed: bool) -> Result<()> {
        check_insertable(&self.read_maps(), type_url, implementation, new_key_allowed)
    }

    /// Register a key type manager under its type URL
    pub fn register_key_type_manager<M: KeyTypeManager>(&self, manager: M, new_key_allowed: bool) -> Result<()> {
        let key_type = manager.key_type().to_string();
        let implementation = TypeKey::of::<M>();
        self.insert_key_type_manager(manager, new_key_allowed)
            .inspect(|_| {
                debug!(key_type = %key_type, implementation = %implementation, new_key_allowed, "registered key type")
            })
            .inspect_err(|err| warn!(key_type = %key_type, error = %err, "rejected key type registration"))
    }

    fn insert_key_type_manager<M: KeyTypeManager>(&self, manager: M, new_key_allowed: bool) -> Result<()> {
        let key_type = manager.key_type().to_string();
        if !manager.does_support(&key_type) {
            return Err(Error::invalid_argument(format!(
                "The manager does not support type '{}'.",
                key_type
            )));
        }
        let implementation = TypeKey::of::<M>();

        let mut maps = self.write_maps();
        self.check_fips(implementation, manager.fips_status())?;
        check_insertable(&maps, &key_type, implementation, new_key_allowed)?;

        match maps.key_types.get(&key_type).cloned() {
            Some(entry) => entry.set_new_key_allowed(new_key_allowed),
            None => {
                let entry = KeyTypeEntry::from_key_type_manager(Arc::new(manager), new_key_allowed);
                maps.key_types.insert(key_type, Arc::new(entry));
            }
        }
        Ok(())
    }

    /// Register a legacy single-primitive key manager.
    ///
    /// Legacy managers carry no FIPS verdict and are accepted in FIPS mode.
    pub fn register_key_manager<P, K>(&self, manager: K, new_key_allowed: bool) -> Result<()>
    where
        P: ?Sized + 'static,
        K: KeyManager<P> + 'static,
    {
        let key_type = manager.key_type().to_string();
        let implementation = TypeKey::of::<K>();
        self.insert_key_manager::<P, K>(manager, new_key_allowed)
            .inspect(|_| {
                debug!(key_type = %key_type, implementation = %implementation, new_key_allowed, "registered legacy key manager")
            })
            .inspect_err(|err| warn!(key_type = %key_type, error = %err, "rejected key manager registration"))
    }

    fn insert_key_manager<P, K>(&self, manager: K, new_key_allowed: bool) -> Result<()>
    where
        P: ?Sized + 'static,
        K: KeyManager<P> + 'static,
    {
        let key_type = manager.key_type().to_string();
        if !manager.does_support(&key_type) {
            return Err(Error::invalid_argument(format!(
                "The manager does not support type '{}'.",
                key_type
            )));
        }
        let implementation = TypeKey::of::<K>();

        let mut maps = self.write_maps();
        check_insertable(&maps, &key_type, implementation, new_key_allowed)?;

        match maps.key_types.get(&key_type).cloned() {
            Some(entry) => entry.set_new_key_allowed(new_key_allowed),
            None => {
                let entry = KeyTypeEntry::from_key_manager::<P, K>(Arc::new(manager), new_key_allowed);
                maps.key_types.insert(key_type, Arc::new(entry));
            }
        }
        Ok(())
    }

    /// Register the private and public managers of an asymmetric key type.
    ///
    /// The first joint registration pairs the two; later ones must present
    /// the same pair and may only change `new_key_allowed`.
    pub fn register_asymmetric_key_managers<Pr, Pu>(
        &self,
        private_manager: Pr,
        public_manager: Pu,
        new_key_allowed: bool,
    ) -> Result<()>
    where
        Pr: PrivateKeyTypeManager,
        Pu: KeyTypeManager,
    {
        let private_type = private_manager.key_type().to_string();
        let public_type = public_manager.key_type().to_string();
        self.insert_asymmetric_key_managers(private_manager, public_manager, new_key_allowed)
            .inspect(|_| {
                debug!(
                    private_key_type = %private_type,
                    public_key_type = %public_type,
                    new_key_allowed,
                    "registered asymmetric key types"
                )
            })
            .inspect_err(|err| {
                warn!(
                    private_key_type = %private_type,
                    public_key_type = %public_type,
                    error = %err,
                    "rejected asymmetric key type registration"
                )
            })
    }

    fn insert_asymmetric_key_managers<Pr, Pu>(
        &self,
        private_manager: Pr,
        public_manager: Pu,
        new_key_allowed: bool,
    ) -> Result<()>
    where
        Pr: PrivateKeyTypeManager,
        Pu: KeyTypeManager,
    {
        let private_type = private_manager.key_type().to_string();
        let public_type = public_manager.key_type().to_string();
        for (supported, type_url) in [
            (private_manager.does_support(&private_type), &private_type),
            (public_manager.does_support(&public_type), &public_type),
        ] {
            if !supported {
                return Err(Error::invalid_argument(format!(
                    "The manager does not support type '{}'.",
                    type_url
                )));
            }
        }

        let private_impl = TypeKey::of::<Pr>();
        let public_impl = TypeKey::of::<Pu>();

        let mut maps = self.write_maps();
        self.check_fips(private_impl, private_manager.fips_status())?;
        self.check_fips(public_impl, public_manager.fips_status())?;
        check_insertable(&maps, &private_type, private_impl, new_key_allowed)?;
        check_insertable(&maps, &public_type, public_impl, new_key_allowed)?;

        if private_type == public_type {
            return Err(Error::invalid_argument(
                "Passed in key managers must have different get_key_type() results.",
            ));
        }

        let private_entry = maps.key_types.get(&private_type).cloned();
        let public_found = maps.key_types.contains_key(&public_type);

        match (private_entry, public_found) {
            (None, false) => {
                let public_manager = Arc::new(public_manager);
                let private_entry = KeyTypeEntry::from_private_key_type_manager(
                    Arc::new(private_manager),
                    public_manager.clone(),
                    new_key_allowed,
                );
                let public_entry = KeyTypeEntry::from_key_type_manager(public_manager, new_key_allowed);
                maps.key_types.insert(private_type, Arc::new(private_entry));
                maps.key_types.insert(public_type, Arc::new(public_entry));
                Ok(())
            }
            (Some(_), false) => Err(Error::invalid_argument(format!(
                "Private key manager corresponding to {} was previously registered, but key manager \
                 corresponding to {} was not, so it's impossible to register them jointly",
                private_impl, public_impl
            ))),
            (None, true) => Err(Error::invalid_argument(format!(
                "Key manager corresponding to {} was previously registered, but private key manager \
                 corresponding to {} was not, so it's impossible to register them jointly",
                public_impl, private_impl
            ))),
            (Some(entry), true) => match entry.public_implementation() {
                None => Err(Error::invalid_argument(format!(
                    "private key manager corresponding to {} is already registered without public key \
                     manager, cannot be re-registered with public key manager.",
                    private_impl
                ))),
                Some(paired) if paired != public_impl => Err(Error::invalid_argument(format!(
                    "private key manager corresponding to {} is already registered with {}, cannot be \
                     re-registered with {}",
                    private_impl, paired, public_impl
                ))),
                Some(_) => {
                    entry.set_new_key_allowed(new_key_allowed);
                    Ok(())
                }
            },
        }
    }

    /// Register a wrapper for its output primitive type.
    ///
    /// Registering the same wrapper type again is a no-op.
    pub fn register_primitive_wrapper<W: PrimitiveWrapper>(&self, wrapper: W) -> Result<()> {
        let output_type = TypeKey::of::<W::Output>();
        let implementation = TypeKey::of::<W>();

        let mut maps = self.write_maps();
        if let Some(existing) = maps.wrappers.get(&output_type) {
            if existing.implementation() != implementation {
                warn!(primitive = %output_type, wrapper = %implementation, "rejected wrapper registration");
                return Err(Error::already_exists(
                    "A wrapper named for this primitive has already been added.",
                ));
            }
            return Ok(());
        }

        let entry = WrapperEntry::new(wrapper);
        debug!(
            primitive = %output_type,
            wrapper = %implementation,
            legacy = entry.wraps_primitive_into_itself(),
            "registered primitive wrapper"
        );
        maps.wrappers.insert(output_type, Arc::new(entry));
        Ok(())
    }

    /// Entry registered under `type_url`
    pub fn key_type_entry(&self, type_url: &str) -> Result<Arc<KeyTypeEntry>> {
        self.read_maps()
            .key_types
            .get(type_url)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("No manager for type '{}' has been registered.", type_url)))
    }

    /// Manager producing `P` primitives for keys of `type_url`
    pub fn key_manager<P: ?Sized + 'static>(&self, type_url: &str) -> Result<Arc<dyn KeyManager<P>>> {
        self.key_type_entry(type_url)?.key_manager::<P>()
    }

    /// Build a `P` primitive from `key_data`
    pub fn primitive<P: ?Sized + 'static>(&self, key_data: &KeyData) -> Result<Box<P>> {
        self.key_manager::<P>(key_data.type_url())?.primitive(key_data)
    }

    /// Generate a new key from `template`
    pub fn new_key_data(&self, template: &KeyTemplate) -> Result<KeyData> {
        let entry = self.key_type_entry(&template.type_url)?;
        if !entry.new_key_allowed() {
            return Err(Error::invalid_argument(format!(
                "KeyManager for type '{}' does not allow creation of new keys.",
                template.type_url
            )));
        }
        entry.key_factory().new_key_data(&template.value)
    }

    /// Derive a key for `template` deterministically from `randomness`
    pub fn derive_key(&self, template: &KeyTemplate, randomness: &mut dyn Read) -> Result<KeyData> {
        self.key_type_entry(&template.type_url)?.derive_key(&template.value, randomness)
    }

    /// Public key data for a serialized private key of `type_url`
    pub fn public_key_data(&self, type_url: &str, serialized_private_key: &[u8]) -> Result<KeyData> {
        self.key_type_entry(type_url)?
            .key_factory()
            .public_key_data(serialized_private_key)
    }

    fn wrapper_entry(&self, primitive: TypeKey) -> Result<Arc<WrapperEntry>> {
        self.read_maps()
            .wrappers
            .get(&primitive)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("No wrapper registered for type {}", primitive)))
    }

    /// Keyset wrapper producing `Q`
    pub fn keyset_wrapper<Q: ?Sized + 'static>(&self) -> Result<Arc<dyn KeysetWrapper<Q>>> {
        self.wrapper_entry(TypeKey::of::<Q>())?.keyset_wrapper::<Q>()
    }

    /// Wrapper combining a set of `P` into one `P`
    pub fn legacy_wrapper<P: ?Sized + 'static>(&self) -> Result<Arc<dyn PrimitiveWrapper<Input = P, Output = P>>> {
        self.wrapper_entry(TypeKey::of::<P>())?.legacy_wrapper::<P>()
    }

    /// Combine a ready-made primitive set
    pub fn wrap<P: ?Sized + 'static>(&self, primitive_set: PrimitiveSet<P>) -> Result<Box<P>> {
        let wrapper = self.legacy_wrapper::<P>()?;
        trace!(primitive = %TypeKey::of::<P>(), primitives = primitive_set.len(), "wrapping primitive set");
        wrapper.wrap(primitive_set)
    }

    /// Resolve every enabled key of `keyset` and combine the primitives
    pub fn wrap_keyset<P: ?Sized + 'static>(
        &self,
        keyset: &Keyset,
        annotations: &HashMap<String, String>,
    ) -> Result<Box<P>> {
        self.keyset_wrapper::<P>()?.wrap(self, keyset, annotations)
    }

    /// Enable FIPS-only mode, provided no key type is registered yet
    pub fn restrict_to_fips_if_empty(&self) -> Result<()> {
        let maps = self.write_maps();
        if self.is_fips_mode_enabled() {
            return Ok(());
        }
        if maps.key_types.is_empty() {
            self.fips_restricted.store(true, Ordering::Release);
            info!("registry restricted to FIPS compatible key managers");
            return Ok(());
        }
        Err(Error::internal("Could not set FIPS only mode. Registry is not empty."))
    }

    /// Install the monitoring client factory. Only one can ever be installed.
    pub fn register_monitoring_client_factory<F>(&self, factory: F) -> Result<()>
    where
        F: MonitoringClientFactory + 'static,
    {
        let mut slot = self.monitoring_slot();
        if slot.is_some() {
            return Err(Error::already_exists("A monitoring factory is already registered"));
        }
        *slot = Some(Arc::new(factory));
        debug!("registered monitoring client factory");
        Ok(())
    }

    pub fn monitoring_client_factory(&self) -> Option<Arc<dyn MonitoringClientFactory>> {
        self.monitoring_slot().clone()
    }

    /// Registered type URLs, sorted
    pub fn registered_key_types(&self) -> Vec<String> {
        let mut key_types: Vec<String> = self.read_maps().key_types.keys().cloned().collect();
        key_types.sort();
        key_types
    }

    /// Forget every key type, wrapper and the monitoring factory.
    ///
    /// Entries already handed out stay usable. FIPS mode is left as is.
    pub fn reset(&self) {
        let mut maps = self.write_maps();
        maps.key_types.clear();
        maps.wrappers.clear();
        *self.monitoring_slot() = None;
        info!("registry reset");
    }
}

fn check_insertable(maps: &Maps, type_url: &str, implementation: TypeKey, _new_key_allowed: bool) -> Result<()> {
    match maps.key_types.get(type_url) {
        Some(entry) if entry.implementation() != implementation => Err(Error::already_exists(format!(
            "A manager for type '{}' has been already registered.",
            type_url
        ))),
        _ => Ok(()),
    }
}

// Global registry instance
static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Process-wide default registry, created on first use
pub fn global() -> &'static Registry {
    &GLOBAL_REGISTRY
}

/// Register a key type manager with the global registry
pub fn register_key_type_manager<M: KeyTypeManager>(manager: M, new_key_allowed: bool) -> Result<()> {
    global().register_key_type_manager(manager, new_key_allowed)
}

/// Register an asymmetric key type pair with the global registry
pub fn register_asymmetric_key_managers<Pr, Pu>(private_manager: Pr, public_manager: Pu, new_key_allowed: bool) -> Result<()>
where
    Pr: PrivateKeyTypeManager,
    Pu: KeyTypeManager,
{
    global().register_asymmetric_key_managers(private_manager, public_manager, new_key_allowed)
}

/// Register a primitive wrapper with the global registry
pub fn register_primitive_wrapper<W: PrimitiveWrapper>(wrapper: W) -> Result<()> {
    global().register_primitive_wrapper(wrapper)
}

/// Build a primitive with the global registry
pub fn primitive<P: ?Sized + 'static>(key_data: &KeyData) -> Result<Box<P>> {
    global().primitive::<P>(key_data)
}

/// Generate a new key with the global registry
pub fn new_key_data(template: &KeyTemplate) -> Result<KeyData> {
    global().new_key_data(template)
}

/// Wrap a keyset with the global registry
pub fn wrap_keyset<P: ?Sized + 'static>(keyset: &Keyset, annotations: &HashMap<String, String>) -> Result<Box<P>> {
    global().wrap_keyset::<P>(keyset, annotations)
}

/// Enable FIPS-only mode on the global registry if it is still empty
pub fn restrict_to_fips_if_empty() -> Result<()> {
    global().restrict_to_fips_if_empty()
}

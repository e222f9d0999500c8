/*!
Primitive wrappers.

A [`PrimitiveWrapper`] combines a [`PrimitiveSet`] of `Input` primitives
into one `Output` primitive. The registry builds a [`KeysetWrapper`] on
top of every registered wrapper, which resolves each key of a keyset
through the registry first.
*/

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::core::{
    error::Result,
    keyset::{KeyStatus, Keyset},
    primitive_set::PrimitiveSet,
    registry::Registry,
};

/// Combines the primitives of a keyset into one primitive
pub trait PrimitiveWrapper: Send + Sync + 'static {
    /// Primitive produced by key managers for each key
    type Input: ?Sized + 'static;

    /// Primitive handed to callers
    type Output: ?Sized + 'static;

    fn wrap(&self, primitive_set: PrimitiveSet<Self::Input>) -> Result<Box<Self::Output>>;
}

/// Wraps a whole keyset into a `Q`
pub trait KeysetWrapper<Q: ?Sized>: Send + Sync {
    fn wrap(
        &self,
        registry: &Registry,
        keyset: &Keyset,
        annotations: &HashMap<String, String>,
    ) -> Result<Box<Q>>;
}

/// Keyset wrapper backed by a [`PrimitiveWrapper`]
pub(crate) struct KeysetWrapperImpl<P: ?Sized, Q: ?Sized> {
    pub(crate) wrapper: Arc<dyn PrimitiveWrapper<Input = P, Output = Q>>,
}

impl<P: ?Sized + 'static, Q: ?Sized + 'static> KeysetWrapper<Q> for KeysetWrapperImpl<P, Q> {
    fn wrap(
        &self,
        registry: &Registry,
        keyset: &Keyset,
        annotations: &HashMap<String, String>,
    ) -> Result<Box<Q>> {
        keyset.validate()?;

        let mut primitive_set = PrimitiveSet::<P>::with_annotations(annotations.clone());
        primitive_set.set_monitoring_factory(registry.monitoring_client_factory());

        for key in keyset.keys.iter().filter(|key| key.status == KeyStatus::Enabled) {
            let primitive = registry.primitive::<P>(&key.key_data)?;
            let handle = primitive_set.add_primitive(primitive, key)?;
            if key.key_id == keyset.primary_key_id {
                primitive_set.set_primary(handle)?;
            }
        }

        trace!(
            primitives = primitive_set.len(),
            annotated = !annotations.is_empty(),
            "wrapping keyset"
        );
        self.wrapper.wrap(primitive_set)
    }
}

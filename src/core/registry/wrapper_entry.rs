/*!
Per-output-type wrapper record.
*/

use std::sync::Arc;

use crate::core::{
    error::{Error, Result},
    registry::{
        type_key::{Erased, TypeKey, downcast_erased, erase},
        wrapper::{KeysetWrapper, KeysetWrapperImpl, PrimitiveWrapper},
    },
};

/// Registered wrapper for one output primitive type.
///
/// Every entry can wrap keysets. Entries whose wrapper maps a primitive
/// type onto itself can additionally wrap a ready-made primitive set
/// (the legacy path).
pub struct WrapperEntry {
    /// Concrete wrapper type, compared on re-registration
    implementation: TypeKey,
    input_type: TypeKey,
    output_type: TypeKey,
    /// `Arc<dyn KeysetWrapper<Output>>`
    keyset_wrapper: Erased,
    /// `Arc<dyn PrimitiveWrapper<Input = Output, Output = Output>>`, only
    /// when input and output types agree
    legacy_wrapper: Option<Erased>,
}

impl WrapperEntry {
    pub(crate) fn new<W: PrimitiveWrapper>(wrapper: W) -> Self {
        let input_type = TypeKey::of::<W::Input>();
        let output_type = TypeKey::of::<W::Output>();
        let wrapper: Arc<dyn PrimitiveWrapper<Input = W::Input, Output = W::Output>> = Arc::new(wrapper);

        let keyset_wrapper: Arc<dyn KeysetWrapper<W::Output>> = Arc::new(KeysetWrapperImpl {
            wrapper: wrapper.clone(),
        });
        let legacy_wrapper = (input_type == output_type).then(|| erase(wrapper));

        Self {
            implementation: TypeKey::of::<W>(),
            input_type,
            output_type,
            keyset_wrapper: erase(keyset_wrapper),
            legacy_wrapper,
        }
    }

    pub fn implementation(&self) -> TypeKey {
        self.implementation
    }

    pub fn input_type(&self) -> TypeKey {
        self.input_type
    }

    pub fn output_type(&self) -> TypeKey {
        self.output_type
    }

    /// Whether the wrapper maps its primitive type onto itself
    pub fn wraps_primitive_into_itself(&self) -> bool {
        self.legacy_wrapper.is_some()
    }

    pub fn keyset_wrapper<Q: ?Sized + 'static>(&self) -> Result<Arc<dyn KeysetWrapper<Q>>> {
        if self.output_type != TypeKey::of::<Q>() {
            return Err(Error::internal("WrapperEntry::keyset_wrapper called with wrong type"));
        }
        downcast_erased::<Arc<dyn KeysetWrapper<Q>>>(&self.keyset_wrapper, "WrapperEntry::keyset_wrapper")
            .cloned()
    }

    pub fn legacy_wrapper<P: ?Sized + 'static>(
        &self,
    ) -> Result<Arc<dyn PrimitiveWrapper<Input = P, Output = P>>> {
        let Some(legacy) = &self.legacy_wrapper else {
            return Err(Error::failed_precondition(format!(
                "Cannot use primitive type {} with a custom key manager.",
                TypeKey::of::<P>()
            )));
        };
        if self.output_type != TypeKey::of::<P>() {
            return Err(Error::internal("WrapperEntry::legacy_wrapper called with wrong type"));
        }
        downcast_erased::<Arc<dyn PrimitiveWrapper<Input = P, Output = P>>>(
            legacy,
            "WrapperEntry::legacy_wrapper",
        )
        .cloned()
    }
}

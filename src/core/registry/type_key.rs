/*!
Runtime type identity and checked downcasts.

The registry keeps handlers for unrelated primitive types in one map.
Each value is stored as `Box<dyn Any + Send + Sync>` next to the
[`TypeKey`] of the type it was created for, and is only handed back out
through [`downcast_erased`], which reports a mismatch as an internal
error instead of trusting the caller.
*/

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::core::error::{Error, Result};

/// Identity of a Rust type, usable as a map key and printable for diagnostics.
///
/// Works for unsized types, so `TypeKey::of::<dyn Aead>()` names the
/// `Aead` primitive.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Type name as reported by the compiler
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Value stored without its static type
pub(crate) type Erased = Box<dyn Any + Send + Sync>;

/// Erase `value`
pub(crate) fn erase<T: Any + Send + Sync>(value: T) -> Erased {
    Box::new(value)
}

/// Recover a `T` from an erased value. `context` names the caller in the
/// error message.
pub(crate) fn downcast_erased<'a, T: Any>(value: &'a Erased, context: &str) -> Result<&'a T> {
    value.downcast_ref::<T>().ok_or_else(|| {
        Error::internal(format!("{} called with wrong type {}", context, type_name::<T>()))
    })
}

/*!
FIPS policy gate.

Whether a key manager is FIPS compliant is decided by the manager itself
and reported as a [`FipsCompatibility`] verdict. The registry only
compares that verdict against its current mode.
*/

use crate::core::error::{Error, Result};

/// FIPS verdict reported by a key manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FipsCompatibility {
    /// Never usable in FIPS-only mode
    NotFips,
    /// Usable in FIPS-only mode when a validated backend is linked in
    RequiresValidatedBackend,
    /// Usable in FIPS-only mode unconditionally
    Compatible,
}

/// Whether the crate was built with FIPS-only mode forced on
pub fn fips_mode_compiled_in() -> bool {
    cfg!(feature = "fips")
}

/// Whether a FIPS-validated cryptographic backend is available.
///
/// The built-in primitives use RustCrypto and pqcrypto implementations,
/// neither of which carries a validation certificate.
pub fn validated_backend_available() -> bool {
    false
}

/// Check a verdict against the current mode
pub(crate) fn check_fips_compatibility(verdict: FipsCompatibility, fips_mode_enabled: bool) -> Result<()> {
    if !fips_mode_enabled {
        return Ok(());
    }
    match verdict {
        FipsCompatibility::Compatible => Ok(()),
        FipsCompatibility::RequiresValidatedBackend if validated_backend_available() => Ok(()),
        FipsCompatibility::RequiresValidatedBackend => Err(Error::internal(
            "Primitive requires a FIPS-validated backend, which is not available.",
        )),
        FipsCompatibility::NotFips => Err(Error::internal("Primitive not available in FIPS only mode.")),
    }
}

/// Whether a manager with this verdict may be registered in FIPS-only mode
pub fn allowed_in_fips_mode(verdict: FipsCompatibility) -> bool {
    check_fips_compatibility(verdict, true).is_ok()
}

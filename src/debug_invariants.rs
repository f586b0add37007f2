//! Invariant checking for meshes, coordinates and connectivity arrays.
//!
//! Checks run after every mutation when `debug_assertions` is on, or when the
//! `check-invariants` / `strict-invariants` features are enabled. Release
//! builds without those features only pay for explicit
//! [`validate_invariants`](DebugInvariants::validate_invariants) calls.

use crate::mesh_error::MeshError;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "structure invalid");
    }
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), MeshError>;
}

/// Validate `value` and hand it back, for builders fed with caller arrays.
pub fn validated<T: DebugInvariants>(value: T) -> Result<T, MeshError> {
    value.validate_invariants()?;
    Ok(value)
}

/// Helper macro to run a fallible check and panic on error when invariant
/// checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}

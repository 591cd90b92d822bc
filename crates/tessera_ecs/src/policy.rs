//! # Build-Mode Error Policy
//!
//! Contract violations are fatal in debug builds. Release builds log the
//! violation and continue with a safe default (an empty query result, a
//! skipped system).
//!
//! The switch is the build profile, never per-call configuration. Callers
//! that want the error itself use the `try_` forms.

use crate::error::{EcsError, EcsResult};

/// Applies the build-mode policy to a contract violation.
///
/// # Panics
///
/// Panics when compiled with `debug_assertions`.
#[inline]
pub fn recover<T>(context: &str, err: EcsError, fallback: T) -> T {
    if cfg!(debug_assertions) {
        panic!("{context}: {err}");
    }
    tracing::error!(error = %err, "{context}; continuing with default");
    fallback
}

/// Unwraps `result`, recovering with `T::default()` on error.
///
/// # Panics
///
/// Panics on error when compiled with `debug_assertions`.
#[inline]
pub fn settle<T: Default>(context: &str, result: EcsResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => recover(context, err, T::default()),
    }
}

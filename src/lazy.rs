//! The compute-once, shared cache behind each compilation unit's decoded
//! abbreviations.

use std::sync::{Arc, Mutex};

/// A value computed at most once and then shared.
///
/// `CuContext` holds one of these for its abbreviation table, so every entry
/// of a unit resolves against the same decoded table no matter which
/// navigation path first needed it.
#[derive(Debug, Default)]
pub(crate) struct LazyArc<T> {
    value: Mutex<Option<Arc<T>>>,
}

impl<T> LazyArc<T> {
    /// Return the cached value, computing it with `f` on first use.
    ///
    /// A failed computation is not cached, so a later call may retry it.
    pub(crate) fn get<E, F: FnOnce() -> Result<T, E>>(&self, f: F) -> Result<Arc<T>, E> {
        let mut lock = self.value.lock().unwrap();
        if let Some(value) = &*lock {
            return Ok(value.clone());
        }
        let value = f().map(Arc::new)?;
        *lock = Some(value.clone());
        Ok(value)
    }
}

//! Process-local approximate-membership admission filter gating entity
//! reads: a Bloom-like structure consulted before every
//! `Node`/`Relation` byte-store read.

use crate::{Error, Result};
use bloomfilter::Bloom;
use parking_lot::RwLock;

/// Bloom-filter-backed admission control.
///
/// Sized from `estimated_keys`/`fp_rate` at construction and rebuilt fresh
/// on every process start — deletion is not supported; false positives are
/// acceptable and simply fall through to a real store read. Guarded by a
/// `parking_lot::RwLock` rather than a `Mutex` so concurrent `test` calls on
/// the (more frequent) read path don't serialise against each other.
pub struct AdmissionFilter {
    inner: RwLock<Bloom<String>>,
}

impl AdmissionFilter {
    /// Builds a filter sized for `estimated_keys` distinct entries at the
    /// target `fp_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `fp_rate` is outside `(0, 1)`
    /// or `estimated_keys` is zero.
    pub fn new(estimated_keys: usize, fp_rate: f64) -> Result<Self> {
        let items = estimated_keys.max(1);
        let bloom = Bloom::new_for_fp_rate(items, fp_rate).map_err(|e| {
            Error::InvalidParameter(format!("invalid admission filter parameters: {e}"))
        })?;
        Ok(Self {
            inner: RwLock::new(bloom),
        })
    }

    /// Tests whether `key` may be present. A `false` result means the key
    /// is definitely absent and the byte-store read can be skipped
    /// entirely; a `true` result may be a false positive.
    #[must_use]
    pub fn test(&self, key: &str) -> bool {
        self.inner.read().check(&key.to_string())
    }

    /// Unconditionally records `key` as present, including on placeholder
    /// writes, so negative caching still benefits from admission.
    pub fn insert(&self, key: &str) {
        self.inner.write().set(&key.to_string());
    }
}

//! Byte Store abstraction: opaque key/value storage with TTL, an entity
//! overlay handling marshalling and the `NilMarker` placeholder protocol,
//! and the canonical ID-list envelope composite queries cache.

use crate::cache::admission::AdmissionFilter;
use crate::{Error, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Reserved payload marking "authoritatively absent" for entity keys.
pub const NIL_VALUE: &[u8] = b"\0gcr:NIL\0";

/// Reserved payload for an empty cached `SearchNodes` result.
pub const EMPTY_SEARCH: &[u8] = b"\0gcr:EMPTY_SEARCH\0";
/// Reserved payload for an empty cached `GetNetwork` result.
pub const EMPTY_NETWORK: &[u8] = b"\0gcr:EMPTY_NETWORK\0";
/// Reserved payload for an empty cached `GetPath` result (not-found).
pub const EMPTY_PATH: &[u8] = b"\0gcr:EMPTY_PATH\0";
/// Reserved payload for an empty cached `GetNodeRelations` result.
pub const EMPTY_REL_LIST: &[u8] = b"\0gcr:EMPTY_REL_LIST\0";

/// Outcome of a raw byte-store read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    /// The key held the reserved [`NIL_VALUE`] placeholder.
    NilMarker,
    /// The key was absent.
    Miss,
    /// The key held `bytes`, a non-placeholder payload.
    Hit(Vec<u8>),
}

/// Opaque key/value store with TTL.
///
/// Implementations MUST translate a payload equal to [`NIL_VALUE`] into
/// [`GetOutcome::NilMarker`] rather than [`GetOutcome::Hit`] — callers rely
/// on this to avoid deserializing the sentinel as a domain entity.
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Reads the raw payload at `key`.
    async fn get(&self, key: &str) -> Result<GetOutcome>;

    /// Writes `value` at `key` with `ttl`. Callers are responsible for
    /// applying TTL jitter (see [`jittered_ttl`]) before calling this.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Deletes `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Applies TTL jitter: `effective = base + uniform(0, base * jitter_fraction)`.
#[must_use]
pub fn jittered_ttl(base: Duration, jitter_fraction: f64) -> Duration {
    if jitter_fraction <= 0.0 {
        return base;
    }
    let spread = base.as_secs_f64() * jitter_fraction;
    if spread <= 0.0 {
        return base;
    }
    let extra = rand::rng().random_range(0.0..=spread);
    Duration::from_secs_f64(base.as_secs_f64() + extra)
}

/// Outcome of an entity-overlay read: distinguishes a decoded hit from an
/// authoritative absence, a plain cache miss, and an admission-filter
/// rejection (the latter never reaches the store at all).
#[derive(Debug)]
pub enum EntityOutcome<T> {
    /// The entity was cached and decoded successfully.
    Hit(T),
    /// The key held a `NilMarker`: the DAL previously reported not-found.
    NilMarker,
    /// The key was absent from the store.
    Miss,
    /// The admission filter tested negative; the store was never consulted.
    FilterRejected,
}

/// Reads and decodes an entity-typed cache entry, consulting the admission
/// filter first.
///
/// # Errors
///
/// Returns [`Error::Corruption`] if the payload fails to decode; the caller
/// is expected to delete the entry and treat the read as a miss.
pub async fn get_entity<T: DeserializeOwned>(
    store: &dyn ByteStore,
    filter: &AdmissionFilter,
    key: &str,
) -> Result<EntityOutcome<T>> {
    if !filter.test(key) {
        return Ok(EntityOutcome::FilterRejected);
    }

    match store.get(key).await? {
        GetOutcome::NilMarker => Ok(EntityOutcome::NilMarker),
        GetOutcome::Miss => Ok(EntityOutcome::Miss),
        GetOutcome::Hit(bytes) => serde_json::from_slice(&bytes)
            .map(EntityOutcome::Hit)
            .map_err(|e| Error::Corruption {
                key: key.to_string(),
                cause: e.to_string(),
            }),
    }
}

/// Marshals and writes an entity-typed cache entry, unconditionally
/// inserting `key` into the admission filter.
pub async fn set_entity<T: Serialize + Sync>(
    store: &dyn ByteStore,
    filter: &AdmissionFilter,
    key: &str,
    value: &T,
    ttl: Duration,
    jitter_fraction: f64,
) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(|e| Error::Corruption {
        key: key.to_string(),
        cause: e.to_string(),
    })?;
    filter.insert(key);
    store.set(key, bytes, jittered_ttl(ttl, jitter_fraction)).await
}

/// Writes the [`NIL_VALUE`] placeholder at `key`, unconditionally inserting
/// `key` into the admission filter so negative caching still benefits from
/// quick admission.
pub async fn set_nil_marker(
    store: &dyn ByteStore,
    filter: &AdmissionFilter,
    key: &str,
    ttl: Duration,
    jitter_fraction: f64,
) -> Result<()> {
    filter.insert(key);
    store
        .set(key, NIL_VALUE.to_vec(), jittered_ttl(ttl, jitter_fraction))
        .await
}

/// The canonical cached payload for composite queries: an ordered id list
/// plus an optional total, preceding any family-specific placeholder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
pub struct IdListEnvelope {
    /// Ordered node ids.
    pub node_ids: Vec<String>,
    /// Ordered relation ids; empty for families with no relations (search,
    /// node-relations uses this field for its relation ids instead).
    #[serde(default)]
    pub relation_ids: Vec<String>,
    /// Total match count before pagination; absent for families (network,
    /// path) that don't report one.
    #[serde(default)]
    pub total: Option<usize>,
}

impl IdListEnvelope {
    /// Encodes the envelope to its wire representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corruption`] if serialization fails (unexpected for
    /// this type, but kept fallible for symmetry with [`Self::decode`]).
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Corruption {
            key: String::new(),
            cause: e.to_string(),
        })
    }

    /// Decodes an envelope previously written by [`Self::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corruption`] naming `key` if the payload fails to
    /// decode.
    pub fn decode(bytes: &[u8], key: &str) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Corruption {
            key: key.to_string(),
            cause: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_ttl_never_shrinks_base() {
        let base = Duration::from_secs(300);
        for _ in 0..50 {
            let jittered = jittered_ttl(base, 0.10);
            assert!(jittered >= base);
            assert!(jittered <= base + Duration::from_secs(30));
        }
    }

    #[test]
    fn jittered_ttl_is_identity_when_jitter_is_zero() {
        let base = Duration::from_secs(300);
        assert_eq!(jittered_ttl(base, 0.0), base);
    }

    #[test]
    fn envelope_round_trips() {
        let env = IdListEnvelope {
            node_ids: vec!["a".to_string(), "b".to_string()],
            relation_ids: vec!["r1".to_string()],
            total: Some(2),
        };
        let bytes = env.encode().unwrap();
        let decoded = IdListEnvelope::decode(&bytes, "k").unwrap();
        assert_eq!(env, decoded);
    }

    #[test]
    fn envelope_decode_reports_corruption_with_key() {
        let err = IdListEnvelope::decode(b"not json", "search:ids:x").unwrap_err();
        match err {
            Error::Corruption { key, .. } => assert_eq!(key, "search:ids:x"),
            other => panic!("expected Corruption, got {other:?}"),
        }
    }
}

//! In-process `ByteStore` backend for tests and single-process embedding.
//!
//! Uses the same `RwLock<HashMap<..>>` pattern as `dal::memory`: one lock
//! per store, held only for the duration of the map operation, never across
//! an `.await`.

use crate::cache::store::{ByteStore, GetOutcome, NIL_VALUE};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Lock-guarded `HashMap` byte store with lazy expiry: an expired entry is
/// treated as a miss on read and reaped at that point.
#[derive(Default)]
pub struct InMemoryByteStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryByteStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned(operation: &str) -> Error {
        Error::StoreFailure {
            operation: operation.to_string(),
            cause: "lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl ByteStore for InMemoryByteStore {
    async fn get(&self, key: &str) -> Result<GetOutcome> {
        let now = Instant::now();
        let mut guard = self.entries.write().map_err(|_| Self::poisoned("get"))?;
        match guard.get(key) {
            None => Ok(GetOutcome::Miss),
            Some(entry) if entry.expires_at <= now => {
                guard.remove(key);
                Ok(GetOutcome::Miss)
            }
            Some(entry) if entry.value == NIL_VALUE => Ok(GetOutcome::NilMarker),
            Some(entry) => Ok(GetOutcome::Hit(entry.value.clone())),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now() + ttl;
        let mut guard = self.entries.write().map_err(|_| Self::poisoned("set"))?;
        guard.insert(
            key.to_string(),
            Entry {
                value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut guard = self.entries.write().map_err(|_| Self::poisoned("delete"))?;
        guard.remove(key);
        Ok(())
    }
}

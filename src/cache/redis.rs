//! Redis-backed `ByteStore`, built on `redis::aio::ConnectionManager` for
//! automatic reconnection under a shared, cheaply cloned handle.

use crate::cache::store::{ByteStore, GetOutcome, NIL_VALUE};
use crate::{Error, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Byte store backed by a Redis (or Redis-compatible) server.
///
/// `ConnectionManager` is cheaply `Clone`: cloning shares the underlying
/// multiplexed connection and automatic-reconnect state rather than opening
/// a new socket.
#[derive(Clone)]
pub struct RedisByteStore {
    manager: ConnectionManager,
}

impl RedisByteStore {
    /// Connects to `redis_url` (e.g. `redis://127.0.0.1/0`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreFailure`] if the URL is malformed or the
    /// initial connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| Error::StoreFailure {
            operation: "connect".to_string(),
            cause: e.to_string(),
        })?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::StoreFailure {
                operation: "connect".to_string(),
                cause: e.to_string(),
            })?;
        Ok(Self { manager })
    }
}

fn store_err(operation: &'static str, cause: redis::RedisError) -> Error {
    Error::StoreFailure {
        operation: operation.to_string(),
        cause: cause.to_string(),
    }
}

#[async_trait]
impl ByteStore for RedisByteStore {
    async fn get(&self, key: &str) -> Result<GetOutcome> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| store_err("get", e))?;
        Ok(match value {
            None => GetOutcome::Miss,
            Some(bytes) if bytes == NIL_VALUE => GetOutcome::NilMarker,
            Some(bytes) => GetOutcome::Hit(bytes),
        })
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);
        let (): () = conn
            .set_ex(key, value, seconds)
            .await
            .map_err(|e| store_err("set", e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let (): () = conn.del(key).await.map_err(|e| store_err("delete", e))?;
        Ok(())
    }
}

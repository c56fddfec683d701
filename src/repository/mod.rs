//! The Entity Repository and Composite Query Engine: the two
//! layers that tie the Key Coder, Byte Store, and Graph DAL contract
//! together into the read-aside/write-invalidate protocol described in the
//! crate's module docs.
//!
//! [`Repository`] is generic over its [`ByteStore`] and [`GraphDal`]
//! backends rather than boxed behind `dyn`, so an embedder pays no vtable
//! cost for swapping `InMemoryByteStore`/`InMemoryGraphDal` for
//! `RedisByteStore`/a production driver.

mod composite;
mod entity;

use crate::cache::{AdmissionFilter, ByteStore, KeyCoder};
use crate::config::RepositoryConfig;
use crate::dal::GraphDal;
use crate::observability::metrics;
use crate::Result;
use std::future::Future;
use std::time::Instant;

/// Ties the cache tier and the graph DAL contract
/// together behind the read-aside/write-invalidate protocol and the
/// composite-query ID-list caching scheme.
pub struct Repository<S, D> {
    store: S,
    dal: D,
    filter: AdmissionFilter,
    keys: KeyCoder,
    config: RepositoryConfig,
}

impl<S, D> Repository<S, D>
where
    S: ByteStore,
    D: GraphDal,
{
    /// Builds a repository over `store` and `dal`, sizing the admission
    /// filter from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidParameter`] if the admission filter's
    /// configured `fp_rate`/`estimated_keys` are invalid.
    pub fn new(store: S, dal: D, config: RepositoryConfig) -> Result<Self> {
        let filter = AdmissionFilter::new(config.filter_estimated_keys, config.filter_fp_rate)?;
        let keys = KeyCoder::new(config.cache_prefix.clone());
        Ok(Self {
            store,
            dal,
            filter,
            keys,
            config,
        })
    }

    /// Returns the repository's configuration.
    #[must_use]
    pub const fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Times a DAL call, recording its latency under `operation` regardless
    /// of outcome.
    pub(super) async fn time_dal<F: Future>(operation: &'static str, fut: F) -> F::Output {
        let start = Instant::now();
        let result = fut.await;
        metrics::record_dal_latency(operation, start.elapsed().as_secs_f64());
        result
    }
}

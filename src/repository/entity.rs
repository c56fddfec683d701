//! Entity Repository: read-aside on node/relation details, write-invalidate
//! on update/delete.

use super::Repository;
use crate::cache::{ByteStore, EntityOutcome, get_entity, jittered_ttl, set_entity, set_nil_marker};
use crate::dal::GraphDal;
use crate::models::graph::{
    CreateNodeRequest, CreateRelationRequest, Node, Relation, UpdateNodeRequest,
    UpdateRelationRequest,
};
use crate::observability::metrics;
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{instrument, warn};

impl<S, D> Repository<S, D>
where
    S: ByteStore,
    D: GraphDal,
{
    /// Reads a single entity-typed cache entry, absorbing corruption and
    /// store failures into a plain miss so a read can always fall back to
    /// the DAL: cache failures never fail a read.
    async fn read_entity<T: DeserializeOwned>(&self, key: &str, family: &'static str) -> ReadOutcome<T> {
        match get_entity::<T>(&self.store, &self.filter, key).await {
            Ok(EntityOutcome::Hit(value)) => {
                metrics::record_cache_hit(family);
                ReadOutcome::Hit(value)
            }
            Ok(EntityOutcome::NilMarker) => {
                metrics::record_cache_negative_hit(family);
                ReadOutcome::NilMarker
            }
            Ok(EntityOutcome::Miss) => {
                metrics::record_cache_miss(family);
                ReadOutcome::Miss
            }
            Ok(EntityOutcome::FilterRejected) => {
                metrics::record_admission_rejected(family);
                ReadOutcome::Miss
            }
            Err(Error::Corruption { key, cause }) => {
                warn!(key, cause, "cached entity payload corrupted, deleting and re-executing as miss");
                if let Err(e) = self.store.delete(&key).await {
                    warn!(key, error = %e, "failed to delete corrupted cache entry");
                }
                metrics::record_cache_miss(family);
                ReadOutcome::Miss
            }
            Err(e) => {
                warn!(error = %e, family, "byte store read failed, falling back to DAL");
                metrics::record_store_failure("get");
                ReadOutcome::Miss
            }
        }
    }

    /// Writes an entity-typed cache entry, logging (never propagating)
    /// failure.
    async fn write_entity<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        if let Err(e) = set_entity(
            &self.store,
            &self.filter,
            key,
            value,
            ttl,
            self.config.ttl_jitter_fraction,
        )
        .await
        {
            warn!(key, error = %e, "failed to write entity cache entry");
            metrics::record_store_failure("set");
        }
    }

    /// Writes a `NilMarker` placeholder, logging (never propagating)
    /// failure.
    async fn write_nil_marker(&self, key: &str) {
        if let Err(e) = set_nil_marker(
            &self.store,
            &self.filter,
            key,
            Duration::from_secs(self.config.ttl_nil_marker_secs),
            self.config.ttl_jitter_fraction,
        )
        .await
        {
            warn!(key, error = %e, "failed to write NilMarker placeholder");
            metrics::record_store_failure("set");
        }
    }

    /// Best-effort write-invalidate: deletes `key`, logging (never
    /// propagating) failure. The stale entry remains until TTL if this
    /// fails.
    async fn invalidate(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            warn!(key, error = %e, "write-invalidate delete failed, stale entry remains until TTL");
            metrics::record_store_failure("delete");
        }
    }

    /// Reads a node by id: cache hit returns immediately; a miss consults
    /// the DAL, caches the outcome (detail on success, a short-TTL
    /// `NilMarker` on not-found), and returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the node does not exist, or
    /// propagates a DAL failure.
    #[instrument(skip(self), fields(node_id = %id))]
    pub async fn get_node(&self, id: &str) -> Result<Node> {
        let key = self.keys.node(id);
        match self.read_entity::<Node>(&key, "node").await {
            ReadOutcome::Hit(node) => Ok(node),
            ReadOutcome::NilMarker => Err(Error::NotFound(format!("node {id}"))),
            ReadOutcome::Miss => match Self::time_dal("get_node_by_id", self.dal.get_node_by_id(id)).await {
                Ok(node) => {
                    self.write_entity(&key, &node, Duration::from_secs(self.config.ttl_node_secs))
                        .await;
                    Ok(node)
                }
                Err(e) if e.is_not_found() => {
                    self.write_nil_marker(&key).await;
                    Err(e)
                }
                Err(e) => Err(e),
            },
        }
    }

    /// Creates a node via the DAL. No cache write: new entities are likely
    /// not yet queried, so priming the cache would waste capacity on
    /// never-read records.
    ///
    /// # Errors
    ///
    /// Propagates DAL failure.
    pub async fn create_node(&self, request: CreateNodeRequest) -> Result<Node> {
        Self::time_dal("create_node", self.dal.create_node(request)).await
    }

    /// Updates a node via the DAL, then write-invalidates its cache entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the node does not exist, or
    /// propagates a DAL failure.
    pub async fn update_node(&self, request: UpdateNodeRequest) -> Result<Node> {
        let id = request.id.clone();
        let node = Self::time_dal("update_node", self.dal.update_node(request)).await?;
        self.invalidate(&self.keys.node(&id)).await;
        Ok(node)
    }

    /// Deletes a node via the DAL (cascading to incident relations,
    /// storage-enforced), then write-invalidates its cache entry
    /// regardless of DAL outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the node does not exist, or
    /// propagates a DAL failure. The invalidation attempt happens either
    /// way.
    pub async fn delete_node(&self, id: &str) -> Result<()> {
        let result = Self::time_dal("delete_node", self.dal.delete_node(id)).await;
        self.invalidate(&self.keys.node(id)).await;
        result
    }

    /// Reads a relation by id, mirroring [`Self::get_node`]'s protocol.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the relation does not exist, or
    /// propagates a DAL failure.
    #[instrument(skip(self), fields(relation_id = %id))]
    pub async fn get_relation(&self, id: &str) -> Result<Relation> {
        let key = self.keys.relation(id);
        match self.read_entity::<Relation>(&key, "relation").await {
            ReadOutcome::Hit(relation) => Ok(relation),
            ReadOutcome::NilMarker => Err(Error::NotFound(format!("relation {id}"))),
            ReadOutcome::Miss => match Self::time_dal("get_relation_by_id", self.dal.get_relation_by_id(id)).await {
                Ok(relation) => {
                    self.write_entity(
                        &key,
                        &relation,
                        Duration::from_secs(self.config.ttl_relation_secs),
                    )
                    .await;
                    Ok(relation)
                }
                Err(e) if e.is_not_found() => {
                    self.write_nil_marker(&key).await;
                    Err(e)
                }
                Err(e) => Err(e),
            },
        }
    }

    /// Creates a relation via the DAL. No cache write, mirroring
    /// [`Self::create_node`].
    ///
    /// # Errors
    ///
    /// Propagates DAL failure (including a missing source/target node).
    pub async fn create_relation(&self, request: CreateRelationRequest) -> Result<Relation> {
        Self::time_dal("create_relation", self.dal.create_relation(request)).await
    }

    /// Updates a relation via the DAL, then write-invalidates its cache
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the relation does not exist, or
    /// propagates a DAL failure.
    pub async fn update_relation(&self, request: UpdateRelationRequest) -> Result<Relation> {
        let id = request.id.clone();
        let relation = Self::time_dal("update_relation", self.dal.update_relation(request)).await?;
        self.invalidate(&self.keys.relation(&id)).await;
        Ok(relation)
    }

    /// Deletes a relation via the DAL, then write-invalidates its cache
    /// entry regardless of DAL outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the relation does not exist, or
    /// propagates a DAL failure.
    pub async fn delete_relation(&self, id: &str) -> Result<()> {
        let result = Self::time_dal("delete_relation", self.dal.delete_relation(id)).await;
        self.invalidate(&self.keys.relation(id)).await;
        result
    }

    /// Rehydrates node ids into domain [`Node`]s with a per-query
    /// concurrency cap, honouring the consistency policy for cached
    /// ID-lists whose entries may have since been deleted.
    ///
    /// When `strict` is `false` (search, node-relations, network), a
    /// [`Error::NotFound`]/`NilMarker`-shaped miss is skipped silently.
    /// When `strict` is `true` (path), any such miss aborts the whole
    /// rehydration, since path integrity cannot be preserved when any step
    /// is gone.
    pub(super) async fn rehydrate_nodes(&self, ids: &[String], strict: bool) -> Result<Vec<Node>> {
        let chunk_size = self.config.rehydration_concurrency.max(1);
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(chunk_size) {
            let futures = chunk.iter().map(|id| self.get_node(id));
            for result in futures::future::join_all(futures).await {
                match result {
                    Ok(node) => out.push(node),
                    Err(e) if e.is_not_found() => {
                        if strict {
                            return Err(Error::NotFound(format!(
                                "path rehydration aborted: {e}"
                            )));
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(out)
    }

    /// Rehydrates relation ids into domain [`Relation`]s, mirroring
    /// [`Self::rehydrate_nodes`]'s consistency policy.
    pub(super) async fn rehydrate_relations(
        &self,
        ids: &[String],
        strict: bool,
    ) -> Result<Vec<Relation>> {
        let chunk_size = self.config.rehydration_concurrency.max(1);
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(chunk_size) {
            let futures = chunk.iter().map(|id| self.get_relation(id));
            for result in futures::future::join_all(futures).await {
                match result {
                    Ok(relation) => out.push(relation),
                    Err(e) if e.is_not_found() => {
                        if strict {
                            return Err(Error::NotFound(format!(
                                "path rehydration aborted: {e}"
                            )));
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(out)
    }

    /// Applies TTL jitter using this repository's configured fraction.
    pub(super) fn jittered(&self, base: Duration) -> Duration {
        jittered_ttl(base, self.config.ttl_jitter_fraction)
    }
}

enum ReadOutcome<T> {
    Hit(T),
    NilMarker,
    Miss,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryByteStore;
    use crate::config::RepositoryConfig;
    use crate::dal::InMemoryGraphDal;
    use crate::models::graph::NodeType;

    fn repo() -> Repository<InMemoryByteStore, InMemoryGraphDal> {
        Repository::new(
            InMemoryByteStore::new(),
            InMemoryGraphDal::new(),
            RepositoryConfig::default(),
        )
        .unwrap()
    }

    fn create_request(node_type: NodeType, name: &str) -> CreateNodeRequest {
        CreateNodeRequest {
            node_type: Some(node_type),
            name: name.to_string(),
            avatar: None,
            profession: None,
            properties: None,
        }
    }

    #[tokio::test]
    async fn get_node_caches_after_first_miss() {
        let repo = repo();
        let created = repo
            .create_node(create_request(NodeType::Person, "Alice"))
            .await
            .unwrap();

        let first = repo.get_node(&created.id).await.unwrap();
        assert_eq!(first.name, "Alice");

        // The cache entry now exists even though the DAL has not changed;
        // a second read must return the same value from the cache path.
        let second = repo.get_node(&created.id).await.unwrap();
        assert_eq!(second.name, "Alice");
    }

    #[tokio::test]
    async fn get_node_not_found_caches_nil_marker() {
        let repo = repo();
        assert!(repo.get_node("missing").await.unwrap_err().is_not_found());
        // Second read should still be NotFound (served by the NilMarker).
        assert!(repo.get_node("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_node_invalidates_cache() {
        let repo = repo();
        let created = repo
            .create_node(create_request(NodeType::Person, "Alice"))
            .await
            .unwrap();
        repo.get_node(&created.id).await.unwrap();

        repo.update_node(UpdateNodeRequest {
            id: created.id.clone(),
            name: Some("Alicia".to_string()),
            avatar: None,
            profession: None,
            properties: None,
        })
        .await
        .unwrap();

        let refreshed = repo.get_node(&created.id).await.unwrap();
        assert_eq!(refreshed.name, "Alicia");
    }

    #[tokio::test]
    async fn delete_node_then_get_is_not_found() {
        let repo = repo();
        let created = repo
            .create_node(create_request(NodeType::Person, "Alice"))
            .await
            .unwrap();
        repo.get_node(&created.id).await.unwrap();
        repo.delete_node(&created.id).await.unwrap();
        assert!(repo.get_node(&created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_node_twice_yields_not_found_second_time() {
        let repo = repo();
        let created = repo
            .create_node(create_request(NodeType::Person, "Alice"))
            .await
            .unwrap();
        repo.delete_node(&created.id).await.unwrap();
        assert!(repo.delete_node(&created.id).await.unwrap_err().is_not_found());
    }
}

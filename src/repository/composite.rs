//! Composite Query Engine: ID-list caching for `SearchNodes`,
//! `GetNetwork`, `GetPath`, and `GetNodeRelations`, negative-result caching
//! via family-specific empty placeholders, and detail rehydration through
//! the Entity Repository.

use super::Repository;
use crate::cache::{
    ByteStore, EMPTY_NETWORK, EMPTY_PATH, EMPTY_REL_LIST, EMPTY_SEARCH, GetOutcome, IdListEnvelope,
    key::type_tag,
};
use crate::dal::GraphDal;
use crate::models::graph::{
    GetNetworkRequest, GetNodeRelationsRequest, GetPathRequest, Node, NodeRelations, Path,
    Relation, RelationDirection, SearchNodesRequest, SearchResult, Subgraph,
    validate_search_criteria,
};
use crate::observability::metrics;
use crate::{Error, Result};
use std::time::Duration;
use tracing::{instrument, warn};

/// Outcome of probing a composite-query cache key.
enum CompositeProbe {
    /// The family-specific empty placeholder was stored.
    Empty,
    /// A decoded [`IdListEnvelope`].
    Envelope(IdListEnvelope),
    /// No entry (or a store failure absorbed into a miss).
    Miss,
}

impl<S, D> Repository<S, D>
where
    S: ByteStore,
    D: GraphDal,
{
    /// Reads the raw payload at `key`, distinguishing the family's empty
    /// placeholder from a decoded envelope from a genuine miss.
    ///
    /// Composite keys are never gated by the admission filter:
    /// emptiness is distinguished by payload inspection, not by a
    /// `NilMarker`, so a stray `NilMarker` read here is treated the same as
    /// a miss.
    async fn probe_composite(&self, key: &str, empty_marker: &[u8], family: &'static str) -> CompositeProbe {
        match self.store.get(key).await {
            Ok(GetOutcome::Hit(bytes)) if bytes == empty_marker => {
                metrics::record_cache_negative_hit(family);
                CompositeProbe::Empty
            }
            Ok(GetOutcome::Hit(bytes)) => match IdListEnvelope::decode(&bytes, key) {
                Ok(envelope) => {
                    metrics::record_cache_hit(family);
                    CompositeProbe::Envelope(envelope)
                }
                Err(Error::Corruption { key, cause }) => {
                    warn!(key, cause, "cached id-list envelope corrupted, deleting and re-executing as miss");
                    if let Err(e) = self.store.delete(&key).await {
                        warn!(key, error = %e, "failed to delete corrupted id-list entry");
                    }
                    metrics::record_cache_miss(family);
                    CompositeProbe::Miss
                }
                Err(_) => CompositeProbe::Miss,
            },
            Ok(GetOutcome::Miss | GetOutcome::NilMarker) => {
                metrics::record_cache_miss(family);
                CompositeProbe::Miss
            }
            Err(e) => {
                warn!(error = %e, family, "byte store read failed, falling back to DAL");
                metrics::record_store_failure("get");
                CompositeProbe::Miss
            }
        }
    }

    /// Writes an encoded [`IdListEnvelope`] (or, when the result is empty,
    /// the family's placeholder), logging (never propagating) failure.
    async fn write_composite(
        &self,
        key: &str,
        envelope: Option<&IdListEnvelope>,
        empty_marker: &[u8],
        ttl: Duration,
    ) {
        let (payload, ttl) = match envelope {
            Some(envelope) => match envelope.encode() {
                Ok(bytes) => (bytes, ttl),
                Err(e) => {
                    warn!(key, error = %e, "failed to encode id-list envelope");
                    return;
                }
            },
            None => (
                empty_marker.to_vec(),
                Duration::from_secs(self.config.ttl_empty_placeholder_secs),
            ),
        };
        if let Err(e) = self.store.set(key, payload, self.jittered(ttl)).await {
            warn!(key, error = %e, "failed to write id-list cache entry");
            metrics::record_store_failure("set");
        }
    }

    /// Searches nodes by criteria, caching the resulting id list (or a
    /// negative placeholder) keyed by the canonicalised request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `request.criteria` contains a
    /// key outside [`crate::models::graph::ALLOWED_SEARCH_CRITERIA`], or
    /// propagates a DAL failure.
    #[instrument(skip(self, request))]
    pub async fn search_nodes(&self, request: SearchNodesRequest) -> Result<(Vec<Node>, usize)> {
        validate_search_criteria(&request.criteria)?;
        let limit = request.limit.unwrap_or(self.config.search_nodes_default_limit);
        let offset = request.offset.unwrap_or(0);
        let tag = type_tag(request.node_type);
        let key = self.keys.search_nodes(&request.criteria, &tag, limit, offset);

        match self.probe_composite(&key, EMPTY_SEARCH, "search").await {
            CompositeProbe::Empty => Ok((Vec::new(), 0)),
            CompositeProbe::Envelope(envelope) => {
                let nodes = self.rehydrate_nodes(&envelope.node_ids, false).await?;
                Ok((nodes, envelope.total.unwrap_or(0)))
            }
            CompositeProbe::Miss => {
                let (nodes, total) = Self::time_dal(
                    "search_nodes",
                    self.dal.search_nodes(&request.criteria, request.node_type, limit, offset),
                )
                .await?;
                let envelope = (!nodes.is_empty()).then(|| IdListEnvelope {
                    node_ids: nodes.iter().map(|n| n.id.clone()).collect(),
                    relation_ids: Vec::new(),
                    total: Some(total),
                });
                self.write_composite(
                    &key,
                    envelope.as_ref(),
                    EMPTY_SEARCH,
                    Duration::from_secs(self.config.ttl_search_secs),
                )
                .await;
                Ok((nodes, total))
            }
        }
    }

    /// Convenience wrapper returning [`SearchResult`] instead of a raw
    /// tuple, for callers that prefer the named composite type.
    pub async fn search_nodes_result(&self, request: SearchNodesRequest) -> Result<SearchResult> {
        let (nodes, total) = self.search_nodes(request).await?;
        Ok(SearchResult {
            node_ids: nodes.into_iter().map(|n| n.id).collect(),
            total,
        })
    }

    /// Expands the bounded neighbourhood from nodes matching
    /// `request.start_criteria`, caching the resulting subgraph id list.
    ///
    /// # Errors
    ///
    /// Propagates a DAL failure.
    #[instrument(skip(self, request))]
    pub async fn get_network(&self, request: GetNetworkRequest) -> Result<(Vec<Node>, Vec<Relation>)> {
        let depth = request
            .depth
            .unwrap_or(1)
            .min(self.config.get_network_max_depth);
        let limit = request.limit.unwrap_or(100);
        let offset = request.offset.unwrap_or(0);
        let rel_types = non_empty(&request.relation_types);
        let node_types = non_empty(&request.node_types);

        let key = self.keys.network(
            &request.start_criteria,
            request.relation_types.as_deref().unwrap_or(&[]),
            request.node_types.as_deref().unwrap_or(&[]),
            depth,
            limit,
            offset,
        );

        match self.probe_composite(&key, EMPTY_NETWORK, "network").await {
            CompositeProbe::Empty => Ok((Vec::new(), Vec::new())),
            CompositeProbe::Envelope(envelope) => {
                let nodes = self.rehydrate_nodes(&envelope.node_ids, false).await?;
                let relations = self.rehydrate_relations(&envelope.relation_ids, false).await?;
                Ok((nodes, relations))
            }
            CompositeProbe::Miss => {
                let (nodes, relations) = Self::time_dal(
                    "get_network",
                    self.dal.get_network(
                        &request.start_criteria,
                        depth,
                        limit,
                        offset,
                        rel_types,
                        node_types,
                    ),
                )
                .await?;
                let envelope = (!nodes.is_empty()).then(|| IdListEnvelope {
                    node_ids: nodes.iter().map(|n| n.id.clone()).collect(),
                    relation_ids: relations.iter().map(|r| r.id.clone()).collect(),
                    total: None,
                });
                self.write_composite(
                    &key,
                    envelope.as_ref(),
                    EMPTY_NETWORK,
                    Duration::from_secs(self.config.ttl_network_secs),
                )
                .await;
                Ok((nodes, relations))
            }
        }
    }

    /// Convenience wrapper returning [`Subgraph`].
    pub async fn get_network_result(&self, request: GetNetworkRequest) -> Result<Subgraph> {
        let (nodes, relations) = self.get_network(request).await?;
        Ok(Subgraph {
            node_ids: nodes.into_iter().map(|n| n.id).collect(),
            relation_ids: relations.into_iter().map(|r| r.id).collect(),
        })
    }

    /// Finds the shortest path between two nodes, caching the ordered
    /// node/relation id sequence (or a negative placeholder).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no path exists within `max_depth`,
    /// or when a cached path's id list can no longer be fully rehydrated
    /// (path integrity cannot be preserved when any step is gone).
    /// Otherwise propagates a DAL failure.
    #[instrument(skip(self, request))]
    pub async fn get_path(&self, request: GetPathRequest) -> Result<(Vec<Node>, Vec<Relation>)> {
        let max_depth = request
            .max_depth
            .unwrap_or(self.config.get_path_default_max_depth)
            .clamp(1, self.config.get_path_max_depth_limit);
        let rel_types = non_empty(&request.relation_types);

        let key = self.keys.path(
            &request.source_id,
            &request.target_id,
            max_depth,
            request.relation_types.as_deref().unwrap_or(&[]),
        );

        match self.probe_composite(&key, EMPTY_PATH, "path").await {
            CompositeProbe::Empty => Err(Error::NotFound(format!(
                "path {} -> {}",
                request.source_id, request.target_id
            ))),
            CompositeProbe::Envelope(envelope) => {
                let nodes = self.rehydrate_nodes(&envelope.node_ids, true).await?;
                let relations = self.rehydrate_relations(&envelope.relation_ids, true).await?;
                Ok((nodes, relations))
            }
            CompositeProbe::Miss => {
                match Self::time_dal(
                    "get_path",
                    self.dal.get_path(&request.source_id, &request.target_id, max_depth, rel_types),
                )
                .await
                {
                    Ok((nodes, relations)) => {
                        let envelope = IdListEnvelope {
                            node_ids: nodes.iter().map(|n| n.id.clone()).collect(),
                            relation_ids: relations.iter().map(|r| r.id.clone()).collect(),
                            total: None,
                        };
                        self.write_composite(
                            &key,
                            Some(&envelope),
                            EMPTY_PATH,
                            Duration::from_secs(self.config.ttl_path_secs),
                        )
                        .await;
                        Ok((nodes, relations))
                    }
                    Err(e) if e.is_not_found() => {
                        self.write_composite(
                            &key,
                            None,
                            EMPTY_PATH,
                            Duration::from_secs(self.config.ttl_path_secs),
                        )
                        .await;
                        Err(e)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Convenience wrapper returning [`Path`].
    ///
    /// # Errors
    ///
    /// See [`Self::get_path`].
    pub async fn get_path_result(&self, request: GetPathRequest) -> Result<Path> {
        let (nodes, relations) = self.get_path(request).await?;
        Ok(Path {
            node_ids: nodes.into_iter().map(|n| n.id).collect(),
            relation_ids: relations.into_iter().map(|r| r.id).collect(),
        })
    }

    /// Lists relations incident to a node, caching the resulting id list.
    /// When both `outgoing` and `incoming` are false, returns an empty
    /// result without touching the cache or the DAL.
    ///
    /// # Errors
    ///
    /// Propagates a DAL failure.
    #[instrument(skip(self, request))]
    pub async fn get_node_relations(
        &self,
        request: GetNodeRelationsRequest,
    ) -> Result<(Vec<Relation>, usize)> {
        if !request.outgoing && !request.incoming {
            return Ok((Vec::new(), 0));
        }

        let direction = RelationDirection::from_flags(request.outgoing, request.incoming);
        let limit = request
            .limit
            .unwrap_or(self.config.get_node_relations_default_limit);
        let offset = request.offset.unwrap_or(0);
        let types = non_empty(&request.types);

        let key = self.keys.node_relations(
            &request.node_id,
            direction,
            request.types.as_deref().unwrap_or(&[]),
            limit,
            offset,
        );

        match self.probe_composite(&key, EMPTY_REL_LIST, "node_relations").await {
            CompositeProbe::Empty => Ok((Vec::new(), 0)),
            CompositeProbe::Envelope(envelope) => {
                let relations = self.rehydrate_relations(&envelope.relation_ids, false).await?;
                Ok((relations, envelope.total.unwrap_or(0)))
            }
            CompositeProbe::Miss => {
                let (relations, total) = Self::time_dal(
                    "get_node_relations",
                    self.dal.get_node_relations(
                        &request.node_id,
                        types,
                        request.outgoing,
                        request.incoming,
                        limit,
                        offset,
                    ),
                )
                .await?;
                let envelope = (!relations.is_empty()).then(|| IdListEnvelope {
                    node_ids: Vec::new(),
                    relation_ids: relations.iter().map(|r| r.id.clone()).collect(),
                    total: Some(total),
                });
                self.write_composite(
                    &key,
                    envelope.as_ref(),
                    EMPTY_REL_LIST,
                    Duration::from_secs(self.config.ttl_node_relations_secs),
                )
                .await;
                Ok((relations, total))
            }
        }
    }

    /// Convenience wrapper returning [`NodeRelations`].
    pub async fn get_node_relations_result(
        &self,
        request: GetNodeRelationsRequest,
    ) -> Result<NodeRelations> {
        let (relations, total) = self.get_node_relations(request).await?;
        Ok(NodeRelations {
            relation_ids: relations.into_iter().map(|r| r.id).collect(),
            total,
        })
    }
}

/// Returns `None` for an absent or empty type-filter slice, `Some` otherwise
/// — "types filter, if empty, disables type-filtering" applies uniformly
/// across `GetNetwork`, `GetPath`, and `GetNodeRelations`.
fn non_empty<T>(types: &Option<Vec<T>>) -> Option<&[T]> {
    types.as_deref().filter(|t| !t.is_empty())
}

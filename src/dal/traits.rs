//! The Graph DAL contract: the narrow set of operations the repository
//! consumes from a graph database, described by input/output contract only.
//!
//! Mirrors the async storage-backend contracts in the example pack: one
//! `async-trait` naming each operation's semantics precisely enough that
//! transport/query-language details (Cypher, Bolt sessions, ...) stay out
//! of this crate.

use crate::models::graph::{
    CreateNodeRequest, CreateRelationRequest, Node, NodeType, Relation, RelationType,
    UpdateNodeRequest, UpdateRelationRequest,
};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// The graph database access contract.
///
/// `NotFound` outcomes are a sentinel distinguishable from transport
/// errors — implementations return [`crate::Error::NotFound`] for "zero
/// records matched" and any other variant for everything else; transport
/// and timeout errors propagate unchanged as [`crate::Error::DalFailure`].
#[async_trait]
pub trait GraphDal: Send + Sync {
    /// Creates a single labelled node with the supplied properties.
    ///
    /// # Errors
    ///
    /// Returns an error if required properties are missing.
    async fn create_node(&self, request: CreateNodeRequest) -> Result<Node>;

    /// Single-record node lookup by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no node matched.
    async fn get_node_by_id(&self, id: &str) -> Result<Node>;

    /// `SET`-merges the update map onto the node and stamps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no node matched.
    async fn update_node(&self, request: UpdateNodeRequest) -> Result<Node>;

    /// `DETACH-DELETE`s the node and its incident relations.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if zero nodes matched.
    async fn delete_node(&self, id: &str) -> Result<()>;

    /// Searches nodes by criteria, returning matches and the distinct total
    /// before pagination.
    ///
    /// The `name` criterion is case-sensitive substring containment; every
    /// other criterion is equality. Ordered by `name` ascending. When
    /// `criteria` is empty, returns an empty result rather than an
    /// unfiltered scan.
    ///
    /// # Errors
    ///
    /// Returns an error on transport/timeout failure.
    async fn search_nodes(
        &self,
        criteria: &HashMap<String, String>,
        type_filter: Option<NodeType>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Node>, usize)>;

    /// Expands the bounded neighbourhood from nodes matching
    /// `start_criteria`.
    ///
    /// Depth 0 is a distinct code path returning only the matching start
    /// nodes and an empty relation list. For depth ≥ 1, all variable-length
    /// paths of length `1..=depth` are expanded, filtered by `rel_types`
    /// (every relation on the path, when set) and `node_types` (every node
    /// on the path, when set), then deduplicated and page-sliced.
    ///
    /// # Errors
    ///
    /// Returns an error on transport/timeout failure.
    async fn get_network(
        &self,
        start_criteria: &HashMap<String, String>,
        depth: u32,
        limit: usize,
        offset: usize,
        rel_types: Option<&[RelationType]>,
        node_types: Option<&[NodeType]>,
    ) -> Result<(Vec<Node>, Vec<Relation>)>;

    /// Finds the shortest path of length `1..=max_depth` between two nodes,
    /// ties broken by the underlying store. When `rel_types` is non-empty,
    /// every relation on the path must have a type in that set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] when no path matches.
    async fn get_path(
        &self,
        source_id: &str,
        target_id: &str,
        max_depth: u32,
        rel_types: Option<&[RelationType]>,
    ) -> Result<(Vec<Node>, Vec<Relation>)>;

    /// Creates a directed, typed edge between two existing nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if `source_id` or `target_id` does not match an
    /// existing node.
    async fn create_relation(&self, request: CreateRelationRequest) -> Result<Relation>;

    /// Single-record relation lookup by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no relation matched.
    async fn get_relation_by_id(&self, id: &str) -> Result<Relation>;

    /// `SET`-merges the update map onto the relation and stamps
    /// `updated_at`. The relation type is immutable once created.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no relation matched.
    async fn update_relation(&self, request: UpdateRelationRequest) -> Result<Relation>;

    /// Deletes the relation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if zero relations matched.
    async fn delete_relation(&self, id: &str) -> Result<()>;

    /// Lists relations incident to `node_id`.
    ///
    /// Direction is controlled by `outgoing`/`incoming`; both `false`
    /// yields an empty result, not an error. `types`, if empty, disables
    /// type-filtering. Ordered by `created_at` descending; `total` is the
    /// count before pagination.
    ///
    /// # Errors
    ///
    /// Returns an error on transport/timeout failure.
    async fn get_node_relations(
        &self,
        node_id: &str,
        types: Option<&[RelationType]>,
        outgoing: bool,
        incoming: bool,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Relation>, usize)>;
}

//! Domain entities for the graph-cache repository layer.

pub mod graph;

pub use graph::{
    ALLOWED_SEARCH_CRITERIA, CreateNodeRequest, CreateRelationRequest, GetNetworkRequest,
    GetNodeRelationsRequest, GetPathRequest, Node, NodeRelations, NodeType, Path, Relation,
    RelationDirection, RelationType, SUBSTRING_CRITERIA, SearchNodesRequest, SearchResult,
    Subgraph, UpdateNodeRequest, UpdateRelationRequest, is_substring_criterion, strip_reserved_keys,
    validate_search_criteria,
};

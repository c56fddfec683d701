//! Domain entities for the labelled property graph: nodes, relations, and
//! the composite query result types derived from them.
//!
//! `NodeType`/`RelationType` are closed enums, mirroring the storage layer's
//! labelled-node / typed-edge model: every `Node` carries exactly one
//! `NodeType` and every `Relation` exactly one `RelationType`, and both
//! round-trip through [`NodeType::as_str`]/[`NodeType::parse`] to the string
//! label the graph store actually persists.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of node labels the graph store recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// A person.
    Person,
    /// A company or other organisation.
    Company,
    /// An educational institution.
    School,
    /// A physical or named location.
    Location,
    /// A scheduled event.
    Event,
}

impl NodeType {
    /// Returns the storage label for this node type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Company => "Company",
            Self::School => "School",
            Self::Location => "Location",
            Self::Event => "Event",
        }
    }

    /// Parses a storage label into a node type.
    ///
    /// Returns `None` for labels that resolve to no known type; callers
    /// surface that as [`crate::Error::UnknownLabel`] rather than silently
    /// coercing.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Person" => Some(Self::Person),
            "Company" => Some(Self::Company),
            "School" => Some(Self::School),
            "Location" => Some(Self::Location),
            "Event" => Some(Self::Event),
            _ => None,
        }
    }

    /// Resolves the first label in `labels` that names a known node type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownLabel`] if no label resolves.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> crate::Result<Self> {
        labels
            .iter()
            .find_map(|l| Self::parse(l.as_ref()))
            .ok_or_else(|| crate::Error::UnknownLabel(labels_joined(labels)))
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of relation (edge) labels the graph store recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// Colleagues at the same organisation.
    Colleague,
    /// A friendship.
    Friend,
    /// Attended the same school.
    Schoolmate,
    /// Visited a location or entity.
    Visited,
    /// Follows another node (e.g. a social-graph follow).
    Following,
    /// Classmates within the same school or course.
    Classmate,
}

impl RelationType {
    /// Returns the storage label for this relation type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Colleague => "COLLEAGUE",
            Self::Friend => "FRIEND",
            Self::Schoolmate => "SCHOOLMATE",
            Self::Visited => "VISITED",
            Self::Following => "FOLLOWING",
            Self::Classmate => "CLASSMATE",
        }
    }

    /// Parses a storage label into a relation type.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "COLLEAGUE" => Some(Self::Colleague),
            "FRIEND" => Some(Self::Friend),
            "SCHOOLMATE" => Some(Self::Schoolmate),
            "VISITED" => Some(Self::Visited),
            "FOLLOWING" => Some(Self::Following),
            "CLASSMATE" => Some(Self::Classmate),
            _ => None,
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn labels_joined<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

/// A node in the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable, globally unique (within `Node`) identifier.
    pub id: String,
    /// Closed node-type label.
    pub node_type: NodeType,
    /// Display name.
    pub name: String,
    /// Optional avatar URL.
    pub avatar: Option<String>,
    /// Optional profession.
    pub profession: Option<String>,
    /// Additional string-keyed string properties. `None` when empty — see
    /// the Domain Mapper property-bag filtering rule.
    pub properties: Option<HashMap<String, String>>,
    /// Unix timestamp (seconds) at creation.
    pub created_at: i64,
    /// Unix timestamp (seconds) at last update.
    pub updated_at: i64,
}

impl Node {
    /// Creates a node with the given type and name; all other fields are
    /// left at their zero/absent defaults for the caller to fill in.
    #[must_use]
    pub fn new(node_type: NodeType, name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            node_type,
            name: name.into(),
            avatar: None,
            profession: None,
            properties: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Sets the node id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the avatar.
    #[must_use]
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Sets the profession.
    #[must_use]
    pub fn with_profession(mut self, profession: impl Into<String>) -> Self {
        self.profession = Some(profession.into());
        self
    }

    /// Sets the property bag.
    #[must_use]
    pub fn with_properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties = if properties.is_empty() {
            None
        } else {
            Some(properties)
        };
        self
    }
}

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Stable, globally unique (within `Relation`) identifier.
    pub id: String,
    /// Closed relation-type label. Immutable once created.
    pub relation_type: RelationType,
    /// Source node id.
    pub source_id: String,
    /// Target node id.
    pub target_id: String,
    /// Optional human-readable label.
    pub label: Option<String>,
    /// Additional string-keyed string properties. `None` when empty.
    pub properties: Option<HashMap<String, String>>,
    /// Unix timestamp (seconds) at creation.
    pub created_at: i64,
    /// Unix timestamp (seconds) at last update.
    pub updated_at: i64,
}

impl Relation {
    /// Creates a relation between `source_id` and `target_id`.
    #[must_use]
    pub fn new(
        relation_type: RelationType,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            relation_type,
            source_id: source_id.into(),
            target_id: target_id.into(),
            label: None,
            properties: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Sets the relation id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the property bag.
    #[must_use]
    pub fn with_properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties = if properties.is_empty() {
            None
        } else {
            Some(properties)
        };
        self
    }
}

/// Cached ID-list entry for `SearchNodes`: an ordered sequence of node ids
/// plus the total match count before pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matching node ids, in the order the DAL produced them.
    pub node_ids: Vec<String>,
    /// Total distinct matches before pagination; `>= node_ids.len()`.
    pub total: usize,
}

/// Cached ID-list entry for `GetNetwork`: the deduplicated node and relation
/// ids reachable from the start criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    /// Node ids in the subgraph.
    pub node_ids: Vec<String>,
    /// Relation ids in the subgraph.
    pub relation_ids: Vec<String>,
}

/// Cached ID-list entry for `GetPath`: an ordered node/relation id sequence
/// with `relation_ids.len() == node_ids.len() - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Node ids in path order, source to target.
    pub node_ids: Vec<String>,
    /// Relation ids in path order; `relation_ids[i]` connects
    /// `node_ids[i]` to `node_ids[i + 1]`.
    pub relation_ids: Vec<String>,
}

/// Cached ID-list entry for `GetNodeRelations`: an ordered sequence of
/// relation ids plus the total count before pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRelations {
    /// Relation ids, ordered by `created_at` descending.
    pub relation_ids: Vec<String>,
    /// Total count before pagination.
    pub total: usize,
}

/// Direction filter for `GetNodeRelations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationDirection {
    /// Only relations where the node is the source.
    Outgoing,
    /// Only relations where the node is the target.
    Incoming,
    /// Both directions (both flags set, or both unset — canonicalises
    /// this to the same key).
    Any,
}

impl RelationDirection {
    /// Derives the direction from the request's `outgoing`/`incoming` flags.
    #[must_use]
    pub const fn from_flags(outgoing: bool, incoming: bool) -> Self {
        match (outgoing, incoming) {
            (true, false) => Self::Outgoing,
            (false, true) => Self::Incoming,
            _ => Self::Any,
        }
    }

    /// The canonical direction tag used by the Key Coder (`out`/`in`/`any`).
    #[must_use]
    pub const fn as_key_tag(self) -> &'static str {
        match self {
            Self::Outgoing => "out",
            Self::Incoming => "in",
            Self::Any => "any",
        }
    }
}

/// Criterion key that matches `name` by case-sensitive substring
/// containment rather than equality.
pub const SUBSTRING_CRITERIA: &[&str] = &["name"];

/// The complete whitelist of `SearchNodes` criterion keys. The DAL MUST NOT
/// be handed a criterion key outside this set — see Open Question 3 in
/// DESIGN.md.
pub const ALLOWED_SEARCH_CRITERIA: &[&str] = &["name", "profession"];

/// Validates that every key in `criteria` is on the `SearchNodes` whitelist.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidParameter`] naming the first
/// unrecognised key.
pub fn validate_search_criteria(criteria: &HashMap<String, String>) -> crate::Result<()> {
    for key in criteria.keys() {
        if !ALLOWED_SEARCH_CRITERIA.contains(&key.as_str()) {
            return Err(crate::Error::InvalidParameter(format!(
                "unknown search criterion: {key}"
            )));
        }
    }
    Ok(())
}

/// Returns true if `key` is matched by substring containment rather than
/// equality.
#[must_use]
pub fn is_substring_criterion(key: &str) -> bool {
    SUBSTRING_CRITERIA.contains(&key)
}

/// Request shape for `CreateNode`.
#[derive(Debug, Clone, Default)]
pub struct CreateNodeRequest {
    /// Node type.
    pub node_type: Option<NodeType>,
    /// Display name.
    pub name: String,
    /// Optional avatar.
    pub avatar: Option<String>,
    /// Optional profession.
    pub profession: Option<String>,
    /// Additional properties.
    pub properties: Option<HashMap<String, String>>,
}

/// Request shape for `UpdateNode`. `id`, `created_at`, `updated_at` inside
/// `properties` are reserved and MUST be ignored if present.
#[derive(Debug, Clone, Default)]
pub struct UpdateNodeRequest {
    /// Id of the node to update.
    pub id: String,
    /// New display name, if changing.
    pub name: Option<String>,
    /// New avatar, if changing.
    pub avatar: Option<String>,
    /// New profession, if changing.
    pub profession: Option<String>,
    /// Property updates to merge.
    pub properties: Option<HashMap<String, String>>,
}

/// Reserved property keys that MUST be ignored if present in an update map.
pub const RESERVED_PROPERTY_KEYS: &[&str] = &["id", "created_at", "updated_at"];

/// Strips [`RESERVED_PROPERTY_KEYS`] from a caller-supplied property map.
pub fn strip_reserved_keys(properties: &mut HashMap<String, String>) {
    for key in RESERVED_PROPERTY_KEYS {
        properties.remove(*key);
    }
}

/// Request shape for `CreateRelation`.
#[derive(Debug, Clone)]
pub struct CreateRelationRequest {
    /// Relation type. Immutable once created.
    pub relation_type: RelationType,
    /// Source node id.
    pub source_id: String,
    /// Target node id.
    pub target_id: String,
    /// Optional label.
    pub label: Option<String>,
    /// Additional properties.
    pub properties: Option<HashMap<String, String>>,
}

/// Request shape for `UpdateRelation`. `id`, `created_at`, `updated_at` are
/// reserved and MUST be ignored if present in `properties`.
#[derive(Debug, Clone, Default)]
pub struct UpdateRelationRequest {
    /// Id of the relation to update.
    pub id: String,
    /// New label, if changing.
    pub label: Option<String>,
    /// Property updates to merge.
    pub properties: Option<HashMap<String, String>>,
}

/// Request shape for `SearchNodes`.
#[derive(Debug, Clone, Default)]
pub struct SearchNodesRequest {
    /// Optional node-type filter.
    pub node_type: Option<NodeType>,
    /// Criterion map; keys MUST be in [`ALLOWED_SEARCH_CRITERIA`].
    pub criteria: HashMap<String, String>,
    /// Result limit; defaults to `RepositoryConfig::search_nodes_default_limit`.
    pub limit: Option<usize>,
    /// Result offset; defaults to 0.
    pub offset: Option<usize>,
}

/// Request shape for `GetNetwork`.
#[derive(Debug, Clone, Default)]
pub struct GetNetworkRequest {
    /// Start-node criteria (property equality).
    pub start_criteria: HashMap<String, String>,
    /// Traversal depth; defaults to 1, clamped to `[0, GetNetworkMaxDepth]`.
    pub depth: Option<u32>,
    /// Result limit; defaults to 100.
    pub limit: Option<usize>,
    /// Result offset; defaults to 0.
    pub offset: Option<usize>,
    /// Relation-type filter applied to every relation on every path.
    pub relation_types: Option<Vec<RelationType>>,
    /// Node-type filter applied to every node on every path.
    pub node_types: Option<Vec<NodeType>>,
}

/// Request shape for `GetPath`.
#[derive(Debug, Clone)]
pub struct GetPathRequest {
    /// Source node id.
    pub source_id: String,
    /// Target node id.
    pub target_id: String,
    /// Max path depth; defaults to 3, clamped to `[1, GetPathMaxDepthLimit]`.
    pub max_depth: Option<u32>,
    /// Relation-type filter; every relation in the path must match if set.
    pub relation_types: Option<Vec<RelationType>>,
}

/// Request shape for `GetNodeRelations`.
#[derive(Debug, Clone)]
pub struct GetNodeRelationsRequest {
    /// The node whose relations are listed.
    pub node_id: String,
    /// Relation-type filter; disabled (no filtering) when empty.
    pub types: Option<Vec<RelationType>>,
    /// Include outgoing relations; defaults to true.
    pub outgoing: bool,
    /// Include incoming relations; defaults to true.
    pub incoming: bool,
    /// Result limit; defaults to 10.
    pub limit: Option<usize>,
    /// Result offset; defaults to 0.
    pub offset: Option<usize>,
}

impl Default for GetNodeRelationsRequest {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            types: None,
            outgoing: true,
            incoming: true,
            limit: None,
            offset: None,
        }
    }
}

//! The Domain Mapper: converts graph-level storage records (labelled nodes,
//! typed edges with polymorphic property maps) into domain entities, and
//! classifies labels to the closed `NodeType`/`RelationType` enums.
//!
//! The reference [`crate::dal::InMemoryGraphDal`] stores already-typed
//! [`Node`]/[`Relation`] values directly and has no need to run this
//! mapping; it exists for backends that read raw labelled records off the
//! wire (e.g. a Cypher driver's result rows), where polymorphic property
//! maps are represented as [`PropertyValue`] tagged unions rather than
//! dynamically typed values.

use crate::models::graph::{Node, NodeType, Relation, RelationType};
use crate::{Error, Result};
use std::collections::HashMap;

/// A storage-layer property value, tagged by primitive kind.
///
/// Only [`PropertyValue::Str`] survives into a domain entity's `properties`
/// map; every other variant is dropped during mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// A string value.
    Str(String),
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// An explicit null/absent value.
    Null,
}

impl PropertyValue {
    /// Returns the string payload, if this is a [`PropertyValue::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// A raw labelled-node record as read off the graph store, prior to domain
/// mapping.
#[derive(Debug, Clone, Default)]
pub struct StorageNode {
    /// Stable node id.
    pub id: String,
    /// Labels attached to the node. The first label resolving to a known
    /// [`NodeType`] wins.
    pub labels: Vec<String>,
    /// The node's full property bag, including reserved keys (`id`,
    /// `created_at`, `updated_at`) that the mapper extracts separately.
    pub properties: HashMap<String, PropertyValue>,
    /// Creation timestamp (Unix seconds).
    pub created_at: i64,
    /// Last-update timestamp (Unix seconds).
    pub updated_at: i64,
}

/// A raw typed-edge record as read off the graph store, prior to domain
/// mapping.
#[derive(Debug, Clone, Default)]
pub struct StorageRelation {
    /// Stable relation id.
    pub id: String,
    /// The edge-type label as persisted by the store.
    pub rel_type: String,
    /// Source node id.
    pub source_id: String,
    /// Target node id.
    pub target_id: String,
    /// The relation's full property bag.
    pub properties: HashMap<String, PropertyValue>,
    /// Creation timestamp (Unix seconds).
    pub created_at: i64,
    /// Last-update timestamp (Unix seconds).
    pub updated_at: i64,
}

/// Resolves the first label in `labels` that names a known [`NodeType`].
///
/// # Errors
///
/// Returns [`Error::UnknownLabel`] if no label resolves — a label set that
/// matches nothing is surfaced as an error, never silently coerced.
pub fn labels_to_node_type<S: AsRef<str>>(labels: &[S]) -> Result<NodeType> {
    NodeType::from_labels(labels)
}

/// Parses a storage edge-type label into a [`RelationType`].
///
/// # Errors
///
/// Returns [`Error::UnknownLabel`] if `s` names no known relation type.
pub fn string_to_relation_type(s: &str) -> Result<RelationType> {
    RelationType::parse(s).ok_or_else(|| Error::UnknownLabel(s.to_string()))
}

/// Extracts `name`/`avatar`/`profession` from `record.properties`, folding
/// every other string-valued property into the domain `properties` map.
/// Non-string property values are dropped; an empty resulting map becomes
/// `None`.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if the record has no `name`
/// property, since every [`Node`] requires one.
pub fn map_storage_node_to_domain_node(record: &StorageNode, node_type: NodeType) -> Result<Node> {
    let name = record
        .properties
        .get("name")
        .and_then(PropertyValue::as_str)
        .ok_or_else(|| Error::InvalidParameter(format!("node {} has no name property", record.id)))?
        .to_string();

    let avatar = record
        .properties
        .get("avatar")
        .and_then(PropertyValue::as_str)
        .map(str::to_string);
    let profession = record
        .properties
        .get("profession")
        .and_then(PropertyValue::as_str)
        .map(str::to_string);

    let properties = residual_string_properties(
        &record.properties,
        &["name", "avatar", "profession", "id", "created_at", "updated_at"],
    );

    Ok(Node {
        id: record.id.clone(),
        node_type,
        name,
        avatar,
        profession,
        properties,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

/// Extracts `label` from `record.properties`, folding every other
/// string-valued property into the domain `properties` map, with the same
/// filtering rules as [`map_storage_node_to_domain_node`].
#[must_use]
pub fn map_storage_relation_to_domain_relation(
    record: &StorageRelation,
    relation_type: RelationType,
    source_id: &str,
    target_id: &str,
) -> Relation {
    let label = record
        .properties
        .get("label")
        .and_then(PropertyValue::as_str)
        .map(str::to_string);

    let properties = residual_string_properties(
        &record.properties,
        &["label", "id", "created_at", "updated_at"],
    );

    Relation {
        id: record.id.clone(),
        relation_type,
        source_id: source_id.to_string(),
        target_id: target_id.to_string(),
        label,
        properties,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

/// Collects every string-valued property not in `exclude` into a map,
/// returning `None` if the result is empty.
fn residual_string_properties(
    properties: &HashMap<String, PropertyValue>,
    exclude: &[&str],
) -> Option<HashMap<String, String>> {
    let residual: HashMap<String, String> = properties
        .iter()
        .filter(|(k, _)| !exclude.contains(&k.as_str()))
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect();
    (!residual.is_empty()).then_some(residual)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> StorageNode {
        let mut properties = HashMap::new();
        properties.insert("name".to_string(), PropertyValue::Str("Alice".to_string()));
        properties.insert(
            "profession".to_string(),
            PropertyValue::Str("Engineer".to_string()),
        );
        properties.insert("nickname".to_string(), PropertyValue::Str("Al".to_string()));
        properties.insert("login_count".to_string(), PropertyValue::Int(7));
        StorageNode {
            id: "n1".to_string(),
            labels: vec!["Person".to_string()],
            properties,
            created_at: 100,
            updated_at: 200,
        }
    }

    #[test]
    fn labels_to_node_type_resolves_known_label() {
        assert_eq!(
            labels_to_node_type(&["Person".to_string()]).unwrap(),
            NodeType::Person
        );
    }

    #[test]
    fn labels_to_node_type_errors_on_unknown_label() {
        let err = labels_to_node_type(&["Widget".to_string()]).unwrap_err();
        assert!(matches!(err, Error::UnknownLabel(_)));
    }

    #[test]
    fn string_to_relation_type_errors_on_unknown() {
        assert!(string_to_relation_type("ENEMIES_WITH").is_err());
    }

    #[test]
    fn map_storage_node_extracts_known_fields_and_folds_the_rest() {
        let record = sample_node();
        let node = map_storage_node_to_domain_node(&record, NodeType::Person).unwrap();
        assert_eq!(node.name, "Alice");
        assert_eq!(node.profession.as_deref(), Some("Engineer"));
        let props = node.properties.unwrap();
        assert_eq!(props.get("nickname").map(String::as_str), Some("Al"));
        assert!(!props.contains_key("login_count"));
        assert!(!props.contains_key("name"));
    }

    #[test]
    fn map_storage_node_errors_without_name() {
        let record = StorageNode {
            id: "n2".to_string(),
            labels: vec!["Person".to_string()],
            properties: HashMap::new(),
            created_at: 0,
            updated_at: 0,
        };
        assert!(map_storage_node_to_domain_node(&record, NodeType::Person).is_err());
    }

    #[test]
    fn map_storage_node_empty_residual_properties_becomes_none() {
        let mut properties = HashMap::new();
        properties.insert("name".to_string(), PropertyValue::Str("Bob".to_string()));
        let record = StorageNode {
            id: "n3".to_string(),
            labels: vec!["Person".to_string()],
            properties,
            created_at: 0,
            updated_at: 0,
        };
        let node = map_storage_node_to_domain_node(&record, NodeType::Person).unwrap();
        assert!(node.properties.is_none());
    }

    #[test]
    fn map_storage_relation_drops_non_string_properties() {
        let mut properties = HashMap::new();
        properties.insert("label".to_string(), PropertyValue::Str("best friends".to_string()));
        properties.insert("weight".to_string(), PropertyValue::Float(0.9));
        let record = StorageRelation {
            id: "r1".to_string(),
            rel_type: "FRIEND".to_string(),
            source_id: "n1".to_string(),
            target_id: "n2".to_string(),
            properties,
            created_at: 1,
            updated_at: 1,
        };
        let relation = map_storage_relation_to_domain_relation(
            &record,
            RelationType::Friend,
            &record.source_id,
            &record.target_id,
        );
        assert_eq!(relation.label.as_deref(), Some("best friends"));
        assert!(relation.properties.is_none());
    }
}
